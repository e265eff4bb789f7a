use thiserror::Error;

/// Every failure a request can end in.
///
/// Handlers never retry: an error is converted straight into a structured
/// `{"success": false, "error": ...}` response with the status from
/// [`InventoryError::status_code`].
#[derive(Error, Debug)]
pub enum InventoryError {
    #[error("No file selected")]
    MissingFile,

    #[error("File type not allowed: {0}")]
    DisallowedExtension(String),

    #[error("Failed to process file: {0}")]
    Unparsable(String),

    #[error("No data loaded")]
    NoDataLoaded,

    #[error("Barcode is empty")]
    EmptyCode,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Upload too large: {0}")]
    PayloadTooLarge(String),

    // Storage errors
    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode session data: {0}")]
    Codec(#[from] bincode::Error),

    #[error("Stored session data is corrupt: {0}")]
    CorruptSession(String),

    #[error("Export failed: {0}")]
    Export(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<csv::Error> for InventoryError {
    fn from(e: csv::Error) -> Self {
        InventoryError::Export(e.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for InventoryError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        InventoryError::Export(e.to_string())
    }
}

impl InventoryError {
    /// HTTP status code as a bare number so the core stays free of the web stack.
    pub fn status_code(&self) -> u16 {
        match self {
            InventoryError::MissingFile
            | InventoryError::DisallowedExtension(_)
            | InventoryError::NoDataLoaded
            | InventoryError::EmptyCode
            | InventoryError::InvalidRequest(_) => 400,
            InventoryError::PayloadTooLarge(_) => 413,
            InventoryError::Unparsable(_) => 422,
            InventoryError::Io(_)
            | InventoryError::Codec(_)
            | InventoryError::CorruptSession(_)
            | InventoryError::Export(_)
            | InventoryError::Config(_) => 500,
        }
    }
}

#[cfg(feature = "web")]
impl axum::response::IntoResponse for InventoryError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            log::error!("request failed: {}", self);
        } else {
            log::warn!("request rejected: {}", self);
        }

        (
            status,
            axum::Json(serde_json::json!({
                "success": false,
                "error": self.to_string(),
            })),
        )
            .into_response()
    }
}
