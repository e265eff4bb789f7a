use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, Query, State,
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
    },
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::sync::Arc;
use tokio::net::TcpListener;
use uuid::Uuid;

use crate::config::{Config, StoreBackend};
use crate::downloader::{self, ExportFormat};
use crate::error::InventoryError;
use crate::loader;
use crate::session::InventorySession;
use crate::store::{self, DiskStore, MemoryStore, SessionStore};

/// Name of the cookie carrying the session id.
pub const SESSION_COOKIE: &str = "inventory_session";

/// Shared by every handler: the session store and the server settings.
pub struct AppState {
    pub store: Arc<dyn SessionStore>,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, InventoryError> {
        let store: Arc<dyn SessionStore> = match config.backend {
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
            StoreBackend::Disk => Arc::new(DiskStore::open(&config.data_dir)?),
        };
        Ok(AppState { store, config })
    }

    pub fn with_store(store: Arc<dyn SessionStore>, config: Config) -> Self {
        AppState { store, config }
    }
}

#[derive(Serialize)]
struct UploadResponse {
    success: bool,
    message: String,
    filename: String,
    records_count: usize,
    columns: Vec<String>,
    data: Vec<Map<String, JsonValue>>,
}

#[derive(Deserialize)]
struct SearchRequest {
    #[serde(default, alias = "code")]
    barcode: String,
}

#[derive(Serialize)]
struct SearchResponse {
    success: bool,
    found: bool,
    message: String,
    matched_indices: Vec<usize>,
    new_scanned: Vec<usize>,
    total_scanned: usize,
}

#[derive(Deserialize)]
struct ExportQuery {
    format: Option<String>,
}

#[derive(Serialize)]
struct ResetResponse {
    success: bool,
    message: String,
}

/// Build the application router over `state`.
pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(serve_index))
        .route("/health", get(health))
        .route("/upload", post(upload_file))
        .route("/search", post(search_barcode))
        .route("/stats", get(get_stats))
        .route("/export", get(export_results))
        .route("/reset", get(reset_session).post(reset_session))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Start the server described by `config` and serve until shutdown.
pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(AppState::new(config)?);
    log::info!(
        "using {:?} session store (ttl {}s)",
        state.config.backend,
        state.config.session_ttl_secs
    );

    let listener = TcpListener::bind(&state.config.addr).await?;
    log::info!("Listening on http://{}", state.config.addr);
    axum::serve(listener, router(state)).await?;

    Ok(())
}

async fn serve_index() -> Html<&'static str> {
    Html(include_str!("./static/index.html"))
}

async fn health() -> &'static str {
    "ok"
}

fn session_cookie(id: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

fn cookie_session_id(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|id| !id.is_empty())
}

/// Oversized bodies surface as multipart read errors; keep their 413.
fn multipart_error(e: MultipartError) -> InventoryError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        InventoryError::PayloadTooLarge(e.body_text())
    } else {
        InventoryError::InvalidRequest(e.body_text())
    }
}

/// The session named by the request cookie; absent or expired reads as "no data".
fn current_session(
    state: &AppState,
    jar: &CookieJar,
) -> Result<(String, InventorySession), InventoryError> {
    let id = cookie_session_id(jar).ok_or(InventoryError::NoDataLoaded)?;
    let session = state.store.load(&id)?.ok_or(InventoryError::NoDataLoaded)?;
    Ok((id, session))
}

async fn upload_file(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(CookieJar, Json<UploadResponse>), InventoryError> {
    let mut multipart = multipart.map_err(|e| InventoryError::InvalidRequest(e.body_text()))?;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let raw_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?;
        upload = Some((raw_name, bytes));
    }

    let (raw_name, bytes) = upload.ok_or(InventoryError::MissingFile)?;
    if raw_name.trim().is_empty() {
        return Err(InventoryError::MissingFile);
    }

    let extension = loader::allowed_extension(&raw_name)?;
    let dataset = loader::load_dataset(&raw_name, &bytes)?;

    let mut filename = loader::secure_filename(&raw_name);
    if loader::allowed_extension(&filename).is_err() {
        filename = format!("inventory.{}", extension);
    }

    // Reuse the browser's id so a re-upload replaces its previous dataset.
    let id = cookie_session_id(&jar)
        .filter(|id| Uuid::parse_str(id).is_ok())
        .unwrap_or_else(store::new_session_id);

    if let Err(e) = state.store.purge_expired() {
        log::warn!("failed to purge expired sessions: {}", e);
    }

    let session = InventorySession::new(dataset, filename.clone(), state.config.session_ttl());
    state.store.save(&id, &session)?;

    let records_count = session.dataset.len();
    log::info!(
        "session {}: loaded {} ({} rows, {} columns)",
        id,
        filename,
        records_count,
        session.dataset.columns.len()
    );

    let response = UploadResponse {
        success: true,
        message: format!("File loaded successfully. {} records found.", records_count),
        filename,
        records_count,
        columns: session.dataset.columns.clone(),
        data: session.dataset.preview(state.config.preview_rows),
    };

    Ok((jar.add(session_cookie(id)), Json(response)))
}

async fn search_barcode(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, InventoryError> {
    let Json(request) = payload.map_err(|e| InventoryError::InvalidRequest(e.body_text()))?;
    if request.barcode.trim().is_empty() {
        return Err(InventoryError::EmptyCode);
    }

    let (id, mut session) = current_session(&state, &jar)?;
    let outcome = session.scan(&request.barcode)?;

    if !outcome.new_scanned.is_empty() {
        state.store.save(&id, &session)?;
        if session.progress().is_complete() {
            log::info!("session {}: all {} items reviewed", id, session.dataset.len());
        }
    }

    let message = if outcome.found() {
        log::info!(
            "session {}: code {} matched rows {:?}",
            id,
            outcome.code,
            outcome.matched_indices
        );
        format!("Code found in {} record(s)", outcome.matched_indices.len())
    } else {
        log::info!("session {}: code {} not found", id, outcome.code);
        format!("Code \"{}\" was not found in the inventory", outcome.code)
    };

    Ok(Json(SearchResponse {
        success: true,
        found: outcome.found(),
        message,
        matched_indices: outcome.matched_indices,
        new_scanned: outcome.new_scanned,
        total_scanned: outcome.total_scanned,
    }))
}

async fn get_stats(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<impl IntoResponse, InventoryError> {
    let (_, session) = current_session(&state, &jar)?;
    Ok(Json(session.progress()))
}

async fn export_results(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<ExportQuery>,
) -> Result<Response, InventoryError> {
    let format = match params.format.as_deref() {
        Some(f) => f.parse()?,
        None => ExportFormat::Json,
    };

    let (id, session) = current_session(&state, &jar)?;
    log::info!("session {}: exporting {} as {:?}", id, session.filename, format);

    let body = match format {
        ExportFormat::Json => return Ok(Json(downloader::build_report(&session)).into_response()),
        ExportFormat::Csv => downloader::to_csv(&session)?,
        ExportFormat::Xlsx => downloader::to_xlsx(&session)?,
    };

    let disposition = format!(
        "attachment; filename=\"{}\"",
        downloader::export_filename(&session, format)
    );
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

async fn reset_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<ResetResponse>), InventoryError> {
    if let Some(id) = cookie_session_id(&jar) {
        state.store.remove(&id)?;
        log::info!("session {}: reset", id);
    }

    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    Ok((
        jar,
        Json(ResetResponse {
            success: true,
            message: "Session reset".to_string(),
        }),
    ))
}
