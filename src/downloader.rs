use crate::cell::CellValue;
use crate::error::InventoryError;
use crate::session::InventorySession;
use rust_xlsxwriter::{Format, Workbook};
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use std::path::Path;

pub const STATUS_COLUMN: &str = "review_status";
pub const STATUS_REVIEWED: &str = "reviewed";
pub const STATUS_PENDING: &str = "pending";

/// Output formats offered by the export endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
    Xlsx,
}

impl std::str::FromStr for ExportFormat {
    type Err = InventoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            "xlsx" => Ok(ExportFormat::Xlsx),
            other => Err(InventoryError::InvalidRequest(format!(
                "unknown export format: {}",
                other
            ))),
        }
    }
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ExportSummary {
    pub total: usize,
    pub reviewed: usize,
    pub pending: usize,
}

/// The annotated dataset as served by `/export`.
#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    pub filename: String,
    pub columns: Vec<String>,
    pub data: Vec<Map<String, JsonValue>>,
    pub summary: ExportSummary,
}

/// Name for the status column that does not collide with an existing column.
pub fn status_column_name(columns: &[String]) -> String {
    let mut name = STATUS_COLUMN.to_string();
    let mut suffix = 1;
    while columns.contains(&name) {
        name = format!("{}_{}", STATUS_COLUMN, suffix);
        suffix += 1;
    }
    name
}

fn status_label(session: &InventorySession, index: usize) -> &'static str {
    if session.is_reviewed(index) {
        STATUS_REVIEWED
    } else {
        STATUS_PENDING
    }
}

fn export_columns(session: &InventorySession) -> Vec<String> {
    let mut columns = session.dataset.columns.clone();
    columns.push(status_column_name(&columns));
    columns
}

/// Build the full export: every row plus its review status, and summary counts.
pub fn build_report(session: &InventorySession) -> ExportReport {
    let columns = export_columns(session);
    let status_column = columns.last().cloned().unwrap_or_default();

    let data = (0..session.dataset.len())
        .filter_map(|index| {
            let mut row = session.dataset.row_to_json(index)?;
            row.insert(
                status_column.clone(),
                JsonValue::from(status_label(session, index)),
            );
            Some(row)
        })
        .collect();

    let progress = session.progress();
    ExportReport {
        filename: session.filename.clone(),
        columns,
        data,
        summary: ExportSummary {
            total: progress.total_items,
            reviewed: progress.scanned_items,
            pending: progress.pending_items,
        },
    }
}

/// Attachment name for a download: `<stem>_reviewed.<ext>`.
pub fn export_filename(session: &InventorySession, format: ExportFormat) -> String {
    let stem = Path::new(&session.filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("inventory");
    format!("{}_reviewed.{}", stem, format.extension())
}

/// Convert the annotated dataset to CSV.
///
/// Values use the same text form barcodes are matched against.
pub fn to_csv(session: &InventorySession) -> Result<Vec<u8>, InventoryError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(export_columns(session))?;

    for (index, row) in session.dataset.rows.iter().enumerate() {
        let mut record: Vec<String> = row.iter().map(CellValue::as_text).collect();
        record.push(status_label(session, index).to_string());
        writer.write_record(&record)?;
    }

    writer
        .into_inner()
        .map_err(|e| InventoryError::Export(e.error().to_string()))
}

/// Convert the annotated dataset to an XLSX workbook.
///
/// Numbers and booleans keep their type; reviewed rows are not styled.
pub fn to_xlsx(session: &InventorySession) -> Result<Vec<u8>, InventoryError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    let bold = Format::new().set_bold();

    for (c, name) in export_columns(session).iter().enumerate() {
        worksheet.write_string_with_format(0, c as u16, name.as_str(), &bold)?;
    }

    let status_col = session.dataset.columns.len() as u16;
    for (r, row) in session.dataset.rows.iter().enumerate() {
        let xr = (r + 1) as u32;
        for (c, value) in row.iter().enumerate() {
            let xc = c as u16;
            match value {
                CellValue::Empty => {}
                CellValue::Int(i) => {
                    worksheet.write_number(xr, xc, *i as f64)?;
                }
                CellValue::Float(f) => {
                    worksheet.write_number(xr, xc, *f)?;
                }
                CellValue::Bool(b) => {
                    worksheet.write_boolean(xr, xc, *b)?;
                }
                CellValue::Text(s) => {
                    worksheet.write_string(xr, xc, s.as_str())?;
                }
            }
        }
        worksheet.write_string(xr, status_col, status_label(session, r))?;
    }

    Ok(workbook.save_to_buffer()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;
    use crate::loader;
    use chrono::Duration;

    fn session() -> InventorySession {
        let text = |s: &str| CellValue::Text(s.to_string());
        let ds = Dataset::from_parts(
            vec!["code".into(), "item".into()],
            vec![
                vec![CellValue::Int(100), text("Chair, oak")],
                vec![CellValue::Int(200), text("Desk")],
                vec![CellValue::Int(300), text("Lamp")],
            ],
        );
        let mut s = InventorySession::new(ds, "Stock List.xlsx", Duration::hours(1));
        s.scan("200").unwrap();
        s
    }

    #[test]
    fn report_marks_reviewed_rows() {
        let report = build_report(&session());
        assert_eq!(report.columns, vec!["code", "item", "review_status"]);
        assert_eq!(report.data.len(), 3);
        assert_eq!(report.data[0]["review_status"], "pending");
        assert_eq!(report.data[1]["review_status"], "reviewed");
        assert_eq!(
            report.summary,
            ExportSummary { total: 3, reviewed: 1, pending: 2 }
        );
        assert_eq!(report.filename, "Stock List.xlsx");
    }

    #[test]
    fn status_column_avoids_collisions() {
        let columns = vec!["review_status".to_string(), "review_status_1".to_string()];
        assert_eq!(status_column_name(&columns), "review_status_2");
        assert_eq!(status_column_name(&[]), "review_status");
    }

    #[test]
    fn csv_export_quotes_and_annotates() {
        let csv = String::from_utf8(to_csv(&session()).unwrap()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "code,item,review_status");
        assert_eq!(lines[1], "100,\"Chair, oak\",pending");
        assert_eq!(lines[2], "200,Desk,reviewed");
    }

    #[test]
    fn xlsx_export_reloads_with_status_column() {
        let bytes = to_xlsx(&session()).unwrap();
        let ds = loader::load_dataset("export.xlsx", &bytes).unwrap();
        assert_eq!(ds.columns, vec!["code", "item", "review_status"]);
        assert_eq!(ds.rows[1][0], CellValue::Int(200));
        assert_eq!(ds.rows[1][2], CellValue::Text("reviewed".into()));
    }

    #[test]
    fn export_names_derive_from_upload() {
        let s = session();
        assert_eq!(export_filename(&s, ExportFormat::Csv), "Stock List_reviewed.csv");
        assert_eq!("XLSX".parse::<ExportFormat>().unwrap(), ExportFormat::Xlsx);
        assert!("pdf".parse::<ExportFormat>().is_err());
    }
}
