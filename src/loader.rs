use crate::cell::CellValue;
use crate::dataset::Dataset;
use crate::error::InventoryError;
use calamine::{Data, Reader, open_workbook_auto_from_rs};
use std::io::Cursor;
use std::path::Path;

/// Extensions accepted at upload, lowercase.
pub const ALLOWED_EXTENSIONS: &[&str] = &["xlsx", "xls", "csv"];

/// Lowercased extension of `filename` if it is one we can load.
///
/// # Errors
/// * `DisallowedExtension` for anything outside [`ALLOWED_EXTENSIONS`],
///   including names without an extension
pub fn allowed_extension(filename: &str) -> Result<String, InventoryError> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());

    match extension {
        Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => Ok(ext),
        Some(ext) => Err(InventoryError::DisallowedExtension(ext)),
        None => Err(InventoryError::DisallowedExtension(filename.to_string())),
    }
}

/// Reduce a client-supplied filename to something safe to echo and store.
///
/// Directory components are dropped, whitespace becomes `_` and only ASCII
/// alphanumerics, `.`, `_` and `-` survive. Leading dots are stripped.
pub fn secure_filename(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or("");

    let cleaned: String = base
        .chars()
        .filter_map(|c| {
            if c.is_whitespace() {
                Some('_')
            } else if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                Some(c)
            } else {
                None
            }
        })
        .collect();

    cleaned.trim_start_matches(['.', '_']).to_string()
}

/// Parse uploaded bytes into a [`Dataset`], dispatching on the filename's extension.
///
/// # Arguments
/// * `filename` - Name the client uploaded the file under
/// * `bytes` - Raw file contents
///
/// # Examples
/// ```
/// use inventory_scanner::loader::load_dataset;
///
/// let ds = load_dataset("stock.csv", b"sku,name\nA1,Bolt\n").unwrap();
/// assert_eq!(ds.len(), 1);
/// assert_eq!(ds.columns, vec!["sku", "name"]);
/// ```
pub fn load_dataset(filename: &str, bytes: &[u8]) -> Result<Dataset, InventoryError> {
    if bytes.is_empty() {
        return Err(InventoryError::MissingFile);
    }

    match allowed_extension(filename)?.as_str() {
        "csv" => from_csv(bytes),
        _ => from_excel(bytes),
    }
}

/// Load the first worksheet of an `.xlsx`/`.xls` workbook; row one is the header.
pub fn from_excel(bytes: &[u8]) -> Result<Dataset, InventoryError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| InventoryError::Unparsable(e.to_string()))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| InventoryError::Unparsable("no sheets found in workbook".to_string()))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| InventoryError::Unparsable(e.to_string()))?;

    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| InventoryError::Unparsable("sheet is empty".to_string()))?
        .iter()
        .map(|cell| excel_cell(cell).as_text())
        .collect::<Vec<_>>();

    let rows = rows
        .map(|row| row.iter().map(excel_cell).collect())
        .collect();

    Ok(Dataset::from_parts(header, rows))
}

fn excel_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) => CellValue::from_float(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::String(s) if s.is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(naive) => CellValue::Text(naive.to_string()),
            None => CellValue::from_float(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(_) | Data::Empty => CellValue::Empty,
    }
}

/// Load a comma-separated file; the first record is the header.
pub fn from_csv(bytes: &[u8]) -> Result<Dataset, InventoryError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let header: Vec<String> = reader
        .headers()
        .map_err(|e| InventoryError::Unparsable(e.to_string()))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    if header.is_empty() {
        return Err(InventoryError::Unparsable("CSV file has no header row".to_string()));
    }

    let mut rows = Vec::new();
    for (row_no, record) in reader.records().enumerate() {
        let record = record
            .map_err(|e| InventoryError::Unparsable(format!("CSV row {}: {}", row_no + 1, e)))?;
        rows.push(record.iter().map(CellValue::from_text).collect());
    }

    Ok(Dataset::from_parts(header, rows))
}
