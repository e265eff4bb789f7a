use crate::cell::CellValue;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Tabular contents of an uploaded sheet.
///
/// Rows keep the file order; a row's position is its identity for scanning.
/// Each row holds exactly one value per column, in column order.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Dataset {
    /// Build a dataset from a raw header and raw rows.
    ///
    /// Header names are made unique (`Unnamed: i` for blanks, `.1`, `.2` for
    /// repeats) and every row is padded or truncated to the header width.
    pub fn from_parts(header: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let columns = unique_columns(header);
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, CellValue::Empty);
                row
            })
            .collect();

        Dataset { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// One row as a JSON object keyed by column name, in column order.
    pub fn row_to_json(&self, index: usize) -> Option<Map<String, JsonValue>> {
        let row = self.rows.get(index)?;
        Some(
            self.columns
                .iter()
                .zip(row)
                .map(|(name, value)| (name.clone(), value.to_json()))
                .collect(),
        )
    }

    /// The first `limit` rows as JSON records.
    pub fn preview(&self, limit: usize) -> Vec<Map<String, JsonValue>> {
        (0..self.len().min(limit))
            .filter_map(|i| self.row_to_json(i))
            .collect()
    }
}

fn unique_columns(header: Vec<String>) -> Vec<String> {
    let mut columns: Vec<String> = Vec::with_capacity(header.len());

    for (i, raw) in header.into_iter().enumerate() {
        let base = match raw.trim() {
            "" => format!("Unnamed: {i}"),
            name => name.to_string(),
        };

        let mut name = base.clone();
        let mut suffix = 1;
        while columns.contains(&name) {
            name = format!("{base}.{suffix}");
            suffix += 1;
        }
        columns.push(name);
    }

    columns
}
