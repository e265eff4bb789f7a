use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

/// A single scalar cell of an uploaded sheet.
///
/// Derives plain serde so it survives bincode; use [`CellValue::to_json`] for API output.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

// Largest integer an f64 holds exactly.
const MAX_EXACT_FLOAT: f64 = 9_007_199_254_740_992.0;

impl CellValue {
    /// Spreadsheets store every number as a float; integral ones become `Int`.
    pub fn from_float(f: f64) -> Self {
        if f.is_finite() && f.fract() == 0.0 && f.abs() <= MAX_EXACT_FLOAT {
            CellValue::Int(f as i64)
        } else {
            CellValue::Float(f)
        }
    }

    /// Interpret a raw text field, keeping it as text unless the number prints
    /// back identically (`00123` and `1e3` stay text).
    pub fn from_text(s: &str) -> Self {
        if s.is_empty() {
            return CellValue::Empty;
        }
        if let Ok(i) = s.parse::<i64>() {
            if i.to_string() == s {
                return CellValue::Int(i);
            }
        }
        if let Ok(f) = s.parse::<f64>() {
            if f.is_finite() && f.to_string() == s {
                return CellValue::Float(f);
            }
        }
        CellValue::Text(s.to_string())
    }

    /// Canonical text form, the one barcodes are compared against.
    pub fn as_text(&self) -> String {
        self.to_string()
    }

    /// Exact textual equality without allocating for text cells.
    pub fn matches(&self, code: &str) -> bool {
        match self {
            CellValue::Empty => false,
            CellValue::Text(s) => s == code,
            other => other.to_string() == code,
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            CellValue::Empty => JsonValue::Null,
            CellValue::Int(i) => JsonValue::from(*i),
            CellValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            CellValue::Bool(b) => JsonValue::Bool(*b),
            CellValue::Text(s) => JsonValue::String(s.clone()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Int(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(true) => write!(f, "True"),
            CellValue::Bool(false) => write!(f, "False"),
            CellValue::Text(s) => write!(f, "{s}"),
        }
    }
}
