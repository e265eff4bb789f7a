use crate::dataset::Dataset;
use crate::error::InventoryError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Row indices already marked as reviewed. Grows monotonically until reset.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct ScannedSet(BTreeSet<usize>);

impl ScannedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the index was not present yet.
    pub fn insert(&mut self, index: usize) -> bool {
        self.0.insert(index)
    }

    pub fn contains(&self, index: usize) -> bool {
        self.0.contains(&index)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First index that does not fit a dataset of `rows` rows, if any.
    pub fn out_of_range(&self, rows: usize) -> Option<usize> {
        self.0.range(rows..).next().copied()
    }
}

/// Result of scanning one code against a dataset.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScanOutcome {
    pub code: String,
    /// Every row holding the code, ascending.
    pub matched_indices: Vec<usize>,
    /// The subset of `matched_indices` that was not scanned before.
    pub new_scanned: Vec<usize>,
    pub total_scanned: usize,
}

impl ScanOutcome {
    pub fn found(&self) -> bool {
        !self.matched_indices.is_empty()
    }
}

/// Rows with at least one cell whose text equals `code` exactly.
///
/// Full scan of every cell; datasets are small enough that no index is kept.
pub fn find_matches(dataset: &Dataset, code: &str) -> Vec<usize> {
    dataset
        .rows
        .iter()
        .enumerate()
        .filter(|(_, row)| row.iter().any(|cell| cell.matches(code)))
        .map(|(index, _)| index)
        .collect()
}

/// Look up a scanned code and mark every matching row as reviewed.
///
/// The code is trimmed first. Re-scanning a code reports the same matches
/// again but adds nothing to `scanned`.
///
/// # Errors
/// * `EmptyCode` if the code is empty or whitespace only
///
/// # Examples
/// ```
/// use inventory_scanner::{CellValue, Dataset, ScannedSet, scan};
///
/// let ds = Dataset::from_parts(
///     vec!["sku".into()],
///     vec![vec![CellValue::Text("A1".into())], vec![CellValue::Text("B2".into())]],
/// );
/// let mut scanned = ScannedSet::new();
/// let outcome = scan(&ds, &mut scanned, " B2 ").unwrap();
/// assert_eq!(outcome.new_scanned, vec![1]);
/// ```
pub fn scan(
    dataset: &Dataset,
    scanned: &mut ScannedSet,
    code: &str,
) -> Result<ScanOutcome, InventoryError> {
    let code = code.trim();
    if code.is_empty() {
        return Err(InventoryError::EmptyCode);
    }

    let matched_indices = find_matches(dataset, code);
    let new_scanned = matched_indices
        .iter()
        .copied()
        .filter(|&index| scanned.insert(index))
        .collect();

    Ok(ScanOutcome {
        code: code.to_string(),
        matched_indices,
        new_scanned,
        total_scanned: scanned.len(),
    })
}
