use crate::dataset::Dataset;
use crate::error::InventoryError;
use crate::progress::Progress;
use crate::scanner::{self, ScanOutcome, ScannedSet};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Everything one browser session works on: the uploaded dataset, the rows
/// scanned so far and where the data came from.
///
/// Handlers load it from a [`crate::store::SessionStore`], operate on it and
/// write it back; nothing about a session lives outside this struct.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct InventorySession {
    pub dataset: Dataset,
    pub scanned: ScannedSet,
    pub filename: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl InventorySession {
    pub fn new(dataset: Dataset, filename: impl Into<String>, ttl: Duration) -> Self {
        let created_at = Utc::now();
        InventorySession {
            dataset,
            scanned: ScannedSet::new(),
            filename: filename.into(),
            created_at,
            expires_at: created_at + ttl,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn scan(&mut self, code: &str) -> Result<ScanOutcome, InventoryError> {
        scanner::scan(&self.dataset, &mut self.scanned, code)
    }

    pub fn progress(&self) -> Progress {
        Progress::compute(self.dataset.len(), self.scanned.len())
    }

    pub fn is_reviewed(&self, index: usize) -> bool {
        self.scanned.contains(index)
    }

    /// Check that every scanned index points at a row of the dataset.
    pub fn validate(&self) -> Result<(), InventoryError> {
        match self.scanned.out_of_range(self.dataset.len()) {
            Some(index) => Err(InventoryError::CorruptSession(format!(
                "scanned row {} but dataset has {} rows",
                index,
                self.dataset.len()
            ))),
            None => Ok(()),
        }
    }
}
