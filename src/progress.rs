use serde::Serialize;

/// Review progress counters for one session.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct Progress {
    pub total_items: usize,
    pub scanned_items: usize,
    pub pending_items: usize,
    /// Percentage scanned, rounded to two decimals.
    pub progress: f64,
}

impl Progress {
    pub fn compute(total: usize, scanned: usize) -> Self {
        let scanned = scanned.min(total);
        let progress = if total == 0 {
            0.0
        } else {
            round2(scanned as f64 / total as f64 * 100.0)
        };

        Progress {
            total_items: total,
            scanned_items: scanned,
            pending_items: total - scanned,
            progress,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.total_items > 0 && self.pending_items == 0
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds() {
        let none = Progress::compute(10, 0);
        assert_eq!(none.progress, 0.0);
        assert_eq!(none.pending_items, 10);

        let all = Progress::compute(10, 10);
        assert_eq!(all.progress, 100.0);
        assert!(all.is_complete());
    }

    #[test]
    fn empty_dataset_has_zero_progress() {
        let p = Progress::compute(0, 0);
        assert_eq!(p.progress, 0.0);
        assert!(!p.is_complete());
    }

    #[test]
    fn rounds_to_two_decimals() {
        assert_eq!(Progress::compute(3, 1).progress, 33.33);
        assert_eq!(Progress::compute(3, 2).progress, 66.67);
    }
}
