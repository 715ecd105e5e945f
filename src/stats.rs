use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::outcome::RestoreOutcome;

/// Totals across every batch a client has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RestoreStats {
    pub start_time: DateTime<Utc>,
    pub batches_submitted: u64,
    pub batches_completed: u64,
    pub files_restored: u64,
    pub files_failed: u64,
    pub bytes_restored: u64,
    pub retries: u64,
}

impl RestoreStats {
    pub fn new() -> Self {
        RestoreStats {
            start_time: Utc::now(),
            batches_submitted: 0,
            batches_completed: 0,
            files_restored: 0,
            files_failed: 0,
            bytes_restored: 0,
            retries: 0,
        }
    }

    pub fn add_file(&mut self, outcome: &RestoreOutcome, size: u64) {
        if outcome.is_success() {
            self.files_restored += 1;
            self.bytes_restored += size;
        } else {
            self.files_failed += 1;
        }
    }

    pub fn add_batch(&mut self) {
        self.batches_completed += 1;
    }

    pub fn elapsed_time(&self) -> Duration {
        let delta = Utc::now() - self.start_time;
        delta.to_std().unwrap_or_default()
    }
}

impl Default for RestoreStats {
    fn default() -> Self {
        RestoreStats::new()
    }
}
