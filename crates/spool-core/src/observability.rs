//! Status views over a queue collection.

use serde::{Deserialize, Serialize};

use crate::queue::RecordStatus;

/// Number of records per status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    pub received: u64,
    pub processed: u64,
    pub failed: u64,
    pub skipped: u64,
    pub notified: u64,
    pub notify_failure: u64,
}

impl QueueCounts {
    pub fn get(&self, status: RecordStatus) -> u64 {
        match status {
            RecordStatus::Received => self.received,
            RecordStatus::Processed => self.processed,
            RecordStatus::Failed => self.failed,
            RecordStatus::Skipped => self.skipped,
            RecordStatus::Notified => self.notified,
            RecordStatus::NotifyFailure => self.notify_failure,
        }
    }

    pub fn set(&mut self, status: RecordStatus, count: u64) {
        let slot = match status {
            RecordStatus::Received => &mut self.received,
            RecordStatus::Processed => &mut self.processed,
            RecordStatus::Failed => &mut self.failed,
            RecordStatus::Skipped => &mut self.skipped,
            RecordStatus::Notified => &mut self.notified,
            RecordStatus::NotifyFailure => &mut self.notify_failure,
        };
        *slot = count;
    }

    pub fn total(&self) -> u64 {
        RecordStatus::ALL.iter().map(|s| self.get(*s)).sum()
    }

    /// Records that may still reach `onProcess` (received, failed or skipped).
    pub fn pending(&self) -> u64 {
        RecordStatus::ELIGIBLE.iter().map(|s| self.get(*s)).sum()
    }
}

/// What one `process_next_batch` call did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Records handed to the batch after prioritization.
    pub selected: usize,
    pub processed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub notified: usize,
    pub notify_failed: usize,
    /// A failure stopped the batch early (strict mode).
    pub halted: bool,
}

impl BatchReport {
    pub fn is_empty(&self) -> bool {
        self.selected == 0
    }
}
