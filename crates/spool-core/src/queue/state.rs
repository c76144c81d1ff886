//! Record status state machine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Status of a queued record.
///
/// State transitions:
/// - Received -> Processed
/// - Received -> Failed -> Failed ... (loop while retries remain)
/// - Received -> Skipped -> Skipped ... (deferral, never counted as a retry)
/// - Failed (retries exhausted) -> Notified | NotifyFailure
/// - any (Fail signal) -> Notified | NotifyFailure
/// - any -> Received (explicit reset only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecordStatus {
    /// Enqueued (or reset), never attempted since.
    Received,

    /// Processed successfully.
    Processed,

    /// Last attempt failed; waiting for backoff.
    Failed,

    /// Deferred by the processor.
    Skipped,

    /// Failure callback ran successfully.
    Notified,

    /// Failure callback itself failed.
    NotifyFailure,
}

impl RecordStatus {
    pub const ALL: [RecordStatus; 6] = [
        RecordStatus::Received,
        RecordStatus::Processed,
        RecordStatus::Failed,
        RecordStatus::Skipped,
        RecordStatus::Notified,
        RecordStatus::NotifyFailure,
    ];

    /// Statuses that batch selection may pick up (subject to `available`).
    pub const ELIGIBLE: [RecordStatus; 3] = [
        RecordStatus::Received,
        RecordStatus::Failed,
        RecordStatus::Skipped,
    ];

    /// Terminal for normal flow; only a reset reopens the record.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RecordStatus::Processed | RecordStatus::Notified | RecordStatus::NotifyFailure
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RecordStatus::Received => "received",
            RecordStatus::Processed => "processed",
            RecordStatus::Failed => "failed",
            RecordStatus::Skipped => "skipped",
            RecordStatus::Notified => "notified",
            RecordStatus::NotifyFailure => "notifyFailure",
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(RecordStatus::Received, false)]
    #[case(RecordStatus::Failed, false)]
    #[case(RecordStatus::Skipped, false)]
    #[case(RecordStatus::Processed, true)]
    #[case(RecordStatus::Notified, true)]
    #[case(RecordStatus::NotifyFailure, true)]
    fn terminal_statuses(#[case] status: RecordStatus, #[case] terminal: bool) {
        assert_eq!(status.is_terminal(), terminal);
        assert_eq!(RecordStatus::ELIGIBLE.contains(&status), !terminal);
    }

    #[test]
    fn serializes_with_document_names() {
        for status in RecordStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }
}
