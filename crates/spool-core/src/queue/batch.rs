//! Batch selection and prioritization.
//!
//! Two modes:
//! - continue-on-error: every due record (`received | failed | skipped` with
//!   `available <= now`), oldest first.
//! - strict: outstanding failed records are fetched even while backing off.
//!   If the oldest one is not due yet, nothing runs this tick, so no record is
//!   ever processed ahead of an unresolved failure.

use chrono::{DateTime, Utc};

use super::{Record, RecordStatus};
use crate::ports::Filter;

/// Records eligible for processing at `now`.
pub fn due_filter(now: DateTime<Utc>) -> Filter {
    Filter::And(vec![
        Filter::StatusIn(RecordStatus::ELIGIBLE.to_vec()),
        Filter::AvailableAtOrBefore(now),
    ])
}

/// The store query for one tick.
pub fn selection_filter(continue_on_error: bool, now: DateTime<Utc>) -> Filter {
    if continue_on_error {
        due_filter(now)
    } else {
        Filter::Or(vec![Filter::status(RecordStatus::Failed), due_filter(now)])
    }
}

/// Narrows the fetched records (oldest first) down to what may run now.
pub fn prioritize<T>(
    records: Vec<Record<T>>,
    continue_on_error: bool,
    now: DateTime<Utc>,
) -> Vec<Record<T>> {
    if continue_on_error {
        return records;
    }

    let blocked = records
        .iter()
        .find(|r| r.status == RecordStatus::Failed)
        .is_some_and(|failed| !failed.is_available_at(now));
    if blocked {
        return Vec::new();
    }

    // Later failed records may still be backing off.
    records
        .into_iter()
        .filter(|r| r.is_available_at(now))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RecordId;
    use crate::queue::NewRecord;
    use chrono::{Duration, TimeZone};
    use ulid::Ulid;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn record(name: &'static str, status: RecordStatus, due_in_secs: i64) -> Record<&'static str> {
        let mut record = NewRecord::received(name, now()).with_id(RecordId::from_ulid(Ulid::new()));
        record.status = status;
        record.available = Some(now() + Duration::seconds(due_in_secs));
        record
    }

    fn names(records: &[Record<&'static str>]) -> Vec<&'static str> {
        records.iter().map(|r| r.data).collect()
    }

    #[test]
    fn strict_query_includes_failed_records_that_are_not_due() {
        let filter = selection_filter(false, now());
        assert!(filter.matches(&record("backing-off", RecordStatus::Failed, 30)));
        assert!(!filter.matches(&record("later", RecordStatus::Received, 30)));
        assert!(!filter.matches(&record("done", RecordStatus::Processed, -30)));

        let lenient = selection_filter(true, now());
        assert!(!lenient.matches(&record("backing-off", RecordStatus::Failed, 30)));
        assert!(lenient.matches(&record("skipped", RecordStatus::Skipped, 0)));
    }

    #[test]
    fn strict_mode_blocks_behind_a_failed_record_in_backoff() {
        let batch = vec![
            record("failed", RecordStatus::Failed, 30),
            record("fresh", RecordStatus::Received, 0),
        ];
        assert!(prioritize(batch, false, now()).is_empty());
    }

    #[test]
    fn strict_mode_runs_due_failed_record_first() {
        let batch = vec![
            record("failed", RecordStatus::Failed, 0),
            record("fresh", RecordStatus::Received, 0),
        ];
        assert_eq!(names(&prioritize(batch, false, now())), vec!["failed", "fresh"]);
    }

    #[test]
    fn strict_mode_drops_later_failed_records_still_backing_off() {
        let batch = vec![
            record("failed-due", RecordStatus::Failed, -5),
            record("fresh", RecordStatus::Received, 0),
            record("failed-waiting", RecordStatus::Failed, 30),
        ];
        assert_eq!(
            names(&prioritize(batch, false, now())),
            vec!["failed-due", "fresh"]
        );
    }

    #[test]
    fn continue_mode_keeps_the_batch_as_fetched() {
        let batch = vec![
            record("a", RecordStatus::Received, 0),
            record("b", RecordStatus::Failed, -1),
        ];
        assert_eq!(names(&prioritize(batch, true, now())), vec!["a", "b"]);
    }
}
