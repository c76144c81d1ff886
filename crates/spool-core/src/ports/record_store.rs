//! RecordStore port - the document store holding one queue collection.
//!
//! The queue needs five things from its store: insert one document, find with
//! a filter (oldest first, limited), update one document atomically, update
//! many documents, and delete by filter. Queries and updates are expressed
//! with the typed [`Filter`] and [`RecordUpdate`] values below so that any
//! document database can translate them.
//!
//! # 設計原則
//! - A single-document update is atomic and durable.
//! - No cross-document transactions are assumed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::RecordId;
use crate::error::StoreError;
use crate::queue::{NewRecord, Record, RecordStatus};

#[async_trait]
pub trait RecordStore<T>: Send + Sync {
    /// Inserts a record and returns it with its assigned id.
    async fn insert_one(&self, record: NewRecord<T>) -> Result<Record<T>, StoreError>;

    /// Records matching `filter`, by `received_date` ascending, at most `limit`.
    async fn find(&self, filter: &Filter, limit: usize) -> Result<Vec<Record<T>>, StoreError>;

    async fn get(&self, id: RecordId) -> Result<Option<Record<T>>, StoreError>;

    /// Applies `update` to one record. Returns whether the id matched.
    async fn update_one(&self, id: RecordId, update: &RecordUpdate) -> Result<bool, StoreError>;

    /// Applies `update` to every match. Returns the matched count.
    async fn update_many(&self, filter: &Filter, update: &RecordUpdate) -> Result<u64, StoreError>;

    /// Deletes every match. Returns the deleted count.
    async fn delete_many(&self, filter: &Filter) -> Result<u64, StoreError>;

    async fn count(&self, filter: &Filter) -> Result<u64, StoreError>;
}

/// Query over queue records.
///
/// Predicates on optional timestamps never match a record where the field is
/// absent.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    All,
    StatusIn(Vec<RecordStatus>),
    IdIn(Vec<RecordId>),
    AvailableAtOrBefore(DateTime<Utc>),
    ProcessedAtOrBefore(DateTime<Utc>),
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn status(status: RecordStatus) -> Self {
        Filter::StatusIn(vec![status])
    }

    pub fn matches<T>(&self, record: &Record<T>) -> bool {
        match self {
            Filter::All => true,
            Filter::StatusIn(statuses) => statuses.contains(&record.status),
            Filter::IdIn(ids) => ids.contains(&record.id),
            Filter::AvailableAtOrBefore(at) => record.available.is_some_and(|a| a <= *at),
            Filter::ProcessedAtOrBefore(at) => record.processed_date.is_some_and(|p| p <= *at),
            Filter::And(filters) => filters.iter().all(|f| f.matches(record)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(record)),
        }
    }
}

/// What to do with one optional field.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldOp<V> {
    #[default]
    Keep,
    Set(V),
    Unset,
}

impl<V: Clone> FieldOp<V> {
    fn apply(&self, field: &mut Option<V>) {
        match self {
            FieldOp::Keep => {}
            FieldOp::Set(value) => *field = Some(value.clone()),
            FieldOp::Unset => *field = None,
        }
    }
}

/// Update of the retry counter.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum CounterOp {
    #[default]
    Keep,
    /// Adds one; an absent counter counts as zero.
    Increment,
    Unset,
}

/// A per-field patch, applied atomically to each matched record.
///
/// `data` and `id` are never touched by an update.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordUpdate {
    pub status: Option<RecordStatus>,
    pub received_date: Option<DateTime<Utc>>,
    pub available: FieldOp<DateTime<Utc>>,
    pub retry_count: CounterOp,
    pub failure_reason: FieldOp<String>,
    pub processed_date: FieldOp<DateTime<Utc>>,
    pub immediate_failure: FieldOp<bool>,
    pub notify_failure_reason: FieldOp<String>,
    pub reset_date: FieldOp<DateTime<Utc>>,
}

impl RecordUpdate {
    pub fn apply<T>(&self, record: &mut Record<T>) {
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(received_date) = self.received_date {
            record.received_date = received_date;
        }
        self.available.apply(&mut record.available);
        match self.retry_count {
            CounterOp::Keep => {}
            CounterOp::Increment => {
                record.retry_count = Some(record.retry_count.unwrap_or(0).saturating_add(1));
            }
            CounterOp::Unset => record.retry_count = None,
        }
        self.failure_reason.apply(&mut record.failure_reason);
        self.processed_date.apply(&mut record.processed_date);
        self.immediate_failure.apply(&mut record.immediate_failure);
        self.notify_failure_reason
            .apply(&mut record.notify_failure_reason);
        self.reset_date.apply(&mut record.reset_date);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use ulid::Ulid;

    fn record_at(now: DateTime<Utc>) -> Record<&'static str> {
        NewRecord::received("x", now).with_id(RecordId::from_ulid(Ulid::new()))
    }

    #[test]
    fn timestamp_predicates_ignore_missing_fields() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut record = record_at(now);
        assert!(Filter::AvailableAtOrBefore(now).matches(&record));
        assert!(!Filter::ProcessedAtOrBefore(now).matches(&record));

        record.available = None;
        assert!(!Filter::AvailableAtOrBefore(now).matches(&record));
    }

    #[test]
    fn boolean_combinators() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let record = record_at(now + Duration::seconds(5));

        let due = Filter::And(vec![
            Filter::StatusIn(RecordStatus::ELIGIBLE.to_vec()),
            Filter::AvailableAtOrBefore(now),
        ]);
        assert!(!due.matches(&record));

        let due_or_received = Filter::Or(vec![due, Filter::status(RecordStatus::Received)]);
        assert!(due_or_received.matches(&record));
        assert!(Filter::IdIn(vec![record.id]).matches(&record));
        assert!(!Filter::IdIn(vec![]).matches(&record));
    }

    #[test]
    fn increment_starts_at_one_and_unset_clears() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut record = record_at(now);

        let failure = RecordUpdate {
            status: Some(RecordStatus::Failed),
            retry_count: CounterOp::Increment,
            failure_reason: FieldOp::Set("boom".to_string()),
            ..Default::default()
        };
        failure.apply(&mut record);
        assert_eq!(record.retry_count, Some(1));
        failure.apply(&mut record);
        assert_eq!(record.retry_count, Some(2));
        assert_eq!(record.failure_reason.as_deref(), Some("boom"));

        let success = RecordUpdate {
            status: Some(RecordStatus::Processed),
            retry_count: CounterOp::Unset,
            failure_reason: FieldOp::Unset,
            available: FieldOp::Unset,
            ..Default::default()
        };
        success.apply(&mut record);
        assert_eq!(record.status, RecordStatus::Processed);
        assert!(record.retry_count.is_none());
        assert!(record.failure_reason.is_none());
        assert!(record.available.is_none());
        assert_eq!(record.data, "x");
    }
}
