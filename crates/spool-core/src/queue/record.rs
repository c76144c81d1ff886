//! Record: payload + queue metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RecordStatus;
use crate::domain::RecordId;

/// One unit of queued work as stored in the collection.
///
/// Design:
/// - `data` is opaque; the queue never inspects it.
/// - `available` is owned by the engine. It is absent once a record is
///   processed successfully.
/// - `retry_count` only grows through ordinary failures and disappears on
///   success or reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record<T> {
    pub id: RecordId,
    pub received_date: DateTime<Utc>,
    pub status: RecordStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available: Option<DateTime<Utc>>,

    pub data: T,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_count: Option<u32>,

    /// Last failure message, with its cause chain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_date: Option<DateTime<Utc>>,

    /// Set when a Fail signal (not an ordinary error) ended the record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub immediate_failure: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify_failure_reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_date: Option<DateTime<Utc>>,
}

impl<T> Record<T> {
    /// Is the record due at `now`? Records without `available` never are.
    pub fn is_available_at(&self, now: DateTime<Utc>) -> bool {
        self.available.is_some_and(|at| at <= now)
    }
}

/// A record before the store has assigned its id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord<T> {
    pub received_date: DateTime<Utc>,
    pub status: RecordStatus,
    pub available: DateTime<Utc>,
    pub data: T,
}

impl<T> NewRecord<T> {
    /// A freshly enqueued payload: received and available immediately.
    pub fn received(data: T, now: DateTime<Utc>) -> Self {
        Self {
            received_date: now,
            status: RecordStatus::Received,
            available: now,
            data,
        }
    }

    pub fn with_id(self, id: RecordId) -> Record<T> {
        Record {
            id,
            received_date: self.received_date,
            status: self.status,
            available: Some(self.available),
            data: self.data,
            retry_count: None,
            failure_reason: None,
            processed_date: None,
            immediate_failure: None,
            notify_failure_reason: None,
            reset_date: None,
        }
    }
}
