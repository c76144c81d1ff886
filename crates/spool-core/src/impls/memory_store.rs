//! In-memory record store.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::RecordId;
use crate::error::StoreError;
use crate::ports::{Filter, IdGenerator, RecordStore, RecordUpdate, SystemClock, UlidGenerator};
use crate::queue::{NewRecord, Record};

/// A single collection held in memory.
///
/// # 実装詳細
/// - Records are kept in insertion order, so `find` can stable-sort by
///   `received_date` and ties stay first-in first-out.
/// - One mutex guards the collection; every operation runs under it, which
///   makes each update atomic.
pub struct InMemoryRecordStore<T> {
    records: Mutex<Vec<Record<T>>>,
    ids: Box<dyn IdGenerator>,
}

impl<T> InMemoryRecordStore<T> {
    pub fn new() -> Self {
        Self::with_id_generator(UlidGenerator::new(SystemClock))
    }

    pub fn with_id_generator(ids: impl IdGenerator + 'static) -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            ids: Box::new(ids),
        }
    }

    /// Rebuilds a store from previously persisted records.
    pub fn from_records(records: Vec<Record<T>>) -> Self {
        Self {
            records: Mutex::new(records),
            ids: Box::new(UlidGenerator::new(SystemClock)),
        }
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

impl<T: Clone> InMemoryRecordStore<T> {
    /// All records in insertion order.
    pub async fn snapshot(&self) -> Vec<Record<T>> {
        self.records.lock().await.clone()
    }

    /// Swaps the whole collection, e.g. back to an earlier snapshot.
    pub(crate) async fn replace(&self, records: Vec<Record<T>>) {
        *self.records.lock().await = records;
    }
}

impl<T> Default for InMemoryRecordStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T> RecordStore<T> for InMemoryRecordStore<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn insert_one(&self, record: NewRecord<T>) -> Result<Record<T>, StoreError> {
        let record = record.with_id(self.ids.generate_record_id());
        self.records.lock().await.push(record.clone());
        Ok(record)
    }

    async fn find(&self, filter: &Filter, limit: usize) -> Result<Vec<Record<T>>, StoreError> {
        let records = self.records.lock().await;
        let mut found: Vec<Record<T>> = records
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        drop(records);

        found.sort_by_key(|r| r.received_date);
        found.truncate(limit);
        Ok(found)
    }

    async fn get(&self, id: RecordId) -> Result<Option<Record<T>>, StoreError> {
        let records = self.records.lock().await;
        Ok(records.iter().find(|r| r.id == id).cloned())
    }

    async fn update_one(&self, id: RecordId, update: &RecordUpdate) -> Result<bool, StoreError> {
        let mut records = self.records.lock().await;
        match records.iter_mut().find(|r| r.id == id) {
            Some(record) => {
                update.apply(record);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_many(&self, filter: &Filter, update: &RecordUpdate) -> Result<u64, StoreError> {
        let mut records = self.records.lock().await;
        let mut matched = 0;
        for record in records.iter_mut().filter(|r| filter.matches(r)) {
            update.apply(record);
            matched += 1;
        }
        Ok(matched)
    }

    async fn delete_many(&self, filter: &Filter) -> Result<u64, StoreError> {
        let mut records = self.records.lock().await;
        let before = records.len();
        records.retain(|r| !filter.matches(r));
        Ok((before - records.len()) as u64)
    }

    async fn count(&self, filter: &Filter) -> Result<u64, StoreError> {
        let records = self.records.lock().await;
        Ok(records.iter().filter(|r| filter.matches(r)).count() as u64)
    }
}
