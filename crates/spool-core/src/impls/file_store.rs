//! JSON-file backed record store.
//!
//! The collection lives in memory and is written to disk as one JSON document
//! after every mutation (write to `<path>.tmp`, then rename). Reopening the
//! file restores the collection, so queued records survive restarts.
//!
//! A mutation only sticks once its snapshot is on disk. If the write fails the
//! in-memory collection is rolled back and the error is returned.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use super::InMemoryRecordStore;
use crate::domain::RecordId;
use crate::error::StoreError;
use crate::ports::{Filter, RecordStore, RecordUpdate};
use crate::queue::{NewRecord, Record};

pub struct JsonFileRecordStore<T> {
    path: PathBuf,
    inner: InMemoryRecordStore<T>,
    /// Serializes mutate + persist so snapshots hit the disk in order.
    write_lock: Mutex<()>,
}

impl<T> JsonFileRecordStore<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Opens the collection at `path`, starting empty if the file does not exist.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let records: Vec<Record<T>> = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => Vec::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(path = %path.display(), records = records.len(), "opened record file");

        Ok(Self {
            path,
            inner: InMemoryRecordStore::from_records(records),
            write_lock: Mutex::new(()),
        })
    }

    async fn persist(&self) -> Result<(), StoreError> {
        let records = self.inner.snapshot().await;
        let bytes = serde_json::to_vec(&records)?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Persists the current collection, restoring `before` when that fails.
    async fn persist_or_rollback(&self, before: Vec<Record<T>>) -> Result<(), StoreError> {
        if let Err(e) = self.persist().await {
            tracing::warn!(path = %self.path.display(), error = %e, "record file write failed, change rolled back");
            self.inner.replace(before).await;
            return Err(e);
        }
        Ok(())
    }
}

#[async_trait]
impl<T> RecordStore<T> for JsonFileRecordStore<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn insert_one(&self, record: NewRecord<T>) -> Result<Record<T>, StoreError> {
        let _guard = self.write_lock.lock().await;
        let before = self.inner.snapshot().await;
        let inserted = self.inner.insert_one(record).await?;
        self.persist_or_rollback(before).await?;
        Ok(inserted)
    }

    async fn find(&self, filter: &Filter, limit: usize) -> Result<Vec<Record<T>>, StoreError> {
        self.inner.find(filter, limit).await
    }

    async fn get(&self, id: RecordId) -> Result<Option<Record<T>>, StoreError> {
        self.inner.get(id).await
    }

    async fn update_one(&self, id: RecordId, update: &RecordUpdate) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().await;
        let before = self.inner.snapshot().await;
        let matched = self.inner.update_one(id, update).await?;
        if matched {
            self.persist_or_rollback(before).await?;
        }
        Ok(matched)
    }

    async fn update_many(&self, filter: &Filter, update: &RecordUpdate) -> Result<u64, StoreError> {
        let _guard = self.write_lock.lock().await;
        let before = self.inner.snapshot().await;
        let matched = self.inner.update_many(filter, update).await?;
        if matched > 0 {
            self.persist_or_rollback(before).await?;
        }
        Ok(matched)
    }

    async fn delete_many(&self, filter: &Filter) -> Result<u64, StoreError> {
        let _guard = self.write_lock.lock().await;
        let before = self.inner.snapshot().await;
        let deleted = self.inner.delete_many(filter).await?;
        if deleted > 0 {
            self.persist_or_rollback(before).await?;
        }
        Ok(deleted)
    }

    async fn count(&self, filter: &Filter) -> Result<u64, StoreError> {
        self.inner.count(filter).await
    }
}
