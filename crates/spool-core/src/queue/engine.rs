//! RetryQueue - キューエンジン
//!
//! Owns one collection and drives each record through
//! `received -> processed | failed | skipped -> notified | notifyFailure`.
//!
//! # フロー (process_next_batch)
//! 1. select: due records, oldest first (strict mode also fetches failed ones)
//! 2. prioritize: strict mode blocks behind a failed record in backoff
//! 3. for each record, in order: exhausted? notify : process -> transition
//! 4. strict mode stops the batch after the first ordinary failure
//!
//! Business failures are recorded on the records. Only store errors reach
//! the caller.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::batch;
use super::flight::FlightGuard;
use super::{NewRecord, QueueConfig, Record, RecordStatus, RetryPolicy};
use crate::domain::{Outcome, RecordId, RecordKey, error_chain};
use crate::error::{ConfigError, SpoolError, StoreError};
use crate::observability::{BatchReport, QueueCounts};
use crate::ports::{
    Clock, CounterOp, FailureNotifier, FieldOp, Filter, NoopNotifier, RecordProcessor,
    RecordStore, RecordUpdate, SystemClock,
};

pub struct RetryQueue<T: Sync> {
    config: QueueConfig,
    retry: RetryPolicy,
    store: Arc<dyn RecordStore<T>>,
    processor: Arc<dyn RecordProcessor<T>>,
    notifier: Arc<dyn FailureNotifier<T>>,
    clock: Arc<dyn Clock>,
    batch_flight: FlightGuard,
    cleanup_flight: FlightGuard,
}

impl<T> RetryQueue<T>
where
    T: Send + Sync + 'static,
{
    /// Validates `config` and binds the queue to `store`.
    ///
    /// Failures are not reported anywhere until a notifier is set with
    /// [`with_notifier`](Self::with_notifier); exhausted records still end
    /// up `notified`.
    pub fn new(
        config: QueueConfig,
        store: Arc<dyn RecordStore<T>>,
        processor: Arc<dyn RecordProcessor<T>>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            retry: config.retry_policy(),
            config,
            store,
            processor,
            notifier: Arc::new(NoopNotifier),
            clock: Arc::new(SystemClock),
            batch_flight: FlightGuard::new("process_next_batch"),
            cleanup_flight: FlightGuard::new("cleanup"),
        })
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn FailureNotifier<T>>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    fn collection(&self) -> &str {
        &self.config.collection_name
    }

    /// Stores `data` as a new `received` record, available immediately.
    pub async fn enqueue(&self, data: T) -> Result<Record<T>, SpoolError> {
        let record = self
            .store
            .insert_one(NewRecord::received(data, self.clock.now()))
            .await?;
        tracing::debug!(
            collection = self.collection(),
            record_id = %record.id,
            "record enqueued"
        );
        Ok(record)
    }

    /// Runs one tick: selects up to `batch_size` due records and processes
    /// them one after another.
    ///
    /// Returns `SpoolError::Busy` if another call is still in flight.
    pub async fn process_next_batch(&self) -> Result<BatchReport, SpoolError> {
        let _permit = self.batch_flight.try_enter()?;

        let now = self.clock.now();
        let continue_on_error = self.config.continue_processing_on_error;
        let fetched = self
            .store
            .find(
                &batch::selection_filter(continue_on_error, now),
                self.config.batch_size,
            )
            .await?;
        let records = batch::prioritize(fetched, continue_on_error, now);

        let mut report = BatchReport {
            selected: records.len(),
            ..Default::default()
        };
        for record in records {
            let halt = self.process_record(record, &mut report).await?;
            if halt {
                report.halted = true;
                break;
            }
        }

        if !report.is_empty() {
            tracing::info!(
                collection = self.collection(),
                selected = report.selected,
                processed = report.processed,
                failed = report.failed,
                skipped = report.skipped,
                notified = report.notified,
                notify_failed = report.notify_failed,
                halted = report.halted,
                "batch finished"
            );
        }
        Ok(report)
    }

    /// Returns true when the rest of the batch must not run.
    async fn process_record(
        &self,
        record: Record<T>,
        report: &mut BatchReport,
    ) -> Result<bool, StoreError> {
        if self.retry.is_exhausted(record.retry_count) {
            tracing::debug!(
                collection = self.collection(),
                record_id = %record.id,
                retry_count = record.retry_count,
                "retries exhausted"
            );
            self.notify(&record, report).await?;
            return Ok(false);
        }

        let outcome = Outcome::from(self.processor.process(&record).await);
        let now = self.clock.now();

        match outcome {
            Outcome::Success => {
                let update = RecordUpdate {
                    status: Some(RecordStatus::Processed),
                    processed_date: FieldOp::Set(now),
                    available: FieldOp::Unset,
                    retry_count: CounterOp::Unset,
                    failure_reason: FieldOp::Unset,
                    ..Default::default()
                };
                self.write(record.id, &update, RecordStatus::Processed).await?;
                report.processed += 1;
                Ok(false)
            }
            Outcome::Skip { delay } => {
                let update = RecordUpdate {
                    status: Some(RecordStatus::Skipped),
                    processed_date: FieldOp::Set(now),
                    available: FieldOp::Set(later(now, delay)),
                    ..Default::default()
                };
                tracing::debug!(
                    collection = self.collection(),
                    record_id = %record.id,
                    delay_ms = delay.as_millis() as u64,
                    "record skipped"
                );
                self.write(record.id, &update, RecordStatus::Skipped).await?;
                report.skipped += 1;
                Ok(false)
            }
            Outcome::Fail { reason } => {
                let update = RecordUpdate {
                    immediate_failure: FieldOp::Set(true),
                    failure_reason: FieldOp::Set(reason),
                    ..Default::default()
                };
                self.store.update_one(record.id, &update).await?;

                // the notifier sees the failure reason
                let mut record = record;
                update.apply(&mut record);
                self.notify(&record, report).await?;
                Ok(false)
            }
            Outcome::Error { cause } => {
                let retry_count = record.retry_count.unwrap_or(0).saturating_add(1);
                let delay = self.retry.next_delay(retry_count);
                tracing::debug!(
                    collection = self.collection(),
                    record_id = %record.id,
                    retry_count,
                    delay_ms = delay.as_millis() as u64,
                    cause = %cause,
                    "record failed"
                );
                let update = RecordUpdate {
                    status: Some(RecordStatus::Failed),
                    processed_date: FieldOp::Set(now),
                    failure_reason: FieldOp::Set(cause),
                    retry_count: CounterOp::Increment,
                    available: FieldOp::Set(later(now, delay)),
                    ..Default::default()
                };
                self.write(record.id, &update, RecordStatus::Failed).await?;
                report.failed += 1;
                Ok(!self.config.continue_processing_on_error)
            }
        }
    }

    /// Calls the failure notifier and records the result.
    ///
    /// A notifier error becomes `notifyFailure` and never stops the batch.
    async fn notify(&self, record: &Record<T>, report: &mut BatchReport) -> Result<(), StoreError> {
        let result = self.notifier.notify(record).await;
        let now = self.clock.now();

        let (status, update) = match result {
            Ok(()) => {
                report.notified += 1;
                let update = RecordUpdate {
                    status: Some(RecordStatus::Notified),
                    processed_date: FieldOp::Set(now),
                    ..Default::default()
                };
                (RecordStatus::Notified, update)
            }
            Err(err) => {
                let reason = error_chain(err.as_ref());
                tracing::warn!(
                    collection = self.collection(),
                    record_id = %record.id,
                    error = %reason,
                    "failure notification failed"
                );
                report.notify_failed += 1;
                let update = RecordUpdate {
                    status: Some(RecordStatus::NotifyFailure),
                    processed_date: FieldOp::Set(now),
                    notify_failure_reason: FieldOp::Set(reason),
                    ..Default::default()
                };
                (RecordStatus::NotifyFailure, update)
            }
        };
        self.write(record.id, &update, status).await
    }

    async fn write(
        &self,
        id: RecordId,
        update: &RecordUpdate,
        status: RecordStatus,
    ) -> Result<(), StoreError> {
        let matched = self.store.update_one(id, update).await?;
        if matched {
            tracing::debug!(collection = self.collection(), record_id = %id, %status, "record updated");
        } else {
            // deleted or reset elsewhere mid-batch
            tracing::debug!(collection = self.collection(), record_id = %id, %status, "record vanished before update");
        }
        Ok(())
    }

    /// Deletes `processed` records whose `processed_date` is at least
    /// `max_record_age` old. Without `max_record_age` nothing is deleted.
    ///
    /// Returns `SpoolError::Busy` if another cleanup is still in flight.
    pub async fn cleanup(&self) -> Result<u64, SpoolError> {
        let _permit = self.cleanup_flight.try_enter()?;

        let Some(max_age) = self.config.max_record_age else {
            tracing::debug!(collection = self.collection(), "no max_record_age, cleanup skipped");
            return Ok(0);
        };
        let cutoff = earlier(self.clock.now(), max_age);
        let filter = Filter::And(vec![
            Filter::status(RecordStatus::Processed),
            Filter::ProcessedAtOrBefore(cutoff),
        ]);
        let deleted = self.store.delete_many(&filter).await?;
        if deleted > 0 {
            tracing::info!(collection = self.collection(), deleted, "cleanup removed processed records");
        }
        Ok(deleted)
    }

    /// Puts the given records back to `received` as if freshly enqueued.
    ///
    /// Keys that do not name an existing record are ignored. Returns the
    /// number of records that matched.
    pub async fn reset_records<I, K>(&self, ids: I) -> Result<u64, SpoolError>
    where
        I: IntoIterator<Item = K>,
        K: Into<RecordKey>,
    {
        let ids: Vec<RecordId> = ids
            .into_iter()
            .filter_map(|key| key.into().resolve())
            .collect();
        if ids.is_empty() {
            return Ok(0);
        }

        let now = self.clock.now();
        let update = RecordUpdate {
            status: Some(RecordStatus::Received),
            received_date: Some(now),
            available: FieldOp::Set(now),
            reset_date: FieldOp::Set(now),
            processed_date: FieldOp::Unset,
            failure_reason: FieldOp::Unset,
            notify_failure_reason: FieldOp::Unset,
            retry_count: CounterOp::Unset,
            immediate_failure: FieldOp::Unset,
            ..Default::default()
        };
        let matched = self.store.update_many(&Filter::IdIn(ids), &update).await?;
        tracing::info!(collection = self.collection(), matched, "records reset");
        Ok(matched)
    }

    pub async fn get(&self, id: RecordId) -> Result<Option<Record<T>>, SpoolError> {
        Ok(self.store.get(id).await?)
    }

    pub async fn counts(&self) -> Result<QueueCounts, SpoolError> {
        let mut counts = QueueCounts::default();
        for status in RecordStatus::ALL {
            counts.set(status, self.store.count(&Filter::status(status)).await?);
        }
        Ok(counts)
    }
}

fn later(now: DateTime<Utc>, delay: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(delay)
        .ok()
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn earlier(now: DateTime<Utc>, age: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(age)
        .ok()
        .and_then(|d| now.checked_sub_signed(d))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
