//! SpoolBuilder - キューの構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）: config, callbacks and schedule are all
//!   checked in `build()`, never on the first tick

use std::sync::Arc;
use std::time::Duration;

use super::scheduler::{Scheduler, SchedulerConfig, SchedulerHandle};
use crate::domain::{RecordId, RecordKey};
use crate::error::{ConfigError, SpoolError};
use crate::impls::InMemoryRecordStore;
use crate::observability::{BatchReport, QueueCounts};
use crate::ports::{Clock, FailureNotifier, RecordProcessor, RecordStore};
use crate::queue::{QueueConfig, Record, RetryQueue};

/// SpoolBuilder は config + store + callbacks + schedule から Spool を構築
///
/// # 使用例
/// ```ignore
/// let spool = SpoolBuilder::new(QueueConfig::new("uploads").with_retry_limit(5))
///     .store(Arc::new(store))
///     .processor(Arc::new(UploadProcessor))
///     .notifier(Arc::new(AlertNotifier))
///     .process_every(Duration::from_secs(1))
///     .build()?;
/// let handle = spool.start();
/// ```
pub struct SpoolBuilder<T: Sync> {
    config: QueueConfig,
    store: Option<Arc<dyn RecordStore<T>>>,
    processor: Option<Arc<dyn RecordProcessor<T>>>,
    notifier: Option<Arc<dyn FailureNotifier<T>>>,
    clock: Option<Arc<dyn Clock>>,
    process_every: Option<Duration>,
    cleanup_every: Option<Duration>,
    slow_tick_warning: Option<Duration>,
}

/// BuildError はアプリケーション構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("no record processor was configured")]
    MissingProcessor,

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl<T> SpoolBuilder<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(config: QueueConfig) -> Self {
        Self {
            config,
            store: None,
            processor: None,
            notifier: None,
            clock: None,
            process_every: None,
            cleanup_every: None,
            slow_tick_warning: None,
        }
    }

    /// Defaults to an [`InMemoryRecordStore`].
    pub fn store(mut self, store: Arc<dyn RecordStore<T>>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn processor(mut self, processor: Arc<dyn RecordProcessor<T>>) -> Self {
        self.processor = Some(processor);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn FailureNotifier<T>>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn process_every(mut self, every: Duration) -> Self {
        self.process_every = Some(every);
        self
    }

    pub fn cleanup_every(mut self, every: Duration) -> Self {
        self.cleanup_every = Some(every);
        self
    }

    pub fn slow_tick_warning(mut self, after: Duration) -> Self {
        self.slow_tick_warning = Some(after);
        self
    }

    /// # 検証
    /// - processor が登録されているか
    /// - QueueConfig::validate()
    /// - process interval が設定されているか (0 は不可)
    pub fn build(self) -> Result<Spool<T>, BuildError> {
        let processor = self.processor.ok_or(BuildError::MissingProcessor)?;
        let process_every = self
            .process_every
            .filter(|every| !every.is_zero())
            .ok_or(ConfigError::MissingProcessInterval)?;
        let cleanup_every = self.cleanup_every.filter(|every| !every.is_zero());

        let store = self
            .store
            .unwrap_or_else(|| -> Arc<dyn RecordStore<T>> { Arc::new(InMemoryRecordStore::<T>::new()) });
        let mut queue = RetryQueue::new(self.config, store, processor)?;
        if let Some(notifier) = self.notifier {
            queue = queue.with_notifier(notifier);
        }
        if let Some(clock) = self.clock {
            queue = queue.with_clock(clock);
        }

        Ok(Spool {
            queue: Arc::new(queue),
            schedule: SchedulerConfig {
                process_every,
                cleanup_every,
                slow_tick_warning: self.slow_tick_warning,
            },
        })
    }
}

/// Spool は構築済みのキューとそのスケジュール
pub struct Spool<T: Sync> {
    queue: Arc<RetryQueue<T>>,
    schedule: SchedulerConfig,
}

impl<T> Spool<T>
where
    T: Send + Sync + 'static,
{
    pub fn queue(&self) -> &Arc<RetryQueue<T>> {
        &self.queue
    }

    /// Starts the periodic jobs on the current tokio runtime.
    pub fn start(&self) -> SchedulerHandle {
        tracing::info!(
            collection = %self.queue.config().collection_name,
            process_every_ms = self.schedule.process_every.as_millis() as u64,
            cleanup = self.schedule.cleanup_every.is_some(),
            "starting spool"
        );
        Scheduler::start(self.queue.clone(), &self.schedule)
    }

    pub async fn enqueue(&self, data: T) -> Result<Record<T>, SpoolError> {
        self.queue.enqueue(data).await
    }

    pub async fn process_next_batch(&self) -> Result<BatchReport, SpoolError> {
        self.queue.process_next_batch().await
    }

    pub async fn cleanup(&self) -> Result<u64, SpoolError> {
        self.queue.cleanup().await
    }

    pub async fn reset_records<I, K>(&self, ids: I) -> Result<u64, SpoolError>
    where
        I: IntoIterator<Item = K>,
        K: Into<RecordKey>,
    {
        self.queue.reset_records(ids).await
    }

    pub async fn get(&self, id: RecordId) -> Result<Option<Record<T>>, SpoolError> {
        self.queue.get(id).await
    }

    pub async fn counts(&self) -> Result<QueueCounts, SpoolError> {
        self.queue.counts().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ProcessError, fail};
    use crate::error::BoxError;
    use crate::ports::{fn_notifier, fn_processor};
    use crate::queue::RecordStatus;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn processor() -> Arc<dyn RecordProcessor<String>> {
        Arc::new(fn_processor(|record: Record<String>| async move {
            if record.data.starts_with("bad") {
                return Err(fail(format!("rejected {}", record.data)));
            }
            Ok::<(), ProcessError>(())
        }))
    }

    #[test]
    fn test_build_success() {
        let spool = SpoolBuilder::<String>::new(QueueConfig::new("greetings"))
            .processor(processor())
            .process_every(Duration::from_millis(250))
            .cleanup_every(Duration::from_secs(60))
            .build();
        assert!(spool.is_ok());
    }

    #[test]
    fn test_build_missing_processor() {
        let spool = SpoolBuilder::<String>::new(QueueConfig::new("greetings"))
            .process_every(Duration::from_millis(250))
            .build();
        assert!(matches!(spool, Err(BuildError::MissingProcessor)));
    }

    #[test]
    fn test_build_missing_or_zero_interval() {
        let missing = SpoolBuilder::<String>::new(QueueConfig::new("greetings"))
            .processor(processor())
            .build();
        assert!(matches!(
            missing,
            Err(BuildError::Config(ConfigError::MissingProcessInterval))
        ));

        let zero = SpoolBuilder::<String>::new(QueueConfig::new("greetings"))
            .processor(processor())
            .process_every(Duration::ZERO)
            .build();
        assert!(matches!(
            zero,
            Err(BuildError::Config(ConfigError::MissingProcessInterval))
        ));
    }

    #[test]
    fn test_build_invalid_config() {
        let spool = SpoolBuilder::<String>::new(QueueConfig::new("greetings").with_batch_size(0))
            .processor(processor())
            .process_every(Duration::from_secs(1))
            .build();
        assert!(matches!(
            spool,
            Err(BuildError::Config(ConfigError::ZeroBatchSize))
        ));
    }

    #[tokio::test]
    async fn built_spool_processes_and_notifies() {
        let notified = Arc::new(AtomicUsize::new(0));
        let counter = notified.clone();
        let spool = SpoolBuilder::<String>::new(QueueConfig::new("greetings"))
            .processor(processor())
            .notifier(Arc::new(fn_notifier(move |_record: Record<String>| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<(), BoxError>(())
                }
            })))
            .process_every(Duration::from_secs(1))
            .build()
            .unwrap();

        let good = spool.enqueue("hello".to_string()).await.unwrap();
        let bad = spool.enqueue("bad payload".to_string()).await.unwrap();
        let report = spool.process_next_batch().await.unwrap();

        assert_eq!(report.processed, 1);
        assert_eq!(report.notified, 1);
        assert_eq!(notified.load(Ordering::SeqCst), 1);

        let good = spool.get(good.id).await.unwrap().unwrap();
        assert_eq!(good.status, RecordStatus::Processed);
        let bad = spool.get(bad.id).await.unwrap().unwrap();
        assert_eq!(bad.status, RecordStatus::Notified);
        assert_eq!(bad.failure_reason.as_deref(), Some("rejected bad payload"));

        assert_eq!(spool.reset_records([bad.id]).await.unwrap(), 1);
        assert_eq!(spool.counts().await.unwrap().received, 1);
    }
}
