mod config;

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;

use spool_core::{
    BoxError, FailureNotifier, InMemoryRecordStore, JsonFileRecordStore, ProcessError, Record,
    RecordProcessor, RecordStore, SpoolBuilder, fail,
};

use crate::config::CliConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Greeting {
    name: String,
}

/// Fails the first `n` calls, then greets. An empty name is rejected outright.
struct HelloProcessor {
    remaining_failures: AtomicU32,
}

impl HelloProcessor {
    fn new(n: u32) -> Self {
        Self {
            remaining_failures: AtomicU32::new(n),
        }
    }
}

#[async_trait]
impl RecordProcessor<Greeting> for HelloProcessor {
    async fn process(&self, record: &Record<Greeting>) -> Result<(), ProcessError> {
        if record.data.name.is_empty() {
            return Err(fail("greeting without a name"));
        }

        if let Ok(left) = self
            .remaining_failures
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
        {
            return Err(ProcessError::retryable(format!(
                "intentional failure (left={left})"
            )));
        }

        println!("Hello, {}!", record.data.name);
        Ok(())
    }
}

struct LogNotifier;

#[async_trait]
impl FailureNotifier<Greeting> for LogNotifier {
    async fn notify(&self, record: &Record<Greeting>) -> Result<(), BoxError> {
        tracing::warn!(
            record_id = %record.id,
            reason = record.failure_reason.as_deref().unwrap_or("retries exhausted"),
            "giving up on greeting"
        );
        Ok(())
    }
}

async fn open_store(config: &CliConfig) -> anyhow::Result<Arc<dyn RecordStore<Greeting>>> {
    match &config.store_path {
        Some(path) => {
            let store = JsonFileRecordStore::open(path)
                .await
                .with_context(|| format!("failed to open record file {}", path.display()))?;
            Ok(Arc::new(store))
        }
        None => Ok(Arc::new(InMemoryRecordStore::new())),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // (A) 設定と store を用意
    let config = CliConfig::from_env().context("invalid SPOOL_* configuration")?;
    let store = open_store(&config).await?;

    let mut builder = SpoolBuilder::new(config.queue.clone())
        .store(store)
        .processor(Arc::new(HelloProcessor::new(2)))
        .notifier(Arc::new(LogNotifier))
        .process_every(config.process_every);
    if let Some(every) = config.cleanup_every {
        builder = builder.cleanup_every(every);
    }
    let spool = builder.build().context("failed to build spool")?;

    // (B) デモ用の payload を投入
    for name in ["spool", "world", ""] {
        let record = spool
            .enqueue(Greeting {
                name: name.to_string(),
            })
            .await?;
        println!("enqueued record: {}", record.id);
    }

    // (C) scheduler を起動し、キューが空になるか ctrl-c まで待つ
    let handle = spool.start();
    loop {
        let counts = spool.counts().await?;
        if counts.pending() == 0 {
            break;
        }
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("ctrl-c received");
                break;
            }
            _ = sleep(config.process_every) => {}
        }
    }

    // (D) graceful shutdown
    handle.shutdown().await;
    let counts = spool.counts().await?;
    println!("counts: {}", serde_json::to_string(&counts)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use spool_core::{QueueConfig, RetryQueue};

    async fn greeting(name: &str) -> Record<Greeting> {
        let queue = RetryQueue::<Greeting>::new(
            QueueConfig::new("greetings"),
            Arc::new(InMemoryRecordStore::<Greeting>::new()),
            Arc::new(HelloProcessor::new(0)),
        )
        .unwrap();
        queue
            .enqueue(Greeting {
                name: name.to_string(),
            })
            .await
            .unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_calls_fail_exactly_n_times() {
        let processor = Arc::new(HelloProcessor::new(3));
        let record = Arc::new(greeting("spool").await);

        let calls: Vec<_> = (0..16)
            .map(|_| {
                let processor = processor.clone();
                let record = record.clone();
                tokio::spawn(async move { processor.process(&record).await.is_err() })
            })
            .collect();
        let mut failures = 0;
        for call in calls {
            if call.await.unwrap() {
                failures += 1;
            }
        }

        assert_eq!(failures, 3);
        assert_eq!(processor.remaining_failures.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn empty_name_is_rejected_without_using_a_failure() {
        let processor = HelloProcessor::new(1);
        let result = processor.process(&greeting("").await).await;
        assert!(matches!(result, Err(ProcessError::Fail { .. })));
        assert_eq!(processor.remaining_failures.load(Ordering::Relaxed), 1);
    }
}
