//! Scheduler - 定期実行
//!
//! Drives `process_next_batch` (and optionally `cleanup`) on fixed intervals.
//!
//! # 設計
//! - One tokio task per job, so ticks of the same job never overlap.
//! - `MissedTickBehavior::Skip`: a long tick swallows the ticks it missed
//!   instead of firing them back to back.
//! - Tick errors are logged and the loop keeps going.
//! - Shutdown lets an in-flight tick finish.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::error::SpoolError;
use crate::queue::RetryQueue;

#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    pub process_every: Duration,
    /// When absent, cleanup only runs on demand.
    pub cleanup_every: Option<Duration>,
    /// A tick running longer than this logs a warning.
    pub slow_tick_warning: Option<Duration>,
}

impl SchedulerConfig {
    pub fn new(process_every: Duration) -> Self {
        Self {
            process_every,
            cleanup_every: None,
            slow_tick_warning: None,
        }
    }
}

/// Running periodic jobs. Dropping the handle without calling
/// [`shutdown`](Self::shutdown) stops them at their next tick.
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Stops every job and waits for in-flight ticks to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "scheduler task ended abnormally");
            }
        }
        tracing::info!("scheduler stopped");
    }
}

pub struct Scheduler;

impl Scheduler {
    /// Spawns the periodic jobs for `queue` on the current tokio runtime.
    pub fn start<T>(queue: Arc<RetryQueue<T>>, config: &SchedulerConfig) -> SchedulerHandle
    where
        T: Send + Sync + 'static,
    {
        let (shutdown, rx) = watch::channel(false);
        let mut tasks = Vec::with_capacity(2);

        let batch_queue = queue.clone();
        tasks.push(tokio::spawn(run_periodic(
            "process_next_batch",
            config.process_every,
            config.slow_tick_warning,
            rx.clone(),
            move || {
                let queue = batch_queue.clone();
                async move { queue.process_next_batch().await.map(|_| ()) }
            },
        )));

        if let Some(every) = config.cleanup_every {
            tasks.push(tokio::spawn(run_periodic(
                "cleanup",
                every,
                config.slow_tick_warning,
                rx,
                move || {
                    let queue = queue.clone();
                    async move { queue.cleanup().await.map(|_| ()) }
                },
            )));
        }

        SchedulerHandle { shutdown, tasks }
    }
}

pub(crate) async fn run_periodic<F, Fut>(
    job: &'static str,
    every: Duration,
    slow_tick_warning: Option<Duration>,
    mut shutdown: watch::Receiver<bool>,
    mut tick: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), SpoolError>>,
{
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tracing::info!(job, every_ms = every.as_millis() as u64, "periodic job started");

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                tracing::debug!(job, "periodic job received shutdown signal");
                break;
            }
            _ = interval.tick() => {
                let started = Instant::now();
                match tick().await {
                    Ok(()) => {}
                    Err(SpoolError::Busy { operation }) => {
                        tracing::warn!(job, operation, "previous run still in flight, tick skipped");
                    }
                    Err(e) => {
                        tracing::error!(job, error = %e, "tick failed");
                    }
                }

                let elapsed = started.elapsed();
                if slow_tick_warning.is_some_and(|limit| elapsed > limit) {
                    tracing::warn!(
                        job,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "tick ran longer than expected"
                    );
                }
            }
        }
    }
}
