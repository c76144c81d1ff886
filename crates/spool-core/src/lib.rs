//! spool-core
//!
//! A durable retrying work queue on top of a document store.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（RecordId, ProcessError, Outcome）
//! - **ports**: 抽象化レイヤー（RecordStore, RecordProcessor, FailureNotifier, Clock, IdGenerator）
//! - **impls**: 実装（InMemoryRecordStore, JsonFileRecordStore）
//! - **queue**: キューエンジン（RetryQueue, QueueConfig, RetryPolicy, batch selection）
//! - **app**: ワイヤリングと定期実行（SpoolBuilder, Scheduler）
//! - **observability**: status views（QueueCounts, BatchReport）
//! - **error**: エラー型

pub mod app;
pub mod domain;
pub mod error;
pub mod impls;
pub mod observability;
pub mod ports;
pub mod queue;

pub use app::{BuildError, Scheduler, SchedulerConfig, SchedulerHandle, Spool, SpoolBuilder};
pub use domain::{ProcessError, RecordId, RecordKey, fail, skip};
pub use error::{BoxError, ConfigError, SpoolError, StoreError};
pub use impls::{InMemoryRecordStore, JsonFileRecordStore};
pub use observability::{BatchReport, QueueCounts};
pub use ports::{FailureNotifier, RecordProcessor, RecordStore, fn_notifier, fn_processor};
pub use queue::{QueueConfig, Record, RecordStatus, RetryQueue};
