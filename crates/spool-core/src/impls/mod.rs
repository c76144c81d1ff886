//! Impls - RecordStore の実装
//!
//! # 含まれる実装
//! - **InMemoryRecordStore**: 開発用・テスト用
//! - **JsonFileRecordStore**: single-process durable store backed by one JSON file
//!
//! Production document databases implement [`RecordStore`](crate::ports::RecordStore)
//! in the host application.

pub mod file_store;
pub mod memory_store;

pub use self::file_store::JsonFileRecordStore;
pub use self::memory_store::InMemoryRecordStore;
