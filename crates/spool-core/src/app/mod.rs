//! App - アプリケーション層
//!
//! このモジュールは、queue と ports を組み合わせて実行可能なキューを組み立てます。
//!
//! # 主要コンポーネント
//! - **SpoolBuilder**: config, store, callbacks and schedule のワイヤリング
//! - **Scheduler**: process_next_batch / cleanup の定期実行

pub mod builder;
pub mod scheduler;

// 主要な型を再エクスポート
pub use self::builder::{BuildError, Spool, SpoolBuilder};
pub use self::scheduler::{Scheduler, SchedulerConfig, SchedulerHandle};
