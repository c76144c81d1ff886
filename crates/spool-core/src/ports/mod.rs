//! Ports - 抽象化レイヤー
//!
//! Each trait here is a seam to something outside the queue engine: the
//! document store, the caller's callbacks, time, and id generation.
//! Implementations live in [`crate::impls`] or in the host application.

pub mod clock;
pub mod handler;
pub mod id_generator;
pub mod record_store;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::handler::{
    FailureNotifier, FnNotifier, FnProcessor, NoopNotifier, RecordProcessor, fn_notifier,
    fn_processor,
};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::record_store::{CounterOp, FieldOp, Filter, RecordStore, RecordUpdate};
