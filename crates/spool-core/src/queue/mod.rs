//! Queue module: records, statuses, retry policy and the processing engine.

pub mod batch;
mod config;
mod engine;
mod flight;
mod record;
mod retry;
mod state;


pub use config::QueueConfig;
pub use engine::RetryQueue;
pub use flight::{FlightGuard, FlightPermit};
pub use record::{NewRecord, Record};
pub use retry::RetryPolicy;
pub use state::RecordStatus;
