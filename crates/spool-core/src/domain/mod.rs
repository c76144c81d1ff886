//! Domain model: record identifiers and processing outcomes.

pub mod ids;
pub mod outcome;

pub use ids::{RecordId, RecordKey};
pub use outcome::{Outcome, ProcessError, error_chain, fail, skip};
