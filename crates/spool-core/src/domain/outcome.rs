//! Processing signals and outcome classification.
//!
//! A processor reports its result as `Result<(), ProcessError>`. Besides
//! ordinary retryable errors, two flow-control signals exist:
//!
//! - [`skip`]: defer the record without counting a retry.
//! - [`fail`]: give up on the record immediately and notify.
//!
//! Signals are enum variants, so recognition is a pattern match and never
//! depends on error message text.

use std::fmt;
use std::time::Duration;

/// The error side of a processor result.
///
/// Any `std::error::Error` converts into [`ProcessError::Retryable`], so
/// processors can use `?` on their own fallible calls.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessError {
    /// Defer the record for `delay`; retry accounting is untouched.
    Skip { delay: Duration },

    /// Permanent failure; bypasses retries and goes straight to notification.
    Fail { reason: String },

    /// Transient failure; counted against the retry limit.
    Retryable { cause: String },
}

/// Builds a skip signal.
pub fn skip(delay: Duration) -> ProcessError {
    ProcessError::Skip { delay }
}

/// Builds a fail signal carrying `reason`.
pub fn fail(reason: impl fmt::Display) -> ProcessError {
    ProcessError::Fail {
        reason: reason.to_string(),
    }
}

impl ProcessError {
    pub fn retryable(cause: impl fmt::Display) -> Self {
        ProcessError::Retryable {
            cause: cause.to_string(),
        }
    }

    pub fn from_skip_ms(delay_ms: u64) -> Self {
        skip(Duration::from_millis(delay_ms))
    }
}

impl Default for ProcessError {
    /// A skip with no delay.
    fn default() -> Self {
        skip(Duration::ZERO)
    }
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessError::Skip { delay } => write!(f, "skip for {}ms", delay.as_millis()),
            ProcessError::Fail { reason } => write!(f, "fail: {reason}"),
            ProcessError::Retryable { cause } => f.write_str(cause),
        }
    }
}

impl<E: std::error::Error> From<E> for ProcessError {
    fn from(err: E) -> Self {
        ProcessError::Retryable {
            cause: error_chain(&err),
        }
    }
}

/// Renders an error with its `source()` chain, `outer: inner: root`.
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

/// Classification of one processor invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success,
    Skip { delay: Duration },
    Fail { reason: String },
    Error { cause: String },
}

impl From<Result<(), ProcessError>> for Outcome {
    fn from(result: Result<(), ProcessError>) -> Self {
        match result {
            Ok(()) => Outcome::Success,
            Err(ProcessError::Skip { delay }) => Outcome::Skip { delay },
            Err(ProcessError::Fail { reason }) => Outcome::Fail { reason },
            Err(ProcessError::Retryable { cause }) => Outcome::Error { cause },
        }
    }
}
