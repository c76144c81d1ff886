//! Queue configuration.

use std::time::Duration;

use super::RetryPolicy;
use crate::error::ConfigError;

/// Every queue option with its default.
///
/// | option | default |
/// |---|---|
/// | `batch_size` | 20 |
/// | `max_record_age` | none: cleanup deletes nothing |
/// | `retry_limit` | none: retry forever |
/// | `backoff` | 0 |
/// | `backoff_coefficient` | 1.5 |
/// | `continue_processing_on_error` | false: strict ordered mode |
#[derive(Debug, Clone, PartialEq)]
pub struct QueueConfig {
    pub collection_name: String,
    pub batch_size: usize,
    pub max_record_age: Option<Duration>,
    pub retry_limit: Option<u32>,
    pub backoff: Duration,
    pub backoff_coefficient: f64,
    pub continue_processing_on_error: bool,
}

impl QueueConfig {
    pub const DEFAULT_BATCH_SIZE: usize = 20;

    pub fn new(collection_name: impl Into<String>) -> Self {
        Self {
            collection_name: collection_name.into(),
            batch_size: Self::DEFAULT_BATCH_SIZE,
            max_record_age: None,
            retry_limit: None,
            backoff: Duration::ZERO,
            backoff_coefficient: RetryPolicy::DEFAULT_COEFFICIENT,
            continue_processing_on_error: false,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_max_record_age(mut self, max_record_age: Duration) -> Self {
        self.max_record_age = Some(max_record_age);
        self
    }

    pub fn with_retry_limit(mut self, retry_limit: u32) -> Self {
        self.retry_limit = Some(retry_limit);
        self
    }

    /// Signed variant: a negative limit means retry forever.
    pub fn with_signed_retry_limit(mut self, retry_limit: i64) -> Self {
        self.retry_limit = if retry_limit < 0 {
            None
        } else {
            Some(u32::try_from(retry_limit).unwrap_or(u32::MAX))
        };
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_backoff_coefficient(mut self, coefficient: f64) -> Self {
        self.backoff_coefficient = coefficient;
        self
    }

    pub fn with_continue_processing_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_processing_on_error = continue_on_error;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.collection_name.trim().is_empty() {
            return Err(ConfigError::EmptyCollectionName);
        }
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if !self.backoff_coefficient.is_finite() || self.backoff_coefficient < 0.0 {
            return Err(ConfigError::InvalidBackoffCoefficient(
                self.backoff_coefficient,
            ));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            limit: self.retry_limit,
            backoff: self.backoff,
            coefficient: self.backoff_coefficient,
        }
    }
}
