//! Retry policy: decides backoff delays and retry exhaustion.

use std::time::Duration;

/// Retry policy for failed records.
///
/// `limit = None` retries forever.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub limit: Option<u32>,

    /// Base delay, scaled by `retry_count ^ coefficient`.
    pub backoff: Duration,

    pub coefficient: f64,
}

impl RetryPolicy {
    pub const DEFAULT_COEFFICIENT: f64 = 1.5;

    /// Has a record with this many recorded failures used up its retries?
    ///
    /// A record that never failed is never exhausted, even with a limit of 0.
    pub fn is_exhausted(&self, retry_count: Option<u32>) -> bool {
        match (self.limit, retry_count) {
            (Some(limit), Some(count)) => count >= limit,
            _ => false,
        }
    }

    /// Delay before a record that now has `retry_count` failures is due again.
    ///
    /// delay = retry_count ^ coefficient * backoff
    ///
    /// Example with backoff=50ms, coefficient=1.5:
    /// - failure 1: 50ms
    /// - failure 2: ~141ms
    /// - failure 3: ~260ms
    ///
    /// Once `retry_count` has used up the retries the delay is zero, so the
    /// record comes straight back and goes to notification.
    pub fn next_delay(&self, retry_count: u32) -> Duration {
        if self.is_exhausted(Some(retry_count)) {
            return Duration::ZERO;
        }
        let factor = f64::from(retry_count).powf(self.coefficient);
        Duration::try_from_secs_f64(factor * self.backoff.as_secs_f64()).unwrap_or(Duration::MAX)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            limit: None,
            backoff: Duration::ZERO,
            coefficient: Self::DEFAULT_COEFFICIENT,
        }
    }
}
