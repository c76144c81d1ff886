//! Environment configuration for the demo binary.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use spool_core::{ConfigError, QueueConfig};

pub const DEFAULT_COLLECTION: &str = "spool";
pub const DEFAULT_PROCESS_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, PartialEq)]
pub struct CliConfig {
    pub queue: QueueConfig,
    pub process_every: Duration,
    pub cleanup_every: Option<Duration>,
    /// JSON file store; in-memory when absent.
    pub store_path: Option<PathBuf>,
}

impl CliConfig {
    /// Loads `.env` (if any) and reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads every `SPOOL_*` option through `lookup`. Unset and blank values
    /// fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let collection = get("SPOOL_COLLECTION").unwrap_or_else(|| DEFAULT_COLLECTION.to_string());
        let mut queue = QueueConfig::new(collection);

        if let Some(batch_size) = parse::<usize>(&get, "SPOOL_BATCH_SIZE")? {
            queue = queue.with_batch_size(batch_size);
        }
        if let Some(ms) = parse::<u64>(&get, "SPOOL_MAX_RECORD_AGE_MS")? {
            queue = queue.with_max_record_age(Duration::from_millis(ms));
        }
        if let Some(limit) = parse::<i64>(&get, "SPOOL_RETRY_LIMIT")? {
            queue = queue.with_signed_retry_limit(limit);
        }
        if let Some(ms) = parse::<u64>(&get, "SPOOL_BACKOFF_MS")? {
            queue = queue.with_backoff(Duration::from_millis(ms));
        }
        if let Some(coefficient) = parse::<f64>(&get, "SPOOL_BACKOFF_COEFFICIENT")? {
            queue = queue.with_backoff_coefficient(coefficient);
        }
        if let Some(flag) = parse_bool(&get, "SPOOL_CONTINUE_ON_ERROR")? {
            queue = queue.with_continue_processing_on_error(flag);
        }
        queue.validate()?;

        let process_every = parse::<u64>(&get, "SPOOL_PROCESS_INTERVAL_MS")?
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_PROCESS_INTERVAL);
        let cleanup_every = parse::<u64>(&get, "SPOOL_CLEANUP_INTERVAL_MS")?.map(Duration::from_millis);

        Ok(Self {
            queue,
            process_every,
            cleanup_every,
            store_path: get("SPOOL_STORE_PATH").map(PathBuf::from),
        })
    }
}

fn parse<V: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<V>, ConfigError> {
    get(key)
        .map(|value| {
            value.trim().parse::<V>().map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value,
            })
        })
        .transpose()
}

fn parse_bool(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<bool>, ConfigError> {
    get(key)
        .map(|value| match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                value,
            }),
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<CliConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        CliConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.queue, QueueConfig::new(DEFAULT_COLLECTION));
        assert_eq!(config.process_every, DEFAULT_PROCESS_INTERVAL);
        assert!(config.cleanup_every.is_none());
        assert!(config.store_path.is_none());
    }

    #[test]
    fn every_option_is_read() {
        let config = config(&[
            ("SPOOL_COLLECTION", "uploads"),
            ("SPOOL_BATCH_SIZE", "5"),
            ("SPOOL_MAX_RECORD_AGE_MS", "60000"),
            ("SPOOL_RETRY_LIMIT", "3"),
            ("SPOOL_BACKOFF_MS", "50"),
            ("SPOOL_BACKOFF_COEFFICIENT", "2"),
            ("SPOOL_CONTINUE_ON_ERROR", "true"),
            ("SPOOL_PROCESS_INTERVAL_MS", "1000"),
            ("SPOOL_CLEANUP_INTERVAL_MS", "30000"),
            ("SPOOL_STORE_PATH", "/tmp/uploads.json"),
        ])
        .unwrap();

        let expected = QueueConfig::new("uploads")
            .with_batch_size(5)
            .with_max_record_age(Duration::from_secs(60))
            .with_retry_limit(3)
            .with_backoff(Duration::from_millis(50))
            .with_backoff_coefficient(2.0)
            .with_continue_processing_on_error(true);
        assert_eq!(config.queue, expected);
        assert_eq!(config.process_every, Duration::from_secs(1));
        assert_eq!(config.cleanup_every, Some(Duration::from_secs(30)));
        assert_eq!(config.store_path, Some(PathBuf::from("/tmp/uploads.json")));
    }

    #[test]
    fn negative_retry_limit_retries_forever() {
        let config = config(&[("SPOOL_RETRY_LIMIT", "-1")]).unwrap();
        assert_eq!(config.queue.retry_limit, None);
    }

    #[test]
    fn bad_values_name_the_variable() {
        assert_eq!(
            config(&[("SPOOL_BATCH_SIZE", "lots")]),
            Err(ConfigError::InvalidValue {
                key: "SPOOL_BATCH_SIZE".to_string(),
                value: "lots".to_string(),
            })
        );
        assert!(matches!(
            config(&[("SPOOL_CONTINUE_ON_ERROR", "maybe")]),
            Err(ConfigError::InvalidValue { key, .. }) if key == "SPOOL_CONTINUE_ON_ERROR"
        ));
        assert_eq!(
            config(&[("SPOOL_BATCH_SIZE", "0")]),
            Err(ConfigError::ZeroBatchSize)
        );
    }
}
