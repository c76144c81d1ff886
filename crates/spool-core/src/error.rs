use thiserror::Error;

/// Errors raised by a [`RecordStore`](crate::ports::RecordStore) implementation.
///
/// The engine never interprets these; they propagate unchanged to the caller of
/// `enqueue`, `process_next_batch`, `cleanup` and `reset_records`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store io: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Invalid queue or scheduler configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("collection_name must not be empty")]
    EmptyCollectionName,

    #[error("batch_size must be at least 1")]
    ZeroBatchSize,

    #[error("backoff_coefficient must be finite and >= 0, got {0}")]
    InvalidBackoffCoefficient(f64),

    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },

    #[error("a process interval is required to schedule batch processing")]
    MissingProcessInterval,
}

#[derive(Debug, Error)]
pub enum SpoolError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A previous invocation of the same operation is still running.
    #[error("{operation} is already running for this queue")]
    Busy { operation: &'static str },
}

/// Error type returned by failure notifiers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
