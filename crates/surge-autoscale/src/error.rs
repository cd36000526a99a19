//! Configuration error types.

use thiserror::Error;

/// Result type alias for configuration parsing and validation.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised by an unusable autoscaler configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("target concurrency must be a positive number, got {0}")]
    TargetConcurrency(f64),

    #[error("max scale-up rate must be greater than 1.0, got {0}")]
    MaxScaleUpRate(f64),

    #[error("stable window must be non-zero")]
    EmptyStableWindow,

    #[error("panic window must be non-zero")]
    EmptyPanicWindow,

    #[error("panic window ({panic:?}) must be shorter than stable window ({stable:?})")]
    InvertedWindows {
        panic: std::time::Duration,
        stable: std::time::Duration,
    },

    #[error("invalid duration: {0:?}")]
    Duration(String),
}
