//! Huginn error types

use std::time::Duration;

/// Huginn error types
#[derive(Debug, thiserror::Error)]
pub enum HuginnError {
    // Lookup errors
    #[error("not found: {0}")]
    NotFound(String),

    #[error("operation timed out")]
    Timeout,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    // Content source errors
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("upstream API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Configuration and persistence
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl HuginnError {
    /// Whether retrying the same upstream call may succeed.
    ///
    /// Lookup misses, timeouts and argument errors are permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            HuginnError::UpstreamUnavailable(_) | HuginnError::RateLimited { .. } => true,
            HuginnError::Api { status, .. } => {
                *status >= 500 || *status == 408 || *status == 429
            }
            _ => false,
        }
    }

    /// Server-provided retry hint, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            HuginnError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for HuginnError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) if status.as_u16() == 429 => {
                HuginnError::RateLimited { retry_after: None }
            }
            Some(status) => HuginnError::Api {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => HuginnError::UpstreamUnavailable(err.to_string()),
        }
    }
}

/// Result type alias for Huginn operations
pub type Result<T> = std::result::Result<T, HuginnError>;
