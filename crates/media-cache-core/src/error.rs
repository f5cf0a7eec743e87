//! Error types for cache operations

use thiserror::Error;

/// Main error type for all cache operations
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    /// URL could not be parsed or resolved against the scope
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// Transport-level failure (DNS, connect, reset, body read)
    #[error("network error: {0}")]
    Network(String),

    /// Upstream answered with a status we do not accept
    #[error("HTTP {status}: {url}")]
    Status { status: u16, url: String },

    /// Storage quota would be exceeded by a write
    #[error("quota exceeded in {bucket}: need {requested} bytes, {available} available")]
    QuotaExceeded {
        bucket: String,
        requested: u64,
        available: u64,
    },

    /// No registered task with this id
    #[error("unknown task: {0}")]
    UnknownTask(String),

    /// A task with this id is already registered
    #[error("task already running: {0}")]
    DuplicateTask(String),

    /// Inbound message could not be decoded
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),

    /// Timeout
    #[error("operation timed out")]
    Timeout,
}

impl CacheError {
    /// Whether this error came from the storage quota
    pub fn is_quota(&self) -> bool {
        matches!(self, CacheError::QuotaExceeded { .. })
    }
}

impl From<url::ParseError> for CacheError {
    fn from(err: url::ParseError) -> Self {
        CacheError::InvalidUrl(err.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::MalformedMessage(err.to_string())
    }
}

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;
