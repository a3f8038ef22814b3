//! Unified error handling for the cinescout crate
//!
//! Domain-specific errors ([`FetchError`], [`StoreError`]) cover the two
//! failure-prone edges (network fetches, persistence); the unified [`Error`]
//! wraps them for use across module boundaries. Source clients deliberately
//! never surface these to callers - an API failure is a fallback trigger,
//! not an error (see `clients`).

use std::io;
use thiserror::Error;

/// Errors that can occur while fetching a page or API endpoint
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP transport error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response status
    #[error("server returned status {0}")]
    Status(u16),

    /// Request timed out
    #[error("request timed out")]
    Timeout,

    /// URL was not absolute (or could not be joined)
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Errors that can occur during persistence operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// JSON payload (de)serialization error
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Crawl target id does not exist
    #[error("scrape target {0} not found")]
    TargetNotFound(i64),

    /// Record is not eligible for persistence
    #[error("record has an empty title")]
    EmptyTitle,

    /// Connection mutex was poisoned by a panicking thread
    #[error("store connection lock poisoned")]
    Poisoned,
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Network-related errors (HTTP, timeout)
    Network,
    /// HTML/JSON extraction errors
    Extraction,
    /// Storage and I/O errors
    Storage,
    /// Configuration and validation errors
    Config,
    /// Other/unknown errors
    Other,
}

/// Unified error type for the cinescout crate
#[derive(Error, Debug)]
pub enum Error {
    /// Fetch-specific errors
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Persistence errors
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Provider returned a payload we could not interpret
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Configuration errors
    #[error("config error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON errors outside the store
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Check if this error is worth retrying
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Fetch(FetchError::Timeout) => true,
            Self::Fetch(FetchError::Status(code)) => {
                matches!(*code, 429 | 500 | 502 | 503 | 504)
            }
            Self::Fetch(_) => true,
            Self::Io(_) => true,
            Self::Store(_) | Self::MalformedResponse(_) | Self::Config(_) | Self::Json(_) => false,
        }
    }

    /// Get the error category for handling strategies
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Fetch(_) => ErrorCategory::Network,
            Self::Store(StoreError::TargetNotFound(_)) => ErrorCategory::Config,
            Self::Store(_) | Self::Io(_) => ErrorCategory::Storage,
            Self::MalformedResponse(_) | Self::Json(_) => ErrorCategory::Extraction,
            Self::Config(_) => ErrorCategory::Config,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category() {
        let err = Error::Fetch(FetchError::Timeout);
        assert_eq!(err.category(), ErrorCategory::Network);

        let err = Error::Store(StoreError::EmptyTitle);
        assert_eq!(err.category(), ErrorCategory::Storage);

        let err = Error::Store(StoreError::TargetNotFound(7));
        assert_eq!(err.category(), ErrorCategory::Config);
    }

    #[test]
    fn test_is_recoverable() {
        assert!(Error::Fetch(FetchError::Timeout).is_recoverable());
        assert!(Error::Fetch(FetchError::Status(503)).is_recoverable());
        assert!(!Error::Fetch(FetchError::Status(404)).is_recoverable());
        assert!(!Error::config("bad delay range").is_recoverable());
    }

    #[test]
    fn test_error_conversion() {
        let store_err = StoreError::TargetNotFound(42);
        let unified: Error = store_err.into();
        assert!(matches!(unified, Error::Store(_)));
        assert_eq!(unified.to_string(), "store error: scrape target 42 not found");
    }
}
