//! Error types for the cache engine
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache engine and the load harness.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Key absent from the cache, or present but expired
    #[error("Key not found: {0}")]
    NotFound(String),

    /// The backing store can no longer service mutations
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// A harness assertion did not hold
    #[error("Validation failed at {stage}: expected {expected}, got {actual}")]
    ValidationFailed {
        stage: String,
        expected: u64,
        actual: u64,
    },

    /// Malformed TTL, interval or node configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid key or request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Scenario aborted through its shutdown channel
    #[error("cancelled")]
    Cancelled,
}

impl CacheError {
    /// Shorthand for a `ValidationFailed` error.
    pub fn validation(stage: impl Into<String>, expected: u64, actual: u64) -> Self {
        CacheError::ValidationFailed {
            stage: stage.into(),
            expected,
            actual,
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache engine.
pub type Result<T> = std::result::Result<T, CacheError>;
