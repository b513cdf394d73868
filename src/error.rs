//! Error types for the cache
//!
//! Provides unified error handling using thiserror. Lookups that miss are not
//! errors; they come back as `None` or `false`.

use std::time::Duration;

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache and its entry builder.
#[derive(Error, Debug)]
pub enum CacheError {
    /// TTL must be strictly positive
    #[error("Invalid TTL: {0:?} (must be greater than zero)")]
    InvalidTtl(Duration),

    /// Configuration value rejected at load time
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Payload has no value at the requested field path
    #[error("Missing field: {0}")]
    MissingField(String),

    /// Payload value at the field path has the wrong type
    #[error("Field '{field}' is not a valid {expected}")]
    FieldType {
        field: String,
        expected: &'static str,
    },

    /// Payload bytes could not be decoded
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
