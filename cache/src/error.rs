//! Cache errors.

use thiserror::Error;

/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Cache failures.
///
/// [`crate::CacheService`] logs and swallows these; they only surface from
/// the raw [`crate::CacheBackend`] API.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Backend unreachable or command failed.
    #[error("Cache backend error: {0}")]
    Backend(String),

    /// Value could not be encoded or decoded.
    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<redis::RedisError> for CacheError {
    fn from(error: redis::RedisError) -> Self {
        Self::Backend(error.to_string())
    }
}
