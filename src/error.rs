//! Error types for cache operations
//!
//! Every failure the cache can surface maps to one of a handful of kinds:
//! caller mistakes (bad keys), integrity violations in the fetched table,
//! collaborator failures and construction-time misconfiguration.

use thiserror::Error;

/// Main error type for cache operations
#[derive(Error, Debug)]
pub enum CacheError {
    /// Wrong number of key components, or a strict key component that was not found
    #[error("Bad cache key: {0}")]
    BadCacheKey(String),

    /// A leaf of the index would hold zero or several records
    #[error("Bad cache values: {0}")]
    BadCacheValues(String),

    /// The record source or the signature source failed
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    /// Rejected at construction time, before any access
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

impl CacheError {
    /// Whether the error was caused by the caller's key rather than the data
    pub fn is_key_error(&self) -> bool {
        matches!(self, CacheError::BadCacheKey(_))
    }
}

impl From<String> for CacheError {
    fn from(s: String) -> Self {
        CacheError::SourceUnavailable(s)
    }
}

impl From<&str> for CacheError {
    fn from(s: &str) -> Self {
        CacheError::SourceUnavailable(s.to_string())
    }
}

/// Driver failures are source failures
impl From<neo4rs::Error> for CacheError {
    fn from(e: neo4rs::Error) -> Self {
        CacheError::SourceUnavailable(format!("Neo4j driver error: {}", e))
    }
}
