//! Error types for cache operations

use thiserror::Error;

/// Errors surfaced by the query cache
///
/// Only snapshot handling and config file I/O can fail. Lookups, inserts and
/// size estimation never return an error.
#[derive(Debug, Error)]
pub enum CacheError {
    /// A snapshot could not be parsed or failed validation
    #[error("Corrupted cache data: {0}")]
    CorruptedData(String),

    /// A payload could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<CacheError> for query_core::QueryError {
    fn from(err: CacheError) -> Self {
        query_core::QueryError::CacheError(err.to_string())
    }
}
