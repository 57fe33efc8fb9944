//! Result cache capability.
//!
//! A [`Cache`] stores materialized query results under string keys. Failures are never fatal:
//! the resultset layer logs them and falls back to live execution.

mod memory;

use std::time::Duration;
use thiserror::Error;

use crate::connection::Row;

pub use memory::MemoryCache;

/// Errors raised by a cache backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// The backend could not be reached.
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    /// The backend rejected the operation.
    #[error("Cache backend error: {0}")]
    Backend(String),

    /// A stored payload could not be encoded or decoded.
    #[error("Cache serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Key/value store for materialized results.
pub trait Cache: Send + Sync {
    /// Look up a payload. `ttl_hint` is the TTL the caller would store with; backends may use it
    /// as an upper bound on the acceptable age.
    fn get(&self, key: &str, ttl_hint: Option<Duration>) -> Result<Option<Vec<Row>>, CacheError>;

    fn set(&self, key: &str, rows: &[Row], ttl: Duration) -> Result<(), CacheError>;

    fn delete(&self, key: &str) -> Result<(), CacheError>;
}
