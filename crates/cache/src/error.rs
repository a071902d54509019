//! Cache store error types.

use thiserror::Error;

/// Cache store operation errors.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to connect to cache at {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: redis::RedisError,
    },

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

/// Result type for cache operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;
