//! Cache store abstraction and backends for textorm.
//!
//! This crate provides:
//! - The `CacheStore` field-map contract (get all fields, set fields)
//! - Backends: Redis hashes and a process-local map
//! - Cache key construction from a namespace and a fingerprint

pub mod backends;
pub mod error;
pub mod traits;

pub use backends::{memory::MemoryCache, redis::RedisCache};
pub use error::{CacheError, CacheResult};
pub use traits::{CacheStore, FieldMap};

use std::sync::Arc;
use textorm_core::Fingerprint;
use textorm_core::config::CacheConfig;

/// Create a cache store from configuration.
///
/// For Redis this opens a managed connection and pings it, so an unreachable
/// server fails here rather than on the first request.
pub async fn from_config(config: &CacheConfig) -> CacheResult<Arc<dyn CacheStore>> {
    config.validate().map_err(CacheError::Config)?;

    match config {
        CacheConfig::Redis {
            host,
            port,
            db,
            username,
            password,
            ..
        } => {
            let backend = RedisCache::connect(
                host,
                *port,
                *db,
                username.clone(),
                password.as_ref().map(|p| p.expose().to_string()),
            )
            .await?;
            Ok(Arc::new(backend))
        }
        CacheConfig::Memory { .. } => Ok(Arc::new(MemoryCache::new())),
    }
}

/// Build the store key for a fingerprint: `"{prefix}:{fingerprint}"`.
pub fn cache_key(prefix: &str, fingerprint: &Fingerprint) -> String {
    if prefix.is_empty() {
        fingerprint.to_hex()
    } else {
        format!("{prefix}:{}", fingerprint.to_hex())
    }
}
