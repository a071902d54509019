//! Cache store trait definition.

use crate::error::CacheResult;
use async_trait::async_trait;
use std::collections::HashMap;

/// A flat string-to-string field map stored under one key.
pub type FieldMap = HashMap<String, String>;

/// Key/field-map store used to remember generated queries.
///
/// Implementations provide no retries and no transactional guarantees. Writes
/// merge fields into the existing map, so writing the same map twice leaves
/// the stored value unchanged.
#[async_trait]
pub trait CacheStore: Send + Sync + 'static {
    /// Get every field stored under `key`, or `None` if the key is absent.
    async fn hash_get_all(&self, key: &str) -> CacheResult<Option<FieldMap>>;

    /// Set the given fields under `key`.
    async fn hash_set(&self, key: &str, fields: &FieldMap) -> CacheResult<()>;

    /// Verify the store is reachable.
    async fn ping(&self) -> CacheResult<()>;

    /// Static backend identifier for logs and metrics.
    fn backend_name(&self) -> &'static str;
}
