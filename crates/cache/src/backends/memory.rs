//! Process-local cache backend.

use crate::error::CacheResult;
use crate::traits::{CacheStore, FieldMap};
use async_trait::async_trait;
use dashmap::DashMap;

/// In-memory cache store with Redis hash semantics.
///
/// Entries live for the lifetime of the value and are never evicted.
#[derive(Default)]
pub struct MemoryCache {
    entries: DashMap<String, FieldMap>,
}

impl MemoryCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys stored.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no keys are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn hash_get_all(&self, key: &str) -> CacheResult<Option<FieldMap>> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn hash_set(&self, key: &str, fields: &FieldMap) -> CacheResult<()> {
        if fields.is_empty() {
            return Ok(());
        }
        let mut entry = self.entries.entry(key.to_string()).or_default();
        for (field, value) in fields {
            entry.insert(field.clone(), value.clone());
        }
        Ok(())
    }

    async fn ping(&self) -> CacheResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
