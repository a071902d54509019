//! Per-fingerprint in-flight tracking for cache misses.

use dashmap::DashMap;
use std::sync::Arc;
use textorm_core::Fingerprint;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Serializes concurrent misses for the same fingerprint.
#[derive(Default)]
pub struct InflightRequests {
    locks: DashMap<Fingerprint, Arc<Mutex<()>>>,
}

/// Held while one request generates for a fingerprint.
pub struct InflightGuard<'a> {
    owner: &'a InflightRequests,
    fingerprint: Fingerprint,
    waited: bool,
    _guard: OwnedMutexGuard<()>,
}

impl InflightRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other request is generating for `fingerprint`.
    pub async fn acquire(&self, fingerprint: Fingerprint) -> InflightGuard<'_> {
        let lock = self
            .locks
            .entry(fingerprint)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let (guard, waited) = match lock.clone().try_lock_owned() {
            Ok(guard) => (guard, false),
            Err(_) => (lock.lock_owned().await, true),
        };

        InflightGuard {
            owner: self,
            fingerprint,
            waited,
            _guard: guard,
        }
    }

    /// Fingerprints currently tracked.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl InflightGuard<'_> {
    /// Whether another request held this fingerprint when we arrived.
    pub fn waited(&self) -> bool {
        self.waited
    }
}

impl Drop for InflightGuard<'_> {
    fn drop(&mut self) {
        // Map entry + our guard; anything above that is a queued waiter.
        self.owner
            .locks
            .remove_if(&self.fingerprint, |_, lock| Arc::strong_count(lock) <= 2);
    }
}
