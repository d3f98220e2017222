//! Response cache lookups.
//!
//! The cache itself belongs to the embedding server; the request pipeline
//! only needs get-by-key. [`MemoryCache`] is a concurrent in-process store
//! satisfying that interface.

use dashmap::DashMap;
use std::sync::Arc;

use crate::observability::metrics;

/// Read side of a response cache keyed by raw bytes.
pub trait ResponseCache: Send + Sync {
    /// Returns the cached response for `key`, if any.
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;
}

/// A thread-safe in-memory response cache.
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    inner: Arc<DashMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryCache {
    /// Create a new empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a response under `key`, replacing any previous value.
    pub fn insert(&self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.inner.insert(key.into(), value.into());
        metrics::record_cache_size(self.inner.len());
    }

    /// Remove a cached response.
    pub fn remove(&self, key: &[u8]) -> Option<Vec<u8>> {
        let removed = self.inner.remove(key).map(|(_, v)| v);
        metrics::record_cache_size(self.inner.len());
        removed
    }

    /// Number of cached responses.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl ResponseCache for MemoryCache {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.inner.get(key).map(|r| r.value().clone())
    }
}
