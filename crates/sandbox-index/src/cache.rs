//! Content-addressed cache of indexed files using moka
//!
//! Keyed by a hash over path and content, so an unchanged file that is
//! reported again is not reparsed.

use crate::indexer::FileIndex;
use moka::future::Cache;
use sandbox_core::ContentHash;
use std::sync::Arc;

/// Cache of [`FileIndex`] results
#[derive(Debug, Clone)]
pub struct IndexCache {
    inner: Cache<ContentHash, Arc<FileIndex>>,
}

impl IndexCache {
    /// Create new cache with max capacity
    #[inline]
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        Self {
            inner: Cache::new(max_capacity),
        }
    }

    /// Insert an index result
    #[inline]
    pub async fn insert(&self, key: ContentHash, index: Arc<FileIndex>) {
        self.inner.insert(key, index).await;
    }

    /// Get an index result
    #[inline]
    pub async fn get(&self, key: &ContentHash) -> Option<Arc<FileIndex>> {
        self.inner.get(key).await
    }

    /// Invalidate all entries
    #[inline]
    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }

    /// Get approximate entry count
    #[inline]
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}

impl Default for IndexCache {
    fn default() -> Self {
        Self::new(1024)
    }
}
