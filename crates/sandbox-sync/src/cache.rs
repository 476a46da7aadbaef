//! Write-through local cache of sandbox files
//!
//! The cache only ever holds content that was successfully written to the
//! sandbox or observed there. A remote write that fails never reaches it.
//! The whole cache is persisted as one JSON object under a single storage
//! key after every mutation and restored when the cache is created.

use crate::storage::DurableStorage;
use dashmap::DashMap;
use sandbox_core::error::SyncResult;
use sandbox_core::{SandboxPath, SyncError};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Path to content store backed by durable storage
pub struct LocalCache {
    files: DashMap<SandboxPath, String>,
    storage: Arc<dyn DurableStorage>,
    key: String,
    epoch: AtomicU64,
}

impl std::fmt::Debug for LocalCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalCache")
            .field("files", &self.files.len())
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl LocalCache {
    /// Create cache, restoring the snapshot stored under `key`
    ///
    /// Restoring is best effort: unreadable or malformed snapshots are
    /// logged and the cache starts empty.
    pub async fn restore(storage: Arc<dyn DurableStorage>, key: impl Into<String>) -> Self {
        let cache = Self {
            files: DashMap::new(),
            storage,
            key: key.into(),
            epoch: AtomicU64::new(0),
        };

        match cache.load_snapshot().await {
            Ok(count) => tracing::debug!("Restored {} cached files", count),
            Err(e) => tracing::error!("Failed to restore file cache: {}", e),
        }
        cache
    }

    async fn load_snapshot(&self) -> SyncResult<usize> {
        let Some(value) = self
            .storage
            .get_item(&self.key)
            .await
            .map_err(SyncError::from)?
        else {
            return Ok(0);
        };

        let snapshot: BTreeMap<String, String> = serde_json::from_value(value)
            .map_err(|e| SyncError::PersistenceFailure(e.into()))?;

        let mut restored = 0;
        for (path, content) in snapshot {
            match path.parse::<SandboxPath>() {
                Ok(path) => {
                    self.files.insert(path, content);
                    restored += 1;
                }
                Err(e) => tracing::warn!("Skipping cached entry: {}", e),
            }
        }
        Ok(restored)
    }

    async fn persist(&self) {
        let snapshot: BTreeMap<String, String> = self
            .files
            .iter()
            .map(|entry| (entry.key().to_string(), entry.value().clone()))
            .collect();

        let result = match serde_json::to_value(snapshot) {
            Ok(value) => self.storage.set_item(&self.key, value).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = result {
            tracing::error!("{}", SyncError::PersistenceFailure(e));
        }
    }

    /// Whether `path` is cached
    #[must_use]
    pub fn has(&self, path: &SandboxPath) -> bool {
        self.files.contains_key(path)
    }

    /// Cached content, without touching the sandbox
    #[must_use]
    pub fn get(&self, path: &SandboxPath) -> Option<String> {
        self.files.get(path).map(|entry| entry.value().clone())
    }

    /// Cached content, fetching it through `fetch` on a miss
    ///
    /// A failed fetch is logged and leaves the cache unchanged.
    pub async fn read_or_fetch<F, Fut>(&self, path: &SandboxPath, fetch: F) -> Option<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = SyncResult<String>>,
    {
        if let Some(content) = self.get(path) {
            return Some(content);
        }

        let epoch = self.epoch();
        match fetch().await {
            Ok(content) => {
                if self.epoch() == epoch {
                    self.files.insert(path.clone(), content.clone());
                    self.persist().await;
                }
                Some(content)
            }
            Err(e) => {
                tracing::error!("{}", e);
                None
            }
        }
    }

    /// Write through `writer`, committing to the cache only on success
    pub async fn write<F, Fut>(&self, path: &SandboxPath, content: String, writer: F) -> bool
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = SyncResult<String>>,
    {
        let epoch = self.epoch();
        match writer(content).await {
            Ok(written) => {
                if self.epoch() == epoch {
                    self.files.insert(path.clone(), written);
                    self.persist().await;
                }
                true
            }
            Err(e) => {
                tracing::error!("{}", e);
                false
            }
        }
    }

    /// Set an entry without writing to the sandbox
    pub async fn update_cache(&self, path: &SandboxPath, content: String) {
        self.files.insert(path.clone(), content);
        self.persist().await;
    }

    /// Ingest content observed in the sandbox; returns whether it changed
    pub async fn sync_from_remote(&self, path: &SandboxPath, content: String) -> bool {
        if self.files.get(path).is_some_and(|cached| *cached == content) {
            return false;
        }
        self.update_cache(path, content).await;
        true
    }

    /// Remove an entry; returns whether it was cached
    pub async fn delete(&self, path: &SandboxPath) -> bool {
        let removed = self.files.remove(path).is_some();
        if removed {
            self.persist().await;
        }
        removed
    }

    /// Every cached path, unordered
    #[must_use]
    pub fn list_all_files(&self) -> Vec<SandboxPath> {
        self.files.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Number of cached files
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether nothing is cached
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Drop every entry and erase the snapshot
    ///
    /// Fetches and writes already in flight complete but do not commit.
    pub async fn clear(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.files.clear();
        if let Err(e) = self.storage.remove_item(&self.key).await {
            tracing::error!("{}", SyncError::PersistenceFailure(e));
        }
    }

    fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }
}
