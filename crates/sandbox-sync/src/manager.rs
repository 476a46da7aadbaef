//! Sandbox manager
//!
//! Composition root: one cache, one identifier map, one bus and one
//! suppressor wired around a single sandbox session. Every public method
//! absorbs failures, logging them and returning `None`, `false` or an empty
//! collection.

use crate::bus::{FileEventBus, Subscription};
use crate::cache::LocalCache;
use crate::config::SyncConfig;
use crate::remote::{DirEntry, SandboxFs};
use crate::storage::DurableStorage;
use crate::suppressor::SelfWriteSuppressor;
use crate::watcher::{ChangeHandler, FileWatcher};
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use sandbox_core::error::SyncResult;
use sandbox_core::{FileEvent, FileEventType, Oid, SandboxPath, SyncError, TemplateNode};
use sandbox_index::{ProcessOutcome, TemplateNodeMapper};
use std::collections::HashMap;
use std::sync::{Arc, Weak};

struct Inner {
    config: SyncConfig,
    session: RwLock<Option<Arc<dyn SandboxFs>>>,
    cache: LocalCache,
    mapper: TemplateNodeMapper,
    bus: FileEventBus,
    suppressor: SelfWriteSuppressor,
    watcher: Mutex<Option<FileWatcher>>,
}

/// Public surface of the synchronization engine
#[derive(Clone)]
pub struct SandboxManager {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for SandboxManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SandboxManager")
            .field("connected", &self.is_connected())
            .field("cache", &self.inner.cache)
            .field("oids", &self.inner.mapper.len())
            .finish_non_exhaustive()
    }
}

impl SandboxManager {
    /// Create manager, restoring the cache snapshot from `storage`
    pub async fn open(
        config: SyncConfig,
        storage: Arc<dyn DurableStorage>,
        bus: FileEventBus,
    ) -> Self {
        let cache = LocalCache::restore(storage, config.storage_key.clone()).await;
        let mapper = TemplateNodeMapper::new(
            config.tracked_extensions.clone(),
            config.index_cache_capacity,
        );
        Self {
            inner: Arc::new(Inner {
                config,
                session: RwLock::new(None),
                cache,
                mapper,
                bus,
                suppressor: SelfWriteSuppressor::new(),
                watcher: Mutex::new(None),
            }),
        }
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    /// Bus every change is published on
    #[inline]
    #[must_use]
    pub fn event_bus(&self) -> &FileEventBus {
        &self.inner.bus
    }

    /// Subscribe to change events
    pub fn subscribe<F>(&self, event_type: FileEventType, callback: F) -> Subscription
    where
        F: Fn(&FileEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.inner.bus.subscribe(event_type, callback)
    }

    /// Use `session` for all remote access, without scanning
    pub fn register(&self, session: Arc<dyn SandboxFs>) {
        *self.inner.session.write() = Some(session);
    }

    /// Whether a session is registered
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.session.read().is_some()
    }

    /// Register `session`, index the whole project and start watching
    ///
    /// Reconnecting disposes the previous watcher first; changes missed
    /// while disconnected are picked up by the full reindex.
    pub async fn connect(&self, session: Arc<dyn SandboxFs>) -> usize {
        self.stop_watching();
        self.register(session);
        self.index().await
    }

    /// Scan the project into the cache, index tracked files and start
    /// watching; returns the number of files indexed
    pub async fn index(&self) -> usize {
        if self.session().is_none() {
            tracing::error!("No session found");
            return 0;
        }

        let config = &self.inner.config;
        let files = self
            .list_files_recursively("./", &config.ignored_directories, &config.scan_extensions)
            .await;
        tracing::info!("Indexing {} files", files.len());

        let mut indexed = 0;
        for path in files {
            if !self.refresh(&path).await {
                tracing::error!("Failed to read file {}", path);
                continue;
            }
            if matches!(self.process_path(&path).await, ProcessOutcome::Indexed { .. }) {
                indexed += 1;
            }
        }

        self.watch_files().await;
        indexed
    }

    /// Pull the sandbox copy of `path` into the cache
    ///
    /// A cached copy may predate edits made while nobody was watching, so
    /// it is only used when the sandbox cannot be read.
    async fn refresh(&self, path: &SandboxPath) -> bool {
        match self.read_remote_text(path).await {
            Ok(content) => {
                self.inner.cache.sync_from_remote(path, content).await;
                true
            }
            Err(e) => {
                let cached = self.inner.cache.has(path);
                if cached {
                    tracing::warn!("{}; indexing cached copy", e);
                } else {
                    tracing::error!("{}", e);
                }
                cached
            }
        }
    }

    /// Open the recursive watch, replacing any previous one
    pub async fn watch_files(&self) -> bool {
        let Some(session) = self.session() else {
            tracing::error!("No session found");
            return false;
        };
        self.stop_watching();

        let handler = Arc::new(ManagerHandler {
            manager: Arc::downgrade(&self.inner),
        });
        let watcher = FileWatcher::new(
            session,
            self.inner.bus.clone(),
            self.inner.config.sandbox_root.clone(),
            self.inner.config.ignored_directories.clone(),
            handler,
        );

        if let Err(e) = watcher.start().await {
            tracing::error!("{}", e);
            return false;
        }
        *self.inner.watcher.lock() = Some(watcher);
        true
    }

    fn stop_watching(&self) {
        let previous = self.inner.watcher.lock().take();
        if let Some(watcher) = previous {
            watcher.dispose();
        }
    }

    /// Whether a watch is open
    #[must_use]
    pub fn is_watching(&self) -> bool {
        self.inner
            .watcher
            .lock()
            .as_ref()
            .is_some_and(FileWatcher::is_running)
    }

    fn session(&self) -> Option<Arc<dyn SandboxFs>> {
        self.inner.session.read().clone()
    }

    fn resolve(&self, path: &str) -> Option<SandboxPath> {
        match SandboxPath::normalize(path, &self.inner.config.sandbox_root).confined() {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::error!("Rejected path {}: {}", path, e);
                None
            }
        }
    }

    async fn read_remote_text(&self, path: &SandboxPath) -> SyncResult<String> {
        let session = self
            .session()
            .ok_or_else(|| SyncError::RemoteUnavailable(path.to_string()))?;
        session
            .read_text_file(path.as_str())
            .await
            .map_err(|e| SyncError::read(path.as_str(), e))
    }

    async fn write_remote_text(&self, path: &SandboxPath, content: String) -> SyncResult<String> {
        let session = self
            .session()
            .ok_or_else(|| SyncError::RemoteUnavailable(path.to_string()))?;

        self.mark_self_write(path);
        match session.write_text_file(path.as_str(), &content).await {
            Ok(()) => Ok(content),
            Err(e) => {
                self.inner.suppressor.forget(path);
                Err(SyncError::write(path.as_str(), e))
            }
        }
    }

    /// Echoes only arrive through an open watch, so unwatched writes are
    /// not marked
    fn mark_self_write(&self, path: &SandboxPath) {
        if self.is_watching() {
            self.inner.suppressor.mark(path);
        }
    }

    async fn read_path(&self, path: &SandboxPath) -> Option<String> {
        self.inner
            .cache
            .read_or_fetch(path, || self.read_remote_text(path))
            .await
    }

    async fn write_path(&self, path: &SandboxPath, content: String) -> bool {
        self.inner
            .cache
            .write(path, content, |content| self.write_remote_text(path, content))
            .await
    }

    /// Read a text file through the cache
    pub async fn read_file(&self, path: &str) -> Option<String> {
        let path = self.resolve(path)?;
        self.read_path(&path).await
    }

    /// Read several text files, skipping unreadable ones
    pub async fn read_files<S: AsRef<str>>(&self, paths: &[S]) -> HashMap<SandboxPath, String> {
        let mut results = HashMap::with_capacity(paths.len());
        for path in paths {
            let Some(resolved) = self.resolve(path.as_ref()) else {
                continue;
            };
            match self.read_path(&resolved).await {
                Some(content) => {
                    results.insert(resolved, content);
                }
                None => tracing::error!("Failed to read file {}", resolved),
            }
        }
        results
    }

    /// Write a text file to the sandbox, then the cache
    ///
    /// Tracked files are reindexed right away; the write is marked so its
    /// echo is not processed a second time.
    pub async fn write_file(&self, path: &str, content: &str) -> bool {
        let Some(path) = self.resolve(path) else {
            return false;
        };
        if !self.write_path(&path, content.to_owned()).await {
            return false;
        }
        self.process_path(&path).await;
        true
    }

    /// Read raw bytes straight from the sandbox
    pub async fn read_binary_file(&self, path: &str) -> Option<Vec<u8>> {
        let path = self.resolve(path)?;
        let Some(session) = self.session() else {
            tracing::error!("{}", SyncError::RemoteUnavailable(path.to_string()));
            return None;
        };
        match session.read_file(path.as_str()).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::error!("{}", SyncError::read(path.as_str(), e));
                None
            }
        }
    }

    /// Write raw bytes straight to the sandbox
    pub async fn write_binary_file(&self, path: &str, content: &[u8]) -> bool {
        let Some(path) = self.resolve(path) else {
            return false;
        };
        let Some(session) = self.session() else {
            tracing::error!("{}", SyncError::RemoteUnavailable(path.to_string()));
            return false;
        };

        self.mark_self_write(&path);
        match session.write_file(path.as_str(), content).await {
            Ok(()) => true,
            Err(e) => {
                self.inner.suppressor.forget(&path);
                tracing::error!("{}", SyncError::write(path.as_str(), e));
                false
            }
        }
    }

    /// Every cached path, unordered
    #[must_use]
    pub fn list_all_files(&self) -> Vec<SandboxPath> {
        self.inner.cache.list_all_files()
    }

    /// One level of a sandbox directory
    pub async fn list_files(&self, dir: &str) -> Option<Vec<DirEntry>> {
        let dir = self.resolve(dir)?;
        let Some(session) = self.session() else {
            tracing::error!("No session found");
            return None;
        };
        match session.readdir(remote_dir(&dir)).await {
            Ok(entries) => Some(entries),
            Err(e) => {
                tracing::error!("Failed to list {}: {}", dir, e);
                None
            }
        }
    }

    /// Files under `dir`, depth first in listing order
    ///
    /// Directories named in `ignore` are skipped at any depth. An empty
    /// `extensions` list keeps every file.
    pub async fn list_files_recursively<S, T>(
        &self,
        dir: &str,
        ignore: &[S],
        extensions: &[T],
    ) -> Vec<SandboxPath>
    where
        S: AsRef<str>,
        T: AsRef<str>,
    {
        let Some(session) = self.session() else {
            tracing::error!("No session found");
            return Vec::new();
        };
        let Some(dir) = self.resolve(dir) else {
            return Vec::new();
        };
        let ignore: Vec<String> = ignore.iter().map(|s| s.as_ref().to_owned()).collect();
        let extensions: Vec<String> = extensions.iter().map(|s| s.as_ref().to_owned()).collect();

        walk(&session, dir, &ignore, &extensions).await
    }

    /// Apply one change event to the cache and the identifier map
    ///
    /// Excluded paths and echoes of the engine's own writes are skipped.
    pub async fn handle_file_event(&self, event: &FileEvent) {
        for path in &event.paths {
            if path.is_excluded(&self.inner.config.ignored_directories) {
                continue;
            }
            if self.inner.suppressor.take(path) {
                tracing::debug!("Skipping echo of own write to {}", path);
                continue;
            }

            match event.event_type {
                FileEventType::Remove => {
                    self.inner.cache.delete(path).await;
                    let dropped = self.inner.mapper.remove_file(path);
                    tracing::debug!("Removed {} ({} identifiers)", path, dropped);
                }
                FileEventType::Add | FileEventType::Change => {
                    let content = match self.read_remote_text(path).await {
                        Ok(content) => content,
                        Err(e) => {
                            tracing::error!("{}", e);
                            continue;
                        }
                    };
                    self.inner.cache.sync_from_remote(path, content).await;
                    self.process_path(path).await;
                }
                FileEventType::All => {}
            }
        }
    }

    /// Reindex one file if its extension is tracked
    pub async fn process_file_for_mapping(&self, path: &str) -> ProcessOutcome {
        let Some(path) = self.resolve(path) else {
            return ProcessOutcome::Skipped;
        };
        self.process_path(&path).await
    }

    async fn process_path(&self, path: &SandboxPath) -> ProcessOutcome {
        self.inner
            .mapper
            .process_file(
                path,
                |p| async move { self.read_path(&p).await },
                |p, content| async move { self.write_path(&p, content).await },
            )
            .await
    }

    /// Location of the element identified by `oid`
    #[must_use]
    pub fn get_template_node(&self, oid: &str) -> Option<TemplateNode> {
        self.inner.mapper.get_template_node(oid)
    }

    /// Current source of the element identified by `oid`
    pub async fn get_code_block(&self, oid: &str) -> Option<String> {
        if self.inner.mapper.get_template_node(oid).is_none() {
            tracing::error!("No template node found for oid {}", oid);
            return None;
        }
        self.inner
            .mapper
            .get_code_block(oid, |p| async move { self.read_path(&p).await })
            .await
    }

    /// Every identifier and its template node
    #[must_use]
    pub fn template_nodes(&self) -> HashMap<Oid, TemplateNode> {
        self.inner.mapper.snapshot()
    }

    /// Stop watching and drop all cached and mapped state
    ///
    /// The session stays registered.
    pub async fn clear(&self) {
        self.stop_watching();
        self.inner.cache.clear().await;
        self.inner.mapper.clear();
        self.inner.suppressor.clear();
    }
}

fn remote_dir(dir: &SandboxPath) -> &str {
    if dir.is_root() {
        "./"
    } else {
        dir.as_str()
    }
}

fn walk<'a>(
    session: &'a Arc<dyn SandboxFs>,
    dir: SandboxPath,
    ignore: &'a [String],
    extensions: &'a [String],
) -> BoxFuture<'a, Vec<SandboxPath>> {
    async move {
        let entries = match session.readdir(remote_dir(&dir)).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!("Failed to list {}: {}", dir, e);
                return Vec::new();
            }
        };

        let mut results = Vec::new();
        for entry in entries {
            let path = dir.join(&entry.name);
            if entry.is_directory() {
                if ignore.contains(&entry.name) {
                    continue;
                }
                results.extend(walk(session, path, ignore, extensions).await);
            } else if extensions.is_empty() || path.has_extension(extensions) {
                results.push(path);
            }
        }
        results
    }
    .boxed()
}

struct ManagerHandler {
    manager: Weak<Inner>,
}

#[async_trait::async_trait]
impl ChangeHandler for ManagerHandler {
    async fn on_file_change(&self, event: FileEvent) {
        if let Some(inner) = self.manager.upgrade() {
            SandboxManager { inner }.handle_file_event(&event).await;
        }
    }
}
