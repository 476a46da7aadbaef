//! Local directory backend
//!
//! Serves a project directory on disk through the sandbox filesystem
//! contract, with `notify` standing in for the remote watch.

use async_trait::async_trait;
use notify::event::{EventKind, ModifyKind};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use sandbox_core::{FileEventType, RemoteError, SandboxPath};
use sandbox_sync::{DirEntry, RemoteWatch, SandboxFs, WatchEvent, WatchHandle, WatchOptions};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

/// A project directory on the local disk
#[derive(Debug, Clone)]
pub(crate) struct LocalSandbox {
    root: PathBuf,
}

impl LocalSandbox {
    pub(crate) fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, RemoteError> {
        let relative: SandboxPath = path
            .parse()
            .map_err(|_| RemoteError::OutsideRoot(path.to_owned()))?;
        Ok(self.root.join(relative.as_str()))
    }
}

fn io_error(path: &str, e: std::io::Error) -> RemoteError {
    if e.kind() == std::io::ErrorKind::NotFound {
        RemoteError::NotFound(path.to_owned())
    } else {
        RemoteError::io(path, e)
    }
}

#[async_trait]
impl SandboxFs for LocalSandbox {
    async fn read_text_file(&self, path: &str) -> Result<String, RemoteError> {
        tokio::fs::read_to_string(self.resolve(path)?)
            .await
            .map_err(|e| io_error(path, e))
    }

    async fn write_text_file(&self, path: &str, content: &str) -> Result<(), RemoteError> {
        self.write_file(path, content.as_bytes()).await
    }

    async fn read_file(&self, path: &str) -> Result<Vec<u8>, RemoteError> {
        tokio::fs::read(self.resolve(path)?)
            .await
            .map_err(|e| io_error(path, e))
    }

    async fn write_file(&self, path: &str, content: &[u8]) -> Result<(), RemoteError> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(path, e))?;
        }
        tokio::fs::write(full, content)
            .await
            .map_err(|e| io_error(path, e))
    }

    async fn readdir(&self, path: &str) -> Result<Vec<DirEntry>, RemoteError> {
        let mut reader = tokio::fs::read_dir(self.resolve(path)?)
            .await
            .map_err(|e| io_error(path, e))?;

        let mut entries = Vec::new();
        while let Some(entry) = reader.next_entry().await.map_err(|e| io_error(path, e))? {
            let name = entry.file_name().to_string_lossy().into_owned();
            let file_type = entry.file_type().await.map_err(|e| io_error(path, e))?;
            entries.push(if file_type.is_dir() {
                DirEntry::directory(name)
            } else {
                DirEntry::file(name)
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn watch(&self, path: &str, options: WatchOptions) -> Result<RemoteWatch, RemoteError> {
        let target = self.resolve(path)?;
        let root = self.root.clone();
        let excluded: Vec<String> = options
            .excludes
            .iter()
            .map(|pattern| pattern.trim_end_matches("/**").to_owned())
            .collect();
        let (sender, events) = mpsc::unbounded_channel();

        let mut watcher = notify::recommended_watcher(move |result: notify::Result<notify::Event>| {
            match result {
                Ok(event) => {
                    for raw in translate(&event, &root, &excluded) {
                        sender.send(raw).ok();
                    }
                }
                Err(e) => tracing::warn!("Watch error: {}", e),
            }
        })
        .map_err(|e| RemoteError::Watch(e.to_string()))?;

        let mode = if options.recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher
            .watch(&target, mode)
            .map_err(|e| RemoteError::Watch(e.to_string()))?;

        Ok(RemoteWatch {
            events,
            handle: Box::new(LocalWatchHandle {
                watcher: Mutex::new(Some(watcher)),
            }),
        })
    }
}

struct LocalWatchHandle {
    watcher: Mutex<Option<RecommendedWatcher>>,
}

impl WatchHandle for LocalWatchHandle {
    fn dispose(&self) {
        self.watcher.lock().take();
    }
}

/// Map a notify event to watch events, one per change kind
fn translate(event: &notify::Event, root: &Path, excluded: &[String]) -> Vec<WatchEvent> {
    let mut added = Vec::new();
    let mut changed = Vec::new();
    let mut removed = Vec::new();

    for path in &event.paths {
        let Some(relative) = relative_path(path, root) else {
            continue;
        };
        if relative.is_excluded(excluded) {
            continue;
        }
        let relative = relative.into_string();
        match event.kind {
            EventKind::Create(_) if path.is_file() => added.push(relative),
            EventKind::Modify(ModifyKind::Name(_)) => {
                if path.is_file() {
                    added.push(relative);
                } else if !path.exists() {
                    removed.push(relative);
                }
            }
            EventKind::Modify(_) if path.is_file() => changed.push(relative),
            EventKind::Remove(_) => removed.push(relative),
            _ => {}
        }
    }

    [
        (FileEventType::Add, added),
        (FileEventType::Change, changed),
        (FileEventType::Remove, removed),
    ]
    .into_iter()
    .filter(|(_, paths)| !paths.is_empty())
    .map(|(event_type, paths)| WatchEvent { event_type, paths })
    .collect()
}

fn relative_path(path: &Path, root: &Path) -> Option<SandboxPath> {
    let relative = path.strip_prefix(root).ok()?;
    let joined = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    joined.parse().ok()
}
