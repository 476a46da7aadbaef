//! Testing utilities for the sandbox sync workspace
//!
//! An in-memory sandbox with failure injection and a watch stream driven by
//! the test, plus a polling helper for asserting on asynchronous effects.

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use sandbox_core::{FileEventType, RemoteError};
use sandbox_sync::{DirEntry, RemoteWatch, SandboxFs, WatchEvent, WatchHandle, WatchOptions};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

struct Subscriber {
    disposed: Arc<AtomicBool>,
    sender: mpsc::UnboundedSender<WatchEvent>,
    options: WatchOptions,
}

#[derive(Default)]
struct State {
    files: BTreeMap<String, Vec<u8>>,
    reads: Vec<String>,
    writes: Vec<String>,
    subscribers: Vec<Subscriber>,
}

/// In-memory sandbox filesystem
#[derive(Default)]
pub struct MockSandbox {
    state: Mutex<State>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    fail_watch: AtomicBool,
    echo_writes: AtomicBool,
}

fn key(path: &str) -> String {
    path.trim_start_matches("./").trim_matches('/').to_owned()
}

impl MockSandbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style file seeding
    #[must_use]
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.insert_file(path, content);
        self
    }

    /// Report every successful write back through the watch stream
    #[must_use]
    pub fn with_echo_writes(self) -> Self {
        self.echo_writes.store(true, Ordering::SeqCst);
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Change a file without notifying watchers
    pub fn insert_file(&self, path: &str, content: &str) {
        self.state
            .lock()
            .files
            .insert(key(path), content.as_bytes().to_vec());
    }

    pub fn remove_file(&self, path: &str) {
        self.state.lock().files.remove(&key(path));
    }

    pub fn content(&self, path: &str) -> Option<String> {
        self.state
            .lock()
            .files
            .get(&key(path))
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_watch(&self, fail: bool) {
        self.fail_watch.store(fail, Ordering::SeqCst);
    }

    /// Paths read as text or bytes, in order
    pub fn reads(&self) -> Vec<String> {
        self.state.lock().reads.clone()
    }

    /// Paths written, in order
    pub fn writes(&self) -> Vec<String> {
        self.state.lock().writes.clone()
    }

    pub fn read_count(&self, path: &str) -> usize {
        let path = key(path);
        self.state.lock().reads.iter().filter(|p| **p == path).count()
    }

    pub fn write_count(&self, path: &str) -> usize {
        let path = key(path);
        self.state.lock().writes.iter().filter(|p| **p == path).count()
    }

    /// Watches opened and not yet disposed
    pub fn active_watches(&self) -> usize {
        self.state
            .lock()
            .subscribers
            .iter()
            .filter(|s| !s.disposed.load(Ordering::SeqCst))
            .count()
    }

    /// Exclude patterns passed to the most recent watch
    pub fn last_watch_options(&self) -> Option<WatchOptions> {
        self.state.lock().subscribers.last().map(|s| s.options.clone())
    }

    /// Deliver a raw notification to every active watch
    pub fn emit(&self, event_type: FileEventType, paths: &[&str]) {
        let event = WatchEvent {
            event_type,
            paths: paths.iter().map(|p| (*p).to_owned()).collect(),
        };
        let state = self.state.lock();
        for subscriber in &state.subscribers {
            if !subscriber.disposed.load(Ordering::SeqCst) {
                subscriber.sender.send(event.clone()).ok();
            }
        }
    }

    /// Change a file and notify watchers, like an external editor would
    pub fn external_write(&self, path: &str, content: &str) {
        let existed = self.state.lock().files.contains_key(&key(path));
        self.insert_file(path, content);
        let event_type = if existed {
            FileEventType::Change
        } else {
            FileEventType::Add
        };
        self.emit(event_type, &[path]);
    }

    /// Delete a file and notify watchers
    pub fn external_remove(&self, path: &str) {
        self.remove_file(path);
        self.emit(FileEventType::Remove, &[path]);
    }

    fn store(&self, path: &str, content: &[u8]) -> Result<(), RemoteError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RemoteError::io(path, "simulated write failure"));
        }
        let existed = {
            let mut state = self.state.lock();
            state.writes.push(key(path));
            state.files.insert(key(path), content.to_vec()).is_some()
        };
        if self.echo_writes.load(Ordering::SeqCst) {
            let event_type = if existed {
                FileEventType::Change
            } else {
                FileEventType::Add
            };
            self.emit(event_type, &[path]);
        }
        Ok(())
    }

    fn load(&self, path: &str) -> Result<Vec<u8>, RemoteError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(RemoteError::io(path, "simulated read failure"));
        }
        let mut state = self.state.lock();
        state.reads.push(key(path));
        state
            .files
            .get(&key(path))
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(path.to_owned()))
    }
}

struct MockWatchHandle {
    disposed: Arc<AtomicBool>,
}

impl WatchHandle for MockWatchHandle {
    fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl SandboxFs for MockSandbox {
    async fn read_text_file(&self, path: &str) -> Result<String, RemoteError> {
        let bytes = self.load(path)?;
        String::from_utf8(bytes).map_err(|e| RemoteError::io(path, e))
    }

    async fn write_text_file(&self, path: &str, content: &str) -> Result<(), RemoteError> {
        self.store(path, content.as_bytes())
    }

    async fn read_file(&self, path: &str) -> Result<Vec<u8>, RemoteError> {
        self.load(path)
    }

    async fn write_file(&self, path: &str, content: &[u8]) -> Result<(), RemoteError> {
        self.store(path, content)
    }

    async fn readdir(&self, path: &str) -> Result<Vec<DirEntry>, RemoteError> {
        let dir = key(path);
        let prefix = if dir.is_empty() {
            String::new()
        } else {
            format!("{dir}/")
        };

        let state = self.state.lock();
        let mut dirs = BTreeSet::new();
        let mut files = BTreeSet::new();
        for file in state.files.keys() {
            let Some(rest) = file.strip_prefix(&prefix) else {
                continue;
            };
            match rest.split_once('/') {
                Some((child, _)) => {
                    dirs.insert(child.to_owned());
                }
                None => {
                    files.insert(rest.to_owned());
                }
            }
        }

        if dirs.is_empty() && files.is_empty() && !dir.is_empty() {
            return Err(RemoteError::NotFound(path.to_owned()));
        }
        Ok(dirs
            .into_iter()
            .map(DirEntry::directory)
            .chain(files.into_iter().map(DirEntry::file))
            .collect())
    }

    async fn watch(&self, _path: &str, options: WatchOptions) -> Result<RemoteWatch, RemoteError> {
        if self.fail_watch.load(Ordering::SeqCst) {
            return Err(RemoteError::Watch("simulated watch failure".into()));
        }
        let (sender, events) = mpsc::unbounded_channel();
        let disposed = Arc::new(AtomicBool::new(false));
        self.state.lock().subscribers.push(Subscriber {
            disposed: Arc::clone(&disposed),
            sender,
            options,
        });
        Ok(RemoteWatch {
            events,
            handle: Box::new(MockWatchHandle { disposed }),
        })
    }
}

/// Poll `condition` until it holds or `timeout` elapses
pub async fn wait_until<F>(mut condition: F, timeout: Duration) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Default timeout for [`wait_until`] in tests
pub const WAIT: Duration = Duration::from_secs(5);
