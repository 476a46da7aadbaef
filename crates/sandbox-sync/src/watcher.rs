//! File watcher
//!
//! Opens one recursive watch on the project root and turns each raw
//! notification batch into a [`FileEvent`]. Every event is published on the
//! bus and then handed to the change handler. Events are processed one at a
//! time, so reprocessing of any single path is never concurrent.

use crate::bus::FileEventBus;
use crate::remote::{SandboxFs, WatchEvent, WatchHandle, WatchOptions};
use futures::FutureExt;
use parking_lot::Mutex;
use sandbox_core::{FileEvent, SandboxPath, SyncError};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Receives every published change
#[async_trait::async_trait]
pub trait ChangeHandler: Send + Sync {
    /// Handle one change event
    async fn on_file_change(&self, event: FileEvent);
}

struct RunningWatch {
    handle: Box<dyn WatchHandle>,
    shutdown: oneshot::Sender<()>,
}

/// Recursive watch over one session
pub struct FileWatcher {
    session: Arc<dyn SandboxFs>,
    bus: FileEventBus,
    root: String,
    excludes: Vec<String>,
    handler: Arc<dyn ChangeHandler>,
    running: Mutex<Option<RunningWatch>>,
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher")
            .field("root", &self.root)
            .field("excludes", &self.excludes)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl FileWatcher {
    /// Create watcher; nothing is watched until [`start`](Self::start)
    pub fn new(
        session: Arc<dyn SandboxFs>,
        bus: FileEventBus,
        root: impl Into<String>,
        excludes: Vec<String>,
        handler: Arc<dyn ChangeHandler>,
    ) -> Self {
        Self {
            session,
            bus,
            root: root.into(),
            excludes,
            handler,
            running: Mutex::new(None),
        }
    }

    /// Open the watch and start delivering events
    ///
    /// Starting a running watcher does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::WatchFailure`] when the session refuses the watch.
    pub async fn start(&self) -> Result<(), SyncError> {
        if self.is_running() {
            return Ok(());
        }

        let options = WatchOptions {
            recursive: true,
            excludes: self.excludes.iter().map(|d| format!("{d}/**")).collect(),
        };
        let watch = self
            .session
            .watch("./", options)
            .await
            .map_err(SyncError::WatchFailure)?;

        let (shutdown, shutdown_rx) = oneshot::channel();
        tokio::spawn(run(
            watch.events,
            shutdown_rx,
            self.bus.clone(),
            Arc::clone(&self.handler),
            self.root.clone(),
            self.excludes.clone(),
        ));

        let previous = self.running.lock().replace(RunningWatch {
            handle: watch.handle,
            shutdown,
        });
        if let Some(previous) = previous {
            stop(previous);
        }
        tracing::info!("Watching sandbox files");
        Ok(())
    }

    /// Release the watch; calling twice is harmless
    ///
    /// A change already being handled runs to completion.
    pub fn dispose(&self) {
        if let Some(running) = self.running.lock().take() {
            stop(running);
            tracing::info!("Stopped watching sandbox files");
        }
    }

    /// Whether a watch is open
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn stop(running: RunningWatch) {
    running.shutdown.send(()).ok();
    running.handle.dispose();
}

/// Convert a raw batch, dropping excluded paths and paths outside the root
///
/// Returns `None` when nothing is left.
pub(crate) fn to_file_event<S: AsRef<str>>(
    raw: WatchEvent,
    root: &str,
    excludes: &[S],
) -> Option<FileEvent> {
    let paths: Vec<SandboxPath> = raw
        .paths
        .iter()
        .map(|p| SandboxPath::normalize(p, root))
        .filter(|p| !p.is_root() && !p.escapes_root() && !p.is_excluded(excludes))
        .collect();

    if paths.is_empty() {
        return None;
    }
    Some(FileEvent::new(raw.event_type, paths))
}

async fn run(
    mut events: mpsc::UnboundedReceiver<WatchEvent>,
    mut shutdown: oneshot::Receiver<()>,
    bus: FileEventBus,
    handler: Arc<dyn ChangeHandler>,
    root: String,
    excludes: Vec<String>,
) {
    loop {
        let raw = tokio::select! {
            biased;
            _ = &mut shutdown => break,
            raw = events.recv() => match raw {
                Some(raw) => raw,
                None => break,
            },
        };

        let Some(event) = to_file_event(raw, &root, &excludes) else {
            continue;
        };

        bus.publish(&event);

        let outcome = AssertUnwindSafe(handler.on_file_change(event))
            .catch_unwind()
            .await;
        if outcome.is_err() {
            tracing::error!("Change handler panicked");
        }
    }
    tracing::debug!("Watch loop finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sandbox_core::FileEventType;

    #[test]
    fn excluded_paths_are_dropped() {
        let raw = WatchEvent {
            event_type: FileEventType::Change,
            paths: vec![
                "/project/sandbox/node_modules/pkg/index.js".to_owned(),
                "/project/sandbox/src/app/page.tsx".to_owned(),
            ],
        };
        let event = to_file_event(raw, "/project/sandbox", &["node_modules"]).unwrap();
        assert_eq!(event.paths, vec!["src/app/page.tsx".parse::<SandboxPath>().unwrap()]);
    }

    #[test]
    fn fully_excluded_batch_is_skipped() {
        let raw = WatchEvent {
            event_type: FileEventType::Add,
            paths: vec!["web/.next/cache/x.js".to_owned()],
        };
        assert_eq!(to_file_event(raw, "/project/sandbox", &[".next"]), None);
    }

    #[test]
    fn paths_outside_the_root_are_dropped() {
        let raw = WatchEvent {
            event_type: FileEventType::Change,
            paths: vec![
                "/etc/passwd".to_owned(),
                "../outside.tsx".to_owned(),
                "./src/a.tsx".to_owned(),
            ],
        };
        let event = to_file_event(raw, "/project/sandbox", &["node_modules"]).unwrap();
        assert_eq!(event.paths, vec!["src/a.tsx".parse::<SandboxPath>().unwrap()]);

        let only_outside = WatchEvent {
            event_type: FileEventType::Add,
            paths: vec!["/tmp/x.tsx".to_owned()],
        };
        assert_eq!(to_file_event(only_outside, "/project/sandbox", &["node_modules"]), None);
    }
}
