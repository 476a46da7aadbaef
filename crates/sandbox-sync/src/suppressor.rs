//! Self-write suppression
//!
//! The engine marks a path right before it writes to the sandbox. When the
//! watcher reports a change for a marked path the marker is consumed and the
//! change is not reprocessed.
//!
//! Markers are counted per path, one per engine write, so a file written
//! twice in a row (content, then injected identifiers) swallows both echoes.
//! They are keyed by path alone: an external edit that lands between a
//! self-write and its echo is indistinguishable from the echo and is
//! swallowed with it.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use sandbox_core::SandboxPath;

/// Pending self-write markers
#[derive(Debug, Default)]
pub struct SelfWriteSuppressor {
    pending: DashMap<SandboxPath, usize>,
}

impl SelfWriteSuppressor {
    /// Create empty suppressor
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an engine-issued write to `path`
    pub fn mark(&self, path: &SandboxPath) {
        *self.pending.entry(path.clone()).or_insert(0) += 1;
    }

    /// Whether a write to `path` is awaiting its echo
    #[must_use]
    pub fn is_pending(&self, path: &SandboxPath) -> bool {
        self.pending.contains_key(path)
    }

    /// Consume one marker for `path`; `true` means the change is an echo
    pub fn take(&self, path: &SandboxPath) -> bool {
        match self.pending.entry(path.clone()) {
            Entry::Occupied(mut entry) => {
                if *entry.get() <= 1 {
                    entry.remove();
                } else {
                    *entry.get_mut() -= 1;
                }
                true
            }
            Entry::Vacant(_) => false,
        }
    }

    /// Drop one marker for a write that never happened
    pub fn forget(&self, path: &SandboxPath) {
        self.take(path);
    }

    /// Drop every marker
    pub fn clear(&self) {
        self.pending.clear();
    }

    /// Number of writes awaiting their echo
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.iter().map(|entry| *entry.value()).sum()
    }

    /// Whether no marker is pending
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
