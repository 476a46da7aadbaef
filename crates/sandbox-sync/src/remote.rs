//! Remote sandbox filesystem contract
//!
//! Everything the engine needs from a sandbox session. Any backend that
//! implements [`SandboxFs`] can be registered with the manager.

use sandbox_core::{FileEventType, RemoteError};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Kind of a directory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Regular file
    File,
    /// Directory
    Directory,
}

/// One entry of a directory listing
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DirEntry {
    /// Entry name, no path components
    pub name: String,
    /// Entry kind
    #[serde(rename = "type")]
    pub kind: EntryKind,
}

impl DirEntry {
    /// Create file entry
    #[must_use]
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
        }
    }

    /// Create directory entry
    #[must_use]
    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Directory,
        }
    }

    /// Whether this is a directory
    #[inline]
    #[must_use]
    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Options for [`SandboxFs::watch`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchOptions {
    /// Watch subdirectories
    pub recursive: bool,
    /// Glob patterns the backend should not report
    pub excludes: Vec<String>,
}

/// One raw notification batch from the remote side
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    /// Kind of change
    pub event_type: FileEventType,
    /// Paths as reported by the backend
    pub paths: Vec<String>,
}

/// Releases a remote watch subscription
pub trait WatchHandle: Send + Sync {
    /// Stop delivering events; calling twice is harmless
    fn dispose(&self);
}

/// An open watch: an event stream plus its handle
pub struct RemoteWatch {
    /// Notification batches in arrival order
    pub events: mpsc::UnboundedReceiver<WatchEvent>,
    /// Subscription handle
    pub handle: Box<dyn WatchHandle>,
}

impl std::fmt::Debug for RemoteWatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteWatch").finish_non_exhaustive()
    }
}

/// Filesystem of a remote sandbox session
///
/// Paths are project-relative with forward slashes.
#[async_trait::async_trait]
pub trait SandboxFs: Send + Sync {
    /// Read a UTF-8 file
    async fn read_text_file(&self, path: &str) -> Result<String, RemoteError>;

    /// Write a UTF-8 file, creating parent directories as needed
    async fn write_text_file(&self, path: &str, content: &str) -> Result<(), RemoteError>;

    /// Read raw bytes
    async fn read_file(&self, path: &str) -> Result<Vec<u8>, RemoteError>;

    /// Write raw bytes
    async fn write_file(&self, path: &str, content: &[u8]) -> Result<(), RemoteError>;

    /// List one directory level
    async fn readdir(&self, path: &str) -> Result<Vec<DirEntry>, RemoteError>;

    /// Open a watch rooted at `path`
    async fn watch(&self, path: &str, options: WatchOptions) -> Result<RemoteWatch, RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dir_entry_wire_format() {
        let json = serde_json::to_string(&DirEntry::directory("src")).unwrap();
        assert_eq!(json, r#"{"name":"src","type":"directory"}"#);
        assert!(DirEntry::directory("src").is_directory());
        assert!(!DirEntry::file("a.tsx").is_directory());
    }
}
