//! Error types for sandbox synchronization
//!
//! Provides error handling for:
//! - Remote sandbox filesystem access
//! - Durable snapshot storage
//! - The engine-level failure taxonomy surfaced in logs

/// Errors from the remote sandbox filesystem
#[derive(Debug, Clone, thiserror::Error)]
pub enum RemoteError {
    /// No session is registered
    #[error("no active sandbox session")]
    NoSession,

    /// Path does not exist remotely
    #[error("not found: {0}")]
    NotFound(String),

    /// Path leaves the project root
    #[error("path escapes the project root: {0}")]
    OutsideRoot(String),

    /// I/O failure reported by the remote side
    #[error("remote io error on {path}: {message}")]
    Io { path: String, message: String },

    /// Watch could not be opened
    #[error("watch failed: {0}")]
    Watch(String),
}

impl RemoteError {
    /// Create I/O error for path
    pub fn io(path: impl Into<String>, message: impl ToString) -> Self {
        Self::Io {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

/// Errors from durable storage
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Backend I/O failed
    #[error("storage io error for key '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// Stored value could not be (de)serialized
    #[error("storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend-specific failure
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    /// Create IO error for key
    pub fn io_error(key: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            key: key.into(),
            source,
        }
    }
}

/// Errors for malformed paths
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Expected a project-relative path
    #[error("expected a project-relative path, got '{0}'")]
    NotRelative(String),

    /// Path climbs above the root
    #[error("path escapes the project root: '{0}'")]
    EscapesRoot(String),
}

/// Engine failure taxonomy
///
/// None of these escape a public manager method: they are logged and turned
/// into a benign return value.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// No active session
    #[error("remote unavailable: {0}")]
    RemoteUnavailable(String),

    /// Remote read rejected
    #[error("failed to read {path}: {source}")]
    ReadFailure {
        path: String,
        #[source]
        source: RemoteError,
    },

    /// Remote write rejected
    #[error("failed to write {path}: {source}")]
    WriteFailure {
        path: String,
        #[source]
        source: RemoteError,
    },

    /// Source unparsable
    #[error("failed to parse {path}: {message}")]
    ParseFailure { path: String, message: String },

    /// Durable storage read or write failed
    #[error("persistence failed: {0}")]
    PersistenceFailure(#[from] StorageError),

    /// Recursive watch could not be opened
    #[error("failed to start file watcher: {0}")]
    WatchFailure(RemoteError),
}

impl SyncError {
    /// Create read failure for path
    pub fn read(path: impl Into<String>, source: RemoteError) -> Self {
        match source {
            RemoteError::NoSession => Self::RemoteUnavailable(path.into()),
            source => Self::ReadFailure {
                path: path.into(),
                source,
            },
        }
    }

    /// Create write failure for path
    pub fn write(path: impl Into<String>, source: RemoteError) -> Self {
        match source {
            RemoteError::NoSession => Self::RemoteUnavailable(path.into()),
            source => Self::WriteFailure {
                path: path.into(),
                source,
            },
        }
    }
}

/// Result type alias for engine operations
pub type SyncResult<T> = Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_error_display() {
        let err = RemoteError::io("src/a.tsx", "permission denied");
        assert_eq!(err.to_string(), "remote io error on src/a.tsx: permission denied");
    }

    #[test]
    fn missing_session_maps_to_unavailable() {
        let err = SyncError::read("a.tsx", RemoteError::NoSession);
        assert!(matches!(err, SyncError::RemoteUnavailable(_)));

        let err = SyncError::write("a.tsx", RemoteError::NotFound("a.tsx".into()));
        assert!(matches!(err, SyncError::WriteFailure { .. }));
    }

    #[test]
    fn storage_error_converts() {
        let err = StorageError::Backend("quota exceeded".to_string());
        let sync: SyncError = err.into();
        assert!(sync.to_string().contains("quota exceeded"));
    }
}
