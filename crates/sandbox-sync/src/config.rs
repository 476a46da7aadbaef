//! Engine configuration

use sandbox_core::constants::{
    scan_extensions, CACHE_STORAGE_KEY, IGNORED_DIRECTORIES, JSX_FILE_EXTENSIONS, SANDBOX_ROOT,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Errors loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Config is not valid TOML for [`SyncConfig`]
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Configuration for a [`SandboxManager`](crate::SandboxManager)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Absolute root that absolute input paths are made relative to
    pub sandbox_root: String,
    /// Directory names excluded from watching, listing and handling
    pub ignored_directories: Vec<String>,
    /// Extensions that are indexed
    pub tracked_extensions: Vec<String>,
    /// Extensions read into the cache during the initial scan
    pub scan_extensions: Vec<String>,
    /// Durable storage key for the cache snapshot
    pub storage_key: String,
    /// Parsed files kept in the index cache
    pub index_cache_capacity: u64,
}

impl SyncConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With sandbox root
    #[inline]
    #[must_use]
    pub fn with_sandbox_root(mut self, root: impl Into<String>) -> Self {
        self.sandbox_root = root.into();
        self
    }

    /// With an additional ignored directory
    #[must_use]
    pub fn with_ignored_directory(mut self, dir: impl Into<String>) -> Self {
        let dir = dir.into();
        if !self.ignored_directories.contains(&dir) {
            self.ignored_directories.push(dir);
        }
        self
    }

    /// With tracked extensions
    #[must_use]
    pub fn with_tracked_extensions<S: Into<String>>(
        mut self,
        extensions: impl IntoIterator<Item = S>,
    ) -> Self {
        self.tracked_extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// With storage key
    #[inline]
    #[must_use]
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    /// With index cache capacity
    #[inline]
    #[must_use]
    pub fn with_index_cache_capacity(mut self, capacity: u64) -> Self {
        self.index_cache_capacity = capacity;
        self
    }

    /// Parse from TOML; missing fields take their defaults
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed input.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&input)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            sandbox_root: SANDBOX_ROOT.to_owned(),
            ignored_directories: IGNORED_DIRECTORIES.iter().map(|d| (*d).to_owned()).collect(),
            tracked_extensions: JSX_FILE_EXTENSIONS.iter().map(|e| (*e).to_owned()).collect(),
            scan_extensions: scan_extensions().into_iter().map(str::to_owned).collect(),
            storage_key: CACHE_STORAGE_KEY.to_owned(),
            index_cache_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.sandbox_root, "/project/sandbox");
        assert!(config.ignored_directories.iter().any(|d| d == "node_modules"));
        assert_eq!(config.tracked_extensions, vec!["jsx", "tsx"]);
        assert_eq!(config.storage_key, "file-sync-cache");
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = SyncConfig::from_toml_str(
            r#"
            sandbox_root = "/work"
            tracked_extensions = ["tsx"]
            "#,
        )
        .unwrap();
        assert_eq!(config.sandbox_root, "/work");
        assert_eq!(config.tracked_extensions, vec!["tsx"]);
        assert_eq!(config.index_cache_capacity, 1024);
    }

    #[test]
    fn malformed_toml_is_rejected() {
        let err = SyncConfig::from_toml_str("sandbox_root = [").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn builder() {
        let config = SyncConfig::new()
            .with_sandbox_root("/srv")
            .with_ignored_directory("coverage")
            .with_ignored_directory("coverage")
            .with_storage_key("k");
        assert_eq!(config.sandbox_root, "/srv");
        assert_eq!(
            config.ignored_directories.iter().filter(|d| *d == "coverage").count(),
            1
        );
        assert_eq!(config.storage_key, "k");
    }

    #[test]
    fn missing_file() {
        let err = SyncConfig::from_file("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
