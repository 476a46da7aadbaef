//! Durable key-value storage for cache snapshots

use async_trait::async_trait;
use dashmap::DashMap;
use sandbox_core::StorageError;
use serde_json::Value;
use std::path::PathBuf;

/// Async key-value persistence
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DurableStorage: Send + Sync {
    /// Load a value, `None` when the key was never written
    async fn get_item(&self, key: &str) -> Result<Option<Value>, StorageError>;

    /// Store a value
    async fn set_item(&self, key: &str, value: Value) -> Result<(), StorageError>;

    /// Remove a value; missing keys are not an error
    async fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// Process-local storage, lost on exit
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: DashMap<String, Value>,
}

impl MemoryStorage {
    /// Create empty storage
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DurableStorage for MemoryStorage {
    async fn get_item(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.items.get(key).map(|v| v.value().clone()))
    }

    async fn set_item(&self, key: &str, value: Value) -> Result<(), StorageError> {
        self.items.insert(key.to_owned(), value);
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.items.remove(key);
        Ok(())
    }
}

/// One JSON file per key inside a directory
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Store items under `dir`, created on first write
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn item_path(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{name}.json"))
    }
}

#[async_trait]
impl DurableStorage for FileStorage {
    async fn get_item(&self, key: &str) -> Result<Option<Value>, StorageError> {
        match tokio::fs::read(self.item_path(key)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io_error(key, e)),
        }
    }

    async fn set_item(&self, key: &str, value: Value) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StorageError::io_error(key, e))?;
        let bytes = serde_json::to_vec(&value)?;
        tokio::fs::write(self.item_path(key), bytes)
            .await
            .map_err(|e| StorageError::io_error(key, e))
    }

    async fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        match tokio::fs::remove_file(self.item_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io_error(key, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[tokio::test]
    async fn memory_round_trip() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get_item("k").await.unwrap(), None);

        storage.set_item("k", json!({"a": "b"})).await.unwrap();
        assert_eq!(storage.get_item("k").await.unwrap(), Some(json!({"a": "b"})));

        storage.remove_item("k").await.unwrap();
        assert_eq!(storage.get_item("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn file_storage_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let first = FileStorage::new(dir.path().join("state"));
        first.set_item("file-sync-cache", json!({"a.tsx": "x"})).await.unwrap();

        let second = FileStorage::new(dir.path().join("state"));
        assert_eq!(
            second.get_item("file-sync-cache").await.unwrap(),
            Some(json!({"a.tsx": "x"}))
        );

        second.remove_item("file-sync-cache").await.unwrap();
        second.remove_item("file-sync-cache").await.unwrap();
        assert_eq!(first.get_item("file-sync-cache").await.unwrap(), None);
    }

    #[tokio::test]
    async fn corrupt_file_is_a_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("k.json"), b"{not json").unwrap();

        let storage = FileStorage::new(dir.path());
        let err = storage.get_item("k").await.unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }
}
