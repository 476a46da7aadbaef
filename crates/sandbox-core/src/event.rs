//! Structured file-change notifications

use crate::path::SandboxPath;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Kind of change
///
/// `All` is only meaningful as a subscription key: subscribers registered
/// for it receive every published event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileEventType {
    /// File created
    #[serde(rename = "add")]
    Add,
    /// File contents changed
    #[serde(rename = "change")]
    Change,
    /// File deleted
    #[serde(rename = "remove")]
    Remove,
    /// Wildcard
    #[serde(rename = "*")]
    All,
}

impl FileEventType {
    /// Wire name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Change => "change",
            Self::Remove => "remove",
            Self::All => "*",
        }
    }
}

impl Display for FileEventType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One batch of change notifications
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEvent {
    /// Kind of change
    #[serde(rename = "type")]
    pub event_type: FileEventType,
    /// Affected paths, normalized
    pub paths: Vec<SandboxPath>,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl FileEvent {
    /// Create event stamped with the current time
    #[must_use]
    pub fn new(event_type: FileEventType, paths: Vec<SandboxPath>) -> Self {
        Self {
            event_type,
            paths,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Whether `path` is among the affected paths
    #[must_use]
    pub fn touches(&self, path: &SandboxPath) -> bool {
        self.paths.iter().any(|p| p == path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names() {
        let json = serde_json::to_string(&FileEventType::All).unwrap();
        assert_eq!(json, "\"*\"");
        let parsed: FileEventType = serde_json::from_str("\"change\"").unwrap();
        assert_eq!(parsed, FileEventType::Change);
    }

    #[test]
    fn event_serializes_type_field() {
        let event = FileEvent {
            event_type: FileEventType::Add,
            paths: vec!["src/a.tsx".parse().unwrap()],
            timestamp: 7,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "add");
        assert_eq!(value["paths"][0], "src/a.tsx");
    }

    #[test]
    fn new_event_is_timestamped() {
        let event = FileEvent::new(FileEventType::Remove, vec![]);
        assert!(event.timestamp > 0);
    }
}
