//! Sandbox Sync
//!
//! Keeps a local cache of a remote sandbox's source files in sync in both
//! directions and maintains the identifier map built by `sandbox-index`.
//!
//! # Architecture
//!
//! ```text
//! external edit ─► SandboxFs::watch ─► FileWatcher ─► FileEventBus ─► subscribers
//!                                          │
//!                                          ▼
//!                              SandboxManager::handle_file_event
//!                               (SelfWriteSuppressor, LocalCache, mapper)
//!
//! editor write ─► SandboxManager::write_file ─► mark ─► SandboxFs write ─► LocalCache
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use sandbox_sync::{FileEventBus, MemoryStorage, SandboxManager, SyncConfig};
//! use std::sync::Arc;
//!
//! # async fn run(session: Arc<dyn sandbox_sync::SandboxFs>) {
//! let manager = SandboxManager::open(
//!     SyncConfig::default(),
//!     Arc::new(MemoryStorage::new()),
//!     FileEventBus::new(),
//! )
//! .await;
//!
//! manager.connect(session).await;
//! let page = manager.read_file("src/app/page.tsx").await;
//! # }
//! ```

pub mod bus;
pub mod cache;
pub mod config;
pub mod manager;
pub mod remote;
pub mod storage;
pub mod suppressor;
pub mod watcher;

pub use bus::{FileEventBus, Subscription};
pub use cache::LocalCache;
pub use config::{ConfigError, SyncConfig};
pub use manager::SandboxManager;
pub use remote::{DirEntry, EntryKind, RemoteWatch, SandboxFs, WatchEvent, WatchHandle, WatchOptions};
pub use storage::{DurableStorage, FileStorage, MemoryStorage};
pub use suppressor::SelfWriteSuppressor;
pub use watcher::{ChangeHandler, FileWatcher};

pub use sandbox_index::ProcessOutcome;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving the engine
    pub use crate::{
        DirEntry, DurableStorage, FileEventBus, SandboxFs, SandboxManager, SyncConfig,
    };
    pub use sandbox_core::prelude::*;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
