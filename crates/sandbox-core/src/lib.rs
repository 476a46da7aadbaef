//! Sandbox Core
//!
//! Data model shared by the synchronization engine and the source indexer.
//!
//! # Core Concepts
//!
//! - [`SandboxPath`]: normalized, forward-slash, project-relative path
//! - [`FileEvent`]: structured change notification
//! - [`TemplateNode`]: source location and structural metadata for one element
//! - [`Oid`]: short random identifier embedded as a markup attribute
//! - [`ContentHash`]: Blake3 hash used for content addressing
//!
//! # Example
//!
//! ```rust
//! use sandbox_core::SandboxPath;
//!
//! let path = SandboxPath::normalize("/project/sandbox/src/app/page.tsx", "/project/sandbox");
//! assert_eq!(path.as_str(), "src/app/page.tsx");
//! assert_eq!(path.extension(), Some("tsx"));
//! ```

pub mod constants;
pub mod error;
pub mod event;
pub mod hash;
pub mod oid;
pub mod path;
pub mod template;

pub use error::{PathError, RemoteError, StorageError, SyncError};
pub use event::{FileEvent, FileEventType};
pub use hash::ContentHash;
pub use oid::Oid;
pub use path::SandboxPath;
pub use template::{CoreElementType, DynamicType, TemplateNode, TemplateTag, TextPosition};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with sandbox types
    pub use crate::constants::{IGNORED_DIRECTORIES, JSX_FILE_EXTENSIONS, OID_ATTRIBUTE};
    pub use crate::{
        CoreElementType, DynamicType, FileEvent, FileEventType, Oid, SandboxPath, SyncError,
        TemplateNode, TextPosition,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
