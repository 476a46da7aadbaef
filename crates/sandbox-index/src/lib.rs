//! Sandbox Index
//!
//! Keeps a live mapping from element identifiers embedded in TSX/JSX source
//! to the exact place each element lives.
//!
//! # Pipeline
//!
//! ```text
//! source ─► tree-sitter parse ─► assign / repair data-oid ─► rewritten source
//!                                        │
//!                                        ▼
//!                         TemplateNode per identifier ─► TemplateNodeMapper
//! ```
//!
//! # Example
//!
//! ```rust
//! use sandbox_index::{index_source, SourceLanguage};
//!
//! let path = "src/app/page.tsx".parse().unwrap();
//! let source = "export default function Home(){return <div>Hi</div>}";
//! let index = index_source(&path, source, SourceLanguage::Tsx).unwrap();
//!
//! assert_eq!(index.nodes.len(), 1);
//! assert!(index.rewritten.is_some());
//! ```

pub mod cache;
pub mod error;
pub mod indexer;
pub mod language;
pub mod mapper;
pub mod oids;
mod syntax;
pub mod template;

pub use cache::IndexCache;
pub use error::IndexError;
pub use indexer::{index_source, FileIndex, SourceIndexer};
pub use language::SourceLanguage;
pub use mapper::{ProcessOutcome, TemplateNodeMapper};
pub use oids::{assign_oids, OidAssignment};
pub use template::build_template_map;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
