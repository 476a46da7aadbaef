//! Index a single source file

use crate::cache::IndexCache;
use crate::error::IndexError;
use crate::language::SourceLanguage;
use crate::oids::assign_oids;
use crate::syntax;
use crate::template::build_template_map;
use sandbox_core::{ContentHash, Oid, SandboxPath, TemplateNode};
use std::collections::HashMap;
use std::sync::Arc;

/// Everything learned from indexing one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileIndex {
    /// File that was indexed
    pub path: SandboxPath,
    /// Template node per identifier, positions relative to the final text
    pub nodes: HashMap<Oid, TemplateNode>,
    /// New file text when identifiers had to be injected or repaired
    pub rewritten: Option<String>,
    /// Elements that received an identifier
    pub injected: usize,
    /// Elements whose identifier was replaced
    pub replaced: usize,
}

impl FileIndex {
    /// Whether the file has to be written back
    #[inline]
    #[must_use]
    pub fn is_modified(&self) -> bool {
        self.rewritten.is_some()
    }

    /// Identifiers found in the file
    #[must_use]
    pub fn oids(&self) -> Vec<Oid> {
        let mut oids: Vec<Oid> = self.nodes.keys().cloned().collect();
        oids.sort();
        oids
    }
}

/// Parse, assign identifiers and build template nodes
///
/// When identifiers are injected the rewritten text is parsed again, so
/// every position refers to the text that ends up on disk.
///
/// # Errors
///
/// Returns an error when the source does not parse cleanly; nothing is
/// rewritten in that case.
pub fn index_source(
    path: &SandboxPath,
    source: &str,
    language: SourceLanguage,
) -> Result<FileIndex, IndexError> {
    let tree = syntax::parse(source, language)?;
    let assignment = assign_oids(&tree, source);

    if !assignment.modified {
        return Ok(FileIndex {
            path: path.clone(),
            nodes: build_template_map(&tree, source, path),
            rewritten: None,
            injected: 0,
            replaced: 0,
        });
    }

    let tree = syntax::parse(&assignment.content, language)?;
    let nodes = build_template_map(&tree, &assignment.content, path);
    Ok(FileIndex {
        path: path.clone(),
        nodes,
        rewritten: Some(assignment.content),
        injected: assignment.injected,
        replaced: assignment.replaced,
    })
}

/// Cached front end to [`index_source`]
#[derive(Debug, Clone, Default)]
pub struct SourceIndexer {
    cache: IndexCache,
}

impl SourceIndexer {
    /// Create indexer with the given cache capacity
    #[must_use]
    pub fn new(cache_capacity: u64) -> Self {
        Self {
            cache: IndexCache::new(cache_capacity),
        }
    }

    /// Index `content` as the text of `path`
    ///
    /// # Errors
    ///
    /// Fails for unsupported extensions and sources that do not parse.
    pub async fn index(
        &self,
        path: &SandboxPath,
        content: &str,
    ) -> Result<Arc<FileIndex>, IndexError> {
        let language = SourceLanguage::from_path(path).ok_or_else(|| {
            IndexError::UnsupportedExtension(path.extension().unwrap_or_default().to_owned())
        })?;
        let key = ContentHash::compute_parts(&[path.as_str().as_bytes(), content.as_bytes()]);

        if let Some(cached) = self.cache.get(&key).await {
            tracing::trace!("Index cache hit for {} ({})", path, key.short());
            return Ok(cached);
        }

        let index = Arc::new(index_source(path, content, language)?);
        self.cache.insert(key, Arc::clone(&index)).await;
        Ok(index)
    }

    /// Drop every cached result
    pub fn clear(&self) {
        self.cache.invalidate_all();
    }

    /// Cache backing this indexer
    #[inline]
    #[must_use]
    pub fn cache(&self) -> &IndexCache {
        &self.cache
    }
}
