//! Project-wide identifier map
//!
//! [`TemplateNodeMapper`] owns the mapping from identifier to
//! [`TemplateNode`]. Callers reach it only through accessors; the map itself
//! is never handed out.

use crate::indexer::{FileIndex, SourceIndexer};
use crate::IndexError;
use parking_lot::RwLock;
use sandbox_core::{Oid, SandboxPath, TemplateNode};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

/// What happened to one file during [`TemplateNodeMapper::process_file`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Extension not tracked
    Skipped,
    /// Content could not be read
    Unreadable,
    /// Source did not parse; previous entries kept
    ParseFailed(IndexError),
    /// Write-back of injected identifiers failed; previous entries kept
    WriteFailed,
    /// The mapper was cleared while the file was in flight
    Discarded,
    /// Entries for the file were replaced
    Indexed {
        /// Identifiers now attributed to the file
        oids: usize,
        /// Whether the file was rewritten
        rewritten: bool,
    },
}

#[derive(Debug, Default)]
struct MappingState {
    nodes: HashMap<Oid, TemplateNode>,
    files: HashMap<SandboxPath, HashSet<Oid>>,
}

impl MappingState {
    fn replace_file(&mut self, index: &FileIndex) {
        self.remove_file(&index.path);

        let mut owned = HashSet::with_capacity(index.nodes.len());
        for (oid, node) in &index.nodes {
            if let Some(previous) = self.nodes.get(oid) {
                tracing::warn!(
                    "Identifier {} moved from {} to {}",
                    oid,
                    previous.path,
                    index.path
                );
                if let Some(set) = self.files.get_mut(&previous.path) {
                    set.remove(oid);
                }
            }
            self.nodes.insert(oid.clone(), node.clone());
            owned.insert(oid.clone());
        }
        self.files.insert(index.path.clone(), owned);
    }

    fn remove_file(&mut self, path: &SandboxPath) -> usize {
        let Some(owned) = self.files.remove(path) else {
            return 0;
        };
        for oid in &owned {
            if self.nodes.get(oid).is_some_and(|n| &n.path == path) {
                self.nodes.remove(oid);
            }
        }
        owned.len()
    }
}

/// Maintains the identifier map for a whole project
#[derive(Debug)]
pub struct TemplateNodeMapper {
    indexer: SourceIndexer,
    tracked_extensions: Vec<String>,
    state: RwLock<MappingState>,
    epoch: AtomicU64,
}

impl TemplateNodeMapper {
    /// Create mapper indexing files with the given extensions
    #[must_use]
    pub fn new<S: Into<String>>(
        tracked_extensions: impl IntoIterator<Item = S>,
        cache_capacity: u64,
    ) -> Self {
        Self {
            indexer: SourceIndexer::new(cache_capacity),
            tracked_extensions: tracked_extensions.into_iter().map(Into::into).collect(),
            state: RwLock::new(MappingState::default()),
            epoch: AtomicU64::new(0),
        }
    }

    /// Whether `path` is indexed at all
    #[must_use]
    pub fn is_tracked(&self, path: &SandboxPath) -> bool {
        path.has_extension(&self.tracked_extensions)
    }

    /// Reindex one file
    ///
    /// `read` supplies the current text and `write` persists injected
    /// identifiers. Entries are only replaced once the rewritten text has
    /// been written, so the map never points into text that does not exist.
    /// Failures leave the previous entries for the file in place.
    pub async fn process_file<R, RF, W, WF>(
        &self,
        path: &SandboxPath,
        read: R,
        write: W,
    ) -> ProcessOutcome
    where
        R: FnOnce(SandboxPath) -> RF,
        RF: Future<Output = Option<String>>,
        W: FnOnce(SandboxPath, String) -> WF,
        WF: Future<Output = bool>,
    {
        if !self.is_tracked(path) {
            return ProcessOutcome::Skipped;
        }
        let epoch = self.epoch();

        let Some(content) = read(path.clone()).await else {
            tracing::error!("Failed to read {} for indexing", path);
            return ProcessOutcome::Unreadable;
        };

        let index = match self.indexer.index(path, &content).await {
            Ok(index) => index,
            Err(e) => {
                tracing::error!("Failed to parse {}: {}", path, e);
                return ProcessOutcome::ParseFailed(e);
            }
        };

        if let Some(rewritten) = &index.rewritten {
            if self.epoch() != epoch {
                return ProcessOutcome::Discarded;
            }
            tracing::info!(
                "Writing {} injected and {} repaired identifiers to {}",
                index.injected,
                index.replaced,
                path
            );
            if !write(path.clone(), rewritten.clone()).await {
                tracing::error!("Failed to write identifiers back to {}", path);
                return ProcessOutcome::WriteFailed;
            }
        }

        let mut state = self.state.write();
        if self.epoch() != epoch {
            return ProcessOutcome::Discarded;
        }
        state.replace_file(&index);
        tracing::debug!("Indexed {} ({} identifiers)", path, index.nodes.len());

        ProcessOutcome::Indexed {
            oids: index.nodes.len(),
            rewritten: index.is_modified(),
        }
    }

    /// Drop every entry attributed to `path`
    pub fn remove_file(&self, path: &SandboxPath) -> usize {
        self.state.write().remove_file(path)
    }

    /// Look up one identifier
    #[must_use]
    pub fn get_template_node(&self, oid: &str) -> Option<TemplateNode> {
        self.state.read().nodes.get(oid).cloned()
    }

    /// Current source of the element identified by `oid`
    ///
    /// Reads the file through `read` so the slice reflects the latest text.
    pub async fn get_code_block<R, RF>(&self, oid: &str, read: R) -> Option<String>
    where
        R: FnOnce(SandboxPath) -> RF,
        RF: Future<Output = Option<String>>,
    {
        let node = self.get_template_node(oid)?;
        let content = read(node.path.clone()).await?;
        let block = node.slice(&content);
        if block.is_none() {
            tracing::warn!("Stale position for {} in {}", oid, node.path);
        }
        block.map(str::to_owned)
    }

    /// Identifiers attributed to `path`
    #[must_use]
    pub fn oids_for_file(&self, path: &SandboxPath) -> Vec<Oid> {
        let state = self.state.read();
        let mut oids: Vec<Oid> = state
            .files
            .get(path)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        oids.sort();
        oids
    }

    /// Snapshot of every entry
    #[must_use]
    pub fn snapshot(&self) -> HashMap<Oid, TemplateNode> {
        self.state.read().nodes.clone()
    }

    /// Number of identifiers
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().nodes.len()
    }

    /// Whether the map is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.read().nodes.is_empty()
    }

    /// Drop every entry
    ///
    /// Passes already in flight finish but do not commit.
    pub fn clear(&self) {
        let mut state = self.state.write();
        self.epoch.fetch_add(1, Ordering::SeqCst);
        *state = MappingState::default();
        self.indexer.clear();
    }

    fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn mapper() -> TemplateNodeMapper {
        TemplateNodeMapper::new(["tsx", "jsx"], 64)
    }

    fn path(p: &str) -> SandboxPath {
        p.parse().unwrap()
    }

    async fn process(mapper: &TemplateNodeMapper, p: &str, content: &str) -> ProcessOutcome {
        let content = content.to_owned();
        mapper
            .process_file(
                &path(p),
                |_| async move { Some(content) },
                |_, _| async { true },
            )
            .await
    }

    #[tokio::test]
    async fn untracked_files_are_skipped() {
        let outcome = process(&mapper(), "styles.css", "body{}").await;
        assert_eq!(outcome, ProcessOutcome::Skipped);
    }

    #[tokio::test]
    async fn reindex_replaces_file_entries() {
        let mapper = mapper();
        process(&mapper, "a.tsx", r#"const A = () => <div data-oid="aaaaaaa" />;"#).await;
        process(&mapper, "a.tsx", r#"const A = () => <div data-oid="bbbbbbb" />;"#).await;

        assert!(mapper.get_template_node("aaaaaaa").is_none());
        assert!(mapper.get_template_node("bbbbbbb").is_some());
        assert_eq!(mapper.oids_for_file(&path("a.tsx")), vec![Oid::from("bbbbbbb")]);
    }

    #[tokio::test]
    async fn parse_failure_keeps_previous_entries() {
        let mapper = mapper();
        process(&mapper, "a.tsx", r#"const A = () => <div data-oid="aaaaaaa" />;"#).await;
        let outcome = process(&mapper, "a.tsx", "const A = () => <div").await;

        assert!(matches!(outcome, ProcessOutcome::ParseFailed(_)));
        assert!(mapper.get_template_node("aaaaaaa").is_some());
    }

    #[tokio::test]
    async fn failed_write_back_keeps_previous_entries() {
        let mapper = mapper();
        let outcome = mapper
            .process_file(
                &path("a.tsx"),
                |_| async { Some("const A = () => <div />;".to_owned()) },
                |_, _| async { false },
            )
            .await;

        assert_eq!(outcome, ProcessOutcome::WriteFailed);
        assert!(mapper.is_empty());
    }

    #[tokio::test]
    async fn cross_file_collision_goes_to_latest_file() {
        let mapper = mapper();
        process(&mapper, "a.tsx", r#"const A = () => <div data-oid="shared1" />;"#).await;
        process(&mapper, "b.tsx", r#"const B = () => <p data-oid="shared1" />;"#).await;

        let node = mapper.get_template_node("shared1").unwrap();
        assert_eq!(node.path, path("b.tsx"));
        assert!(mapper.oids_for_file(&path("a.tsx")).is_empty());

        mapper.remove_file(&path("a.tsx"));
        assert!(mapper.get_template_node("shared1").is_some());
    }

    #[tokio::test]
    async fn code_block_uses_current_content() {
        let mapper = mapper();
        let source = r#"const A = () => <div data-oid="aaaaaaa">x</div>;"#;
        process(&mapper, "a.tsx", source).await;

        let block = mapper
            .get_code_block("aaaaaaa", |_| async move { Some(source.to_owned()) })
            .await;
        assert_eq!(block.as_deref(), Some(r#"<div data-oid="aaaaaaa">x</div>"#));

        let missing = mapper.get_code_block("nothere", |_| async { None }).await;
        assert_eq!(missing, None);
    }

    #[tokio::test]
    async fn clear_discards_in_flight_pass() {
        let mapper = Arc::new(mapper());
        let (started_tx, started_rx) = tokio::sync::oneshot::channel::<()>();
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

        let task = {
            let mapper = Arc::clone(&mapper);
            tokio::spawn(async move {
                mapper
                    .process_file(
                        &path("a.tsx"),
                        |_| async move {
                            started_tx.send(()).ok();
                            release_rx.await.ok();
                            Some(r#"const A = () => <div data-oid="aaaaaaa" />;"#.to_owned())
                        },
                        |_, _| async { true },
                    )
                    .await
            })
        };

        started_rx.await.unwrap();
        mapper.clear();
        release_tx.send(()).unwrap();

        assert_eq!(task.await.unwrap(), ProcessOutcome::Discarded);
        assert!(mapper.is_empty());
    }
}
