//! Manager surface without a running watch

mod common;

use common::{manager, registered, HOME, PAGE};
use pretty_assertions::assert_eq;
use sandbox_core::SandboxPath;
use sandbox_sync::{FileEventBus, FileStorage, SandboxManager, SyncConfig};
use sandbox_test_utils::MockSandbox;
use std::sync::Arc;

fn project() -> Arc<MockSandbox> {
    MockSandbox::new()
        .with_file("README.md", "# readme")
        .with_file("node_modules/react/index.js", "module.exports = {}")
        .with_file("src/app/page.tsx", HOME)
        .with_file("src/lib/util.ts", "export const x = 1;")
        .with_file("src/styles.css", "body {}")
        .with_file("public/logo.svg", "<svg/>")
        .into_arc()
}

fn strings(paths: Vec<SandboxPath>) -> Vec<String> {
    paths.into_iter().map(SandboxPath::into_string).collect()
}

#[tokio::test]
async fn recursive_listing_is_depth_first_and_filtered() {
    let manager = registered(&project()).await;
    let config = SyncConfig::default();

    let files = manager
        .list_files_recursively("./", &config.ignored_directories, &config.scan_extensions)
        .await;

    assert_eq!(
        strings(files),
        vec!["src/app/page.tsx", "src/lib/util.ts", "src/styles.css"]
    );
}

#[tokio::test]
async fn recursive_listing_without_filters() {
    let manager = registered(&project()).await;
    let none: &[&str] = &[];

    let files = manager.list_files_recursively("src/lib", none, none).await;

    assert_eq!(strings(files), vec!["src/lib/util.ts"]);
}

#[tokio::test]
async fn single_level_listing() {
    let manager = registered(&project()).await;

    let entries = manager.list_files("src").await.unwrap();
    let names: Vec<(&str, bool)> = entries
        .iter()
        .map(|e| (e.name.as_str(), e.is_directory()))
        .collect();

    assert_eq!(names, vec![("app", true), ("lib", true), ("styles.css", false)]);
    assert!(manager.list_files("missing").await.is_none());
}

#[tokio::test]
async fn batch_read_skips_missing_files() {
    let manager = registered(&project()).await;

    let files = manager
        .read_files(&["src/styles.css", "src/missing.tsx", "README.md"])
        .await;

    assert_eq!(files.len(), 2);
    assert_eq!(
        files.get("src/styles.css").map(String::as_str),
        Some("body {}")
    );
}

#[tokio::test]
async fn binary_files_bypass_the_cache() {
    let sandbox = project();
    let manager = registered(&sandbox).await;
    let bytes = [0x89, b'P', b'N', b'G', 0, 1, 2];

    assert!(manager.write_binary_file("public/logo.png", &bytes).await);
    assert_eq!(
        manager.read_binary_file("public/logo.png").await.as_deref(),
        Some(&bytes[..])
    );
    assert!(manager.list_all_files().is_empty());

    sandbox.set_fail_writes(true);
    assert!(!manager.write_binary_file("public/logo.png", &bytes).await);
}

#[tokio::test]
async fn without_a_session_everything_is_benign() {
    let manager = manager().await;

    assert_eq!(manager.read_file(PAGE).await, None);
    assert!(!manager.write_file(PAGE, "x").await);
    assert_eq!(manager.read_binary_file("a.png").await, None);
    assert!(!manager.write_binary_file("a.png", b"x").await);
    assert!(manager.list_files("./").await.is_none());
    assert_eq!(manager.index().await, 0);
    assert!(!manager.watch_files().await);
    assert_eq!(manager.get_code_block("nothing").await, None);
}

#[tokio::test]
async fn paths_outside_the_root_are_rejected() {
    let sandbox = project();
    let manager = registered(&sandbox).await;

    assert_eq!(manager.read_file("/etc/passwd").await, None);
    assert!(!manager.write_file("../escape.txt", "x").await);
    assert!(sandbox.reads().is_empty());
    assert!(sandbox.writes().is_empty());
}

#[tokio::test]
async fn failed_reads_leave_the_cache_empty() {
    let sandbox = project();
    let manager = registered(&sandbox).await;
    sandbox.set_fail_reads(true);

    assert_eq!(manager.read_file(PAGE).await, None);
    assert!(manager.list_all_files().is_empty());

    sandbox.set_fail_reads(false);
    assert_eq!(manager.read_file(PAGE).await.as_deref(), Some(HOME));
}

#[tokio::test]
async fn cache_snapshot_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(FileStorage::new(dir.path()));
    let sandbox = project();

    {
        let manager =
            SandboxManager::open(SyncConfig::default(), storage.clone(), FileEventBus::new()).await;
        manager.register(sandbox.clone());
        manager.read_file("src/styles.css").await;
    }

    let manager = SandboxManager::open(SyncConfig::default(), storage, FileEventBus::new()).await;
    assert_eq!(manager.read_file("src/styles.css").await.as_deref(), Some("body {}"));
    assert_eq!(sandbox.read_count("src/styles.css"), 1);
}

#[tokio::test]
async fn unknown_identifiers_have_no_code_block() {
    let manager = registered(&project()).await;
    manager.process_file_for_mapping(PAGE).await;

    assert!(manager.get_template_node("zzzzzzz").is_none());
    assert_eq!(manager.get_code_block("zzzzzzz").await, None);
}
