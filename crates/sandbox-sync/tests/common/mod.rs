//! Shared helpers for sandbox-sync integration tests

#![allow(dead_code)]

use sandbox_sync::{FileEventBus, MemoryStorage, SandboxManager, SyncConfig};
use sandbox_test_utils::{wait_until, MockSandbox, WAIT};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const PAGE: &str = "src/app/page.tsx";
pub const HOME: &str = "export default function Home(){return <div>Hi</div>}";

pub async fn manager() -> SandboxManager {
    SandboxManager::open(
        SyncConfig::default(),
        Arc::new(MemoryStorage::new()),
        FileEventBus::new(),
    )
    .await
}

pub async fn registered(sandbox: &Arc<MockSandbox>) -> SandboxManager {
    let manager = manager().await;
    manager.register(sandbox.clone());
    manager
}

pub async fn connected(sandbox: &Arc<MockSandbox>) -> SandboxManager {
    let manager = manager().await;
    manager.connect(sandbox.clone()).await;
    manager
}

/// Wait until every event emitted so far has been handled
///
/// Events are handled in order, so once a fresh sentinel file shows up in
/// the cache everything before it is done.
pub async fn settle(sandbox: &MockSandbox, manager: &SandboxManager) {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    let name = format!("sentinel-{}.txt", COUNTER.fetch_add(1, Ordering::SeqCst));

    sandbox.external_write(&name, "x");
    let seen = wait_until(
        || manager.list_all_files().iter().any(|p| p.as_str() == name),
        WAIT,
    )
    .await;
    assert!(seen, "watcher did not deliver {name}");
}
