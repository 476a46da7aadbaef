//! Change event bus
//!
//! Typed and wildcard pub/sub for [`FileEvent`]s. One bus is created by the
//! composition root and shared by handle; cloning a [`FileEventBus`] clones
//! the handle, not the subscriber table.
//!
//! Delivery is synchronous: exact-type subscribers first, then wildcard
//! subscribers, each group in registration order. A subscriber that returns
//! an error or panics is reported to the error handler and delivery carries
//! on with the next one.

use parking_lot::RwLock;
use sandbox_core::{FileEvent, FileEventType};
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

type Callback = Arc<dyn Fn(&FileEvent) -> anyhow::Result<()> + Send + Sync>;
type ErrorHandler = Arc<dyn Fn(&anyhow::Error, &FileEvent) + Send + Sync>;

struct Inner {
    subscribers: RwLock<HashMap<FileEventType, Vec<(u64, Callback)>>>,
    error_handler: RwLock<ErrorHandler>,
    next_id: AtomicU64,
}

/// Shared handle to one event bus
#[derive(Clone)]
pub struct FileEventBus {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for FileEventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileEventBus")
            .field("subscribers", &self.subscriber_count(None))
            .finish()
    }
}

impl Default for FileEventBus {
    fn default() -> Self {
        Self::new()
    }
}

fn log_error(error: &anyhow::Error, event: &FileEvent) {
    tracing::error!("Error in {} event handler: {:#}", event.event_type, error);
}

impl FileEventBus {
    /// Create bus with the logging error handler
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                subscribers: RwLock::new(HashMap::new()),
                error_handler: RwLock::new(Arc::new(log_error)),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Register `callback` for one event type, or every type with
    /// [`FileEventType::All`]
    pub fn subscribe<F>(&self, event_type: FileEventType, callback: F) -> Subscription
    where
        F: Fn(&FileEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .subscribers
            .write()
            .entry(event_type)
            .or_default()
            .push((id, Arc::new(callback)));

        Subscription {
            bus: Arc::downgrade(&self.inner),
            event_type,
            id,
        }
    }

    /// Deliver `event` to its subscribers
    pub fn publish(&self, event: &FileEvent) {
        let callbacks: Vec<Callback> = {
            let subscribers = self.inner.subscribers.read();
            let exact = subscribers.get(&event.event_type).into_iter().flatten();
            let wildcard = if event.event_type == FileEventType::All {
                None
            } else {
                subscribers.get(&FileEventType::All)
            };
            exact
                .chain(wildcard.into_iter().flatten())
                .map(|(_, callback)| Arc::clone(callback))
                .collect()
        };

        for callback in callbacks {
            let result = match catch_unwind(AssertUnwindSafe(|| callback(event))) {
                Ok(result) => result,
                Err(panic) => Err(anyhow::anyhow!(
                    "subscriber panicked: {}",
                    panic_message(panic.as_ref())
                )),
            };
            if let Err(e) = result {
                let handler = Arc::clone(&*self.inner.error_handler.read());
                handler(&e, event);
            }
        }
    }

    /// Replace the handler that receives subscriber failures
    pub fn set_error_handler<F>(&self, handler: F)
    where
        F: Fn(&anyhow::Error, &FileEvent) + Send + Sync + 'static,
    {
        *self.inner.error_handler.write() = Arc::new(handler);
    }

    /// Remove subscribers of one type, or of every type when `None`
    pub fn clear_subscribers(&self, event_type: Option<FileEventType>) {
        let mut subscribers = self.inner.subscribers.write();
        match event_type {
            Some(event_type) => {
                subscribers.remove(&event_type);
            }
            None => subscribers.clear(),
        }
    }

    /// Subscribers of one type, or of every type when `None`
    #[must_use]
    pub fn subscriber_count(&self, event_type: Option<FileEventType>) -> usize {
        let subscribers = self.inner.subscribers.read();
        match event_type {
            Some(event_type) => subscribers.get(&event_type).map_or(0, Vec::len),
            None => subscribers.values().map(Vec::len).sum(),
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// Registration returned by [`FileEventBus::subscribe`]
///
/// Dropping it keeps the subscriber registered.
#[derive(Debug)]
pub struct Subscription {
    bus: Weak<Inner>,
    event_type: FileEventType,
    id: u64,
}

impl Subscription {
    /// Remove the subscriber
    pub fn unsubscribe(self) {
        let Some(bus) = self.bus.upgrade() else {
            return;
        };
        let mut subscribers = bus.subscribers.write();
        if let Some(list) = subscribers.get_mut(&self.event_type) {
            list.retain(|(id, _)| *id != self.id);
            if list.is_empty() {
                subscribers.remove(&self.event_type);
            }
        }
    }
}
