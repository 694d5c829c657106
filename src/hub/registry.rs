//! Listener registry: event kind -> ordered listeners.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};

use super::event::{EventKind, HubEvent};

/// Listener callback.
pub type Listener = Arc<dyn Fn(&HubEvent) + Send + Sync>;

/// Handle identifying one registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

struct Entry {
    id: ListenerId,
    /// Cleared on unsubscribe so an in-flight dispatch skips the listener.
    active: Arc<AtomicBool>,
    callback: Listener,
}

/// Registered listeners, grouped by [`EventKind`], in registration order.
///
/// Dispatch snapshots the listener list and releases the lock before calling
/// anything, so listeners may subscribe or unsubscribe from inside a callback.
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: RwLock<HashMap<EventKind, Vec<Entry>>>,
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let listeners = self.listeners.read().unwrap_or_else(|e| e.into_inner());
        let counts: HashMap<_, _> = listeners.iter().map(|(k, v)| (*k, v.len())).collect();
        f.debug_struct("ListenerRegistry").field("listeners", &counts).finish()
    }
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, kind: EventKind, callback: Listener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut listeners = self.listeners.write().unwrap_or_else(|e| e.into_inner());
        listeners.entry(kind).or_default().push(Entry {
            id,
            active: Arc::new(AtomicBool::new(true)),
            callback,
        });
        id
    }

    /// Remove a listener. Returns `false` (and does nothing) if it was not
    /// registered under `kind`.
    pub fn remove(&self, kind: EventKind, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(|e| e.into_inner());
        let Some(entries) = listeners.get_mut(&kind) else {
            return false;
        };
        let Some(pos) = entries.iter().position(|e| e.id == id) else {
            return false;
        };
        let entry = entries.remove(pos);
        entry.active.store(false, Ordering::SeqCst);
        if entries.is_empty() {
            listeners.remove(&kind);
        }
        true
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        let listeners = self.listeners.read().unwrap_or_else(|e| e.into_inner());
        listeners.get(&kind).map_or(0, Vec::len)
    }

    /// Deliver `event` to every listener of its kind.
    ///
    /// `is_current` is checked before each call; once it returns `false` the
    /// remaining listeners are skipped. A panicking listener is logged and
    /// does not stop delivery to the others. Returns the number of listeners
    /// that ran to completion.
    pub fn dispatch(&self, event: &HubEvent, is_current: &dyn Fn() -> bool) -> usize {
        let kind = event.kind();
        let snapshot: Vec<(ListenerId, Arc<AtomicBool>, Listener)> = {
            let listeners = self.listeners.read().unwrap_or_else(|e| e.into_inner());
            match listeners.get(&kind) {
                Some(entries) => entries
                    .iter()
                    .map(|e| (e.id, e.active.clone(), e.callback.clone()))
                    .collect(),
                None => return 0,
            }
        };

        let mut delivered = 0;
        for (id, active, callback) in snapshot {
            if !is_current() {
                break;
            }
            if !active.load(Ordering::SeqCst) {
                continue;
            }
            match catch_unwind(AssertUnwindSafe(|| callback(event))) {
                Ok(()) => delivered += 1,
                Err(panic) => {
                    let detail = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "non-string panic payload".to_string());
                    log::error!(
                        "[HUB] Listener {:?} for '{}' panicked: {}",
                        id,
                        kind,
                        detail
                    );
                },
            }
        }
        delivered
    }
}

/// Registration guard returned by [`EventHub::subscribe`](super::EventHub::subscribe).
///
/// Dropping the guard unsubscribes the listener, which ties a listener's
/// lifetime to whatever component owns the guard. Call [`detach`](Self::detach)
/// to keep the listener for the lifetime of the hub instead.
#[must_use = "dropping a Subscription immediately unsubscribes the listener"]
pub struct Subscription {
    kind: EventKind,
    id: ListenerId,
    registry: Weak<ListenerRegistry>,
    armed: bool,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("kind", &self.kind)
            .field("id", &self.id)
            .field("armed", &self.armed)
            .finish()
    }
}

impl Subscription {
    pub(crate) fn new(kind: EventKind, id: ListenerId, registry: &Arc<ListenerRegistry>) -> Self {
        Self {
            kind,
            id,
            registry: Arc::downgrade(registry),
            armed: true,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Unsubscribe now.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    /// Keep the listener registered after the guard is gone. The returned id
    /// can still be passed to `EventHub::unsubscribe`.
    pub fn detach(mut self) -> ListenerId {
        self.armed = false;
        self.id
    }

    fn release(&mut self) {
        if !self.armed {
            return;
        }
        self.armed = false;
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.kind, self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}
