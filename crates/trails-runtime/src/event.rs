//! # Lifecycle Event Bus
//!
//! An ordered, listener-based publish/subscribe channel carrying lifecycle
//! phase events and pack milestone events.
//!
//! # Architecture Note
//! The runtime *owns* a bus instance instead of inheriting publish/subscribe
//! behavior onto its public surface. Everything else in the crate — phase
//! coordination, the barrier combinators, `start()`/`stop()` — is built on
//! this one primitive.
//!
//! **Delivery model**: events are not queued or replayed. A listener
//! registered after an event fired never observes it. Listeners run in
//! registration order, outside the bus lock, so a listener may itself emit
//! or register without deadlocking.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{trace, warn};

/// Handle identifying one registered listener, used for removal.
pub type ListenerId = u64;

/// Listener callback. Receives the emitted argument list by reference.
pub type Listener = Arc<dyn Fn(&[Value]) + Send + Sync>;

/// Default listener budget per event name, matching the classic
/// event-emitter default. Exceeding it is reported, not rejected.
pub const DEFAULT_MAX_LISTENERS: usize = 10;

struct Entry {
    id: ListenerId,
    once: bool,
    listener: Listener,
}

struct Inner {
    listeners: HashMap<String, Vec<Entry>>,
    next_id: ListenerId,
    max_listeners: usize,
}

/// The lifecycle event bus.
///
/// Cheap to clone; clones share the same listener table, the same way a
/// client handle shares its channel with the server side.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Mutex<Inner>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                listeners: HashMap::new(),
                next_id: 1,
                max_listeners: DEFAULT_MAX_LISTENERS,
            })),
        }
    }

    /// Registers a listener for `event`. Returns an id usable with
    /// [`EventBus::remove_listener`].
    pub fn on<F>(&self, event: &str, listener: F) -> ListenerId
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        self.register(event, false, Arc::new(listener))
    }

    /// Registers a one-shot listener, removed automatically after it fires.
    pub fn once<F>(&self, event: &str, listener: F) -> ListenerId
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        self.register(event, true, Arc::new(listener))
    }

    fn register(&self, event: &str, once: bool, listener: Listener) -> ListenerId {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id;
        inner.next_id += 1;
        let max = inner.max_listeners;
        let entries = inner.listeners.entry(event.to_string()).or_default();
        entries.push(Entry { id, once, listener });
        if entries.len() > max {
            warn!(event, count = entries.len(), max, "listener budget exceeded");
        }
        id
    }

    /// Removes one listener by event name and id. Removing an already-fired
    /// one-shot listener is a no-op.
    pub fn remove_listener(&self, event: &str, id: ListenerId) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(entries) = inner.listeners.get_mut(event) {
            entries.retain(|e| e.id != id);
            if entries.is_empty() {
                inner.listeners.remove(event);
            }
        }
    }

    /// Emits `event`, dispatching `args` to every registered listener in
    /// registration order. Returns the number of listeners invoked.
    ///
    /// Every emission is routed through a diagnostic trace before dispatch;
    /// this is an observability hook, not a behavioral gate.
    pub fn emit(&self, event: &str, args: Vec<Value>) -> usize {
        trace!(event, args = ?args, "emit");
        let batch: Vec<Listener> = {
            let mut inner = self.inner.lock().unwrap();
            match inner.listeners.get_mut(event) {
                Some(entries) => {
                    let batch = entries.iter().map(|e| e.listener.clone()).collect();
                    entries.retain(|e| !e.once);
                    if entries.is_empty() {
                        inner.listeners.remove(event);
                    }
                    batch
                }
                None => Vec::new(),
            }
        };
        for listener in &batch {
            listener(&args);
        }
        batch.len()
    }

    /// Number of listeners currently registered for `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .listeners
            .get(event)
            .map_or(0, Vec::len)
    }

    /// Applies the configured listener budget (`main.maxListeners`).
    pub fn set_max_listeners(&self, max: usize) {
        self.inner.lock().unwrap().max_listeners = max;
    }

    pub fn max_listeners(&self) -> usize {
        self.inner.lock().unwrap().max_listeners
    }
}

/// Scoped listener registration: the listener is removed when the guard
/// drops, so a waiter torn down mid-flight leaves nothing on the bus.
pub struct ListenerGuard {
    bus: EventBus,
    event: String,
    id: ListenerId,
}

impl ListenerGuard {
    pub fn new(bus: EventBus, event: impl Into<String>, id: ListenerId) -> Self {
        Self {
            bus,
            event: event.into(),
            id,
        }
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        self.bus.remove_listener(&self.event, self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn listeners_fire_in_registration_order() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second", "third"] {
            let seen = seen.clone();
            bus.on("evt", move |_| seen.lock().unwrap().push(tag));
        }
        bus.emit("evt", vec![]);
        assert_eq!(*seen.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn once_listener_fires_exactly_once() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        bus.once("evt", move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        bus.emit("evt", vec![json!(1)]);
        bus.emit("evt", vec![json!(2)]);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(bus.listener_count("evt"), 0);
    }

    #[test]
    fn no_replay_for_late_listeners() {
        let bus = EventBus::new();
        bus.emit("evt", vec![json!("early")]);
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        bus.on("evt", move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn removal_by_id() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let id = bus.on("evt", move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        bus.remove_listener("evt", id);
        bus.emit("evt", vec![]);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn listener_may_emit_without_deadlock() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        bus.on("second", move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        let chained = bus.clone();
        bus.on("first", move |_| {
            chained.emit("second", vec![]);
        });
        bus.emit("first", vec![]);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
