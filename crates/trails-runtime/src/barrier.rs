//! # Barrier Combinators
//!
//! Composes sets of bus events into single deferred-completion signals:
//! [`EventBus::once_any`] races a set of events ("any of"), and
//! [`EventBus::after`] waits for a sequence of elements ("all of"), where an
//! element may itself be an "any of" group.
//!
//! # Architecture Note
//! A combinator call is ephemeral: it registers its own listeners, resolves
//! through a `oneshot` channel, and removes every listener it registered —
//! including ones that never fired — the moment it settles. Dropping an
//! unsettled signal unregisters them too, so an aborted waiter leaves no
//! listener behind. Repeated calls therefore never accumulate listeners on
//! the bus.
//!
//! Both combinators also accept an optional callback invoked exactly once
//! with the same payload the returned signal settles with, for callers that
//! prefer a callback over awaiting the future.

use crate::error::RuntimeError;
use crate::event::{EventBus, ListenerId};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::sync::oneshot;

type Cleanup = Box<dyn FnOnce() + Send>;

/// A deferred-completion signal that settles exactly once.
///
/// Resolves with the captured payload, or with
/// [`RuntimeError::BarrierDropped`] when the emitting side was torn down
/// before the awaited event ever fired. Dropping the signal runs its
/// cleanup, unregistering any bus listeners that have not fired.
pub struct Signal<T> {
    rx: oneshot::Receiver<T>,
    cleanup: Option<Cleanup>,
}

impl<T> Signal<T> {
    fn new(rx: oneshot::Receiver<T>, cleanup: Cleanup) -> Self {
        Self {
            rx,
            cleanup: Some(cleanup),
        }
    }

    fn settled(value: T) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(value);
        Self { rx, cleanup: None }
    }
}

impl<T> Drop for Signal<T> {
    fn drop(&mut self) {
        if let Some(cleanup) = self.cleanup.take() {
            cleanup();
        }
    }
}

impl<T> Future for Signal<T> {
    type Output = Result<T, RuntimeError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().rx)
            .poll(cx)
            .map(|r| r.map_err(|_| RuntimeError::BarrierDropped))
    }
}

/// One element of an [`EventBus::after`] wait: a single event name, or a
/// nested "any one of these" group.
#[derive(Clone, Debug)]
pub enum EventSet {
    One(String),
    Any(Vec<String>),
}

impl EventSet {
    pub fn one(event: impl Into<String>) -> Self {
        EventSet::One(event.into())
    }

    pub fn any<I, S>(events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        EventSet::Any(events.into_iter().map(Into::into).collect())
    }
}

impl From<&str> for EventSet {
    fn from(event: &str) -> Self {
        EventSet::One(event.to_string())
    }
}

type Handler = Box<dyn FnOnce(&[Value]) + Send>;

/// Shared race state for one `once_any` call. The winner settles the signal
/// and unregisters every listener the call installed.
struct Race {
    settled: bool,
    tx: Option<oneshot::Sender<Vec<Value>>>,
    handler: Option<Handler>,
    ids: Vec<(String, ListenerId)>,
}

impl EventBus {
    /// Settles with the argument list of whichever named event fires first.
    ///
    /// Subsequent emissions of the other candidates have no effect on this
    /// call and leave no live listener behind.
    pub fn once_any(&self, events: &[&str]) -> Signal<Vec<Value>> {
        self.once_any_inner(events, None)
    }

    /// Like [`EventBus::once_any`], additionally invoking `handler` exactly
    /// once with the winning payload. The handler runs for side effect; the
    /// signal still resolves with the original event arguments.
    pub fn once_any_with<F>(&self, events: &[&str], handler: F) -> Signal<Vec<Value>>
    where
        F: FnOnce(&[Value]) + Send + 'static,
    {
        self.once_any_inner(events, Some(Box::new(handler)))
    }

    fn once_any_inner(&self, events: &[&str], handler: Option<Handler>) -> Signal<Vec<Value>> {
        if events.is_empty() {
            if let Some(handler) = handler {
                handler(&[]);
            }
            return Signal::settled(Vec::new());
        }
        let (tx, rx) = oneshot::channel();

        let race = Arc::new(Mutex::new(Race {
            settled: false,
            tx: Some(tx),
            handler,
            ids: Vec::with_capacity(events.len()),
        }));

        // Hold the race lock across registration so a candidate firing
        // mid-registration blocks until the full id list is known.
        let mut guard = race.lock().unwrap();
        for event in events {
            let race = Arc::clone(&race);
            let bus = self.clone();
            let id = self.on(event, move |args| {
                let mut state = race.lock().unwrap();
                if state.settled {
                    return;
                }
                state.settled = true;
                if let Some(handler) = state.handler.take() {
                    handler(args);
                }
                if let Some(tx) = state.tx.take() {
                    let _ = tx.send(args.to_vec());
                }
                let ids = std::mem::take(&mut state.ids);
                drop(state);
                for (event, id) in ids {
                    bus.remove_listener(&event, id);
                }
            });
            guard.ids.push((event.to_string(), id));
        }
        drop(guard);

        // Unregisters whatever is still listed; the winner empties the list
        // on settlement, making a post-settlement drop a no-op.
        let cleanup = {
            let race = Arc::clone(&race);
            let bus = self.clone();
            Box::new(move || {
                let ids = std::mem::take(&mut race.lock().unwrap().ids);
                for (event, id) in ids {
                    bus.remove_listener(&event, id);
                }
            })
        };
        Signal::new(rx, cleanup)
    }

    /// Settles once every element of `sets` has fired, resolving with each
    /// element's captured arguments in **input order**, not firing order.
    /// Nested [`EventSet::Any`] groups settle on their first member.
    ///
    /// An empty input settles immediately with an empty payload.
    pub fn after(&self, sets: Vec<EventSet>) -> Barrier {
        self.after_inner(sets, None)
    }

    /// Like [`EventBus::after`], additionally invoking `handler` exactly once
    /// with the ordered payload list, before the barrier settles.
    pub fn after_with<F>(&self, sets: Vec<EventSet>, handler: F) -> Barrier
    where
        F: FnOnce(&[Vec<Value>]) + Send + 'static,
    {
        self.after_inner(sets, Some(Box::new(handler)))
    }

    fn after_inner(&self, sets: Vec<EventSet>, handler: Option<AfterHandler>) -> Barrier {
        // Register every element's listeners up front; an element firing
        // before the barrier is first polled is still captured.
        let waits = sets
            .iter()
            .map(|set| match set {
                EventSet::One(event) => self.once_any(&[event.as_str()]),
                EventSet::Any(events) => {
                    let refs: Vec<&str> = events.iter().map(String::as_str).collect();
                    self.once_any(&refs)
                }
            })
            .collect::<Vec<_>>();
        Barrier {
            waits,
            captured: Vec::with_capacity(sets.len()),
            handler,
        }
    }
}

type AfterHandler = Box<dyn FnOnce(&[Vec<Value>]) + Send>;

/// The "all of" deferred-completion signal returned by [`EventBus::after`].
pub struct Barrier {
    waits: Vec<Signal<Vec<Value>>>,
    captured: Vec<Vec<Value>>,
    handler: Option<AfterHandler>,
}

impl Future for Barrier {
    type Output = Result<Vec<Vec<Value>>, RuntimeError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        while this.captured.len() < this.waits.len() {
            let next = this.captured.len();
            match Pin::new(&mut this.waits[next]).poll(cx) {
                Poll::Ready(Ok(args)) => this.captured.push(args),
                Poll::Ready(Err(e)) => return Poll::Ready(Err(e)),
                Poll::Pending => return Poll::Pending,
            }
        }
        if let Some(handler) = this.handler.take() {
            handler(&this.captured);
        }
        Poll::Ready(Ok(std::mem::take(&mut this.captured)))
    }
}
