//! Type-keyed fan-out of inbound frames.
//!
//! # Responsibilities
//! - Keep one listener set per message type, plus the `*` wildcard set
//! - Parse frames and deliver them, dropping malformed ones
//!
//! # Design Decisions
//! - Each dispatch pass works on a snapshot of the listener sets, so a
//!   callback may add or remove listeners without affecting the current pass
//! - No lock is held while callbacks run
//! - A panicking callback is logged and skipped, the remaining ones still run

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;

use crate::observability::metrics;
use crate::realtime::message::InboundMessage;

/// Listener key receiving every message.
pub const WILDCARD: &str = "*";

pub type Callback = Arc<dyn Fn(&InboundMessage) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
pub struct Dispatcher {
    listeners: DashMap<String, Vec<(ListenerId, Callback)>>,
    next_id: AtomicU64,
}

impl Dispatcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register `callback` for messages of type `kind` (or [`WILDCARD`]).
    pub fn add_listener<F>(self: &Arc<Self>, kind: impl Into<String>, callback: F) -> Subscription
    where
        F: Fn(&InboundMessage) + Send + Sync + 'static,
    {
        let kind = kind.into();
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .entry(kind.clone())
            .or_default()
            .push((id, Arc::new(callback)));
        tracing::debug!(kind = %kind, "Listener added");

        Subscription {
            dispatcher: Arc::downgrade(self),
            kind,
            id,
        }
    }

    /// Returns true if the listener was registered.
    pub fn remove_listener(&self, kind: &str, id: ListenerId) -> bool {
        let mut removed = false;
        if let Some(mut entry) = self.listeners.get_mut(kind) {
            let before = entry.len();
            entry.retain(|(existing, _)| *existing != id);
            removed = entry.len() != before;
        }
        self.listeners.remove_if(kind, |_, set| set.is_empty());
        removed
    }

    pub fn clear(&self) {
        self.listeners.clear();
    }

    pub fn listener_count(&self, kind: &str) -> usize {
        self.listeners.get(kind).map(|set| set.len()).unwrap_or(0)
    }

    /// Parse a raw text frame and deliver it. Malformed frames are logged and
    /// dropped. Returns the number of callbacks invoked.
    pub fn dispatch_frame(&self, raw: &str) -> usize {
        match InboundMessage::parse(raw) {
            Ok(message) => {
                metrics::record_frame("dispatched");
                self.dispatch(&message)
            }
            Err(e) => {
                metrics::record_frame("malformed");
                tracing::warn!(error = %e, frame = %raw, "Dropping malformed frame");
                0
            }
        }
    }

    /// Deliver to the type's listeners, then to wildcard listeners.
    pub fn dispatch(&self, message: &InboundMessage) -> usize {
        let mut targets = match message.kind() {
            Some(kind) if kind != WILDCARD => self.snapshot(kind),
            _ => Vec::new(),
        };
        targets.extend(self.snapshot(WILDCARD));

        for callback in &targets {
            if catch_unwind(AssertUnwindSafe(|| callback(message))).is_err() {
                tracing::error!(kind = ?message.kind(), "Listener panicked");
            }
        }
        targets.len()
    }

    fn snapshot(&self, kind: &str) -> Vec<Callback> {
        self.listeners
            .get(kind)
            .map(|set| set.iter().map(|(_, cb)| Arc::clone(cb)).collect())
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("kinds", &self.listeners.len())
            .finish()
    }
}

/// Handle returned by [`Dispatcher::add_listener`].
///
/// Dropping it does not unsubscribe; call [`unsubscribe`](Self::unsubscribe).
#[derive(Debug, Clone)]
pub struct Subscription {
    dispatcher: Weak<Dispatcher>,
    kind: String,
    id: ListenerId,
}

impl Subscription {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn unsubscribe(self) -> bool {
        match self.dispatcher.upgrade() {
            Some(dispatcher) => dispatcher.remove_listener(&self.kind, self.id),
            None => false,
        }
    }
}
