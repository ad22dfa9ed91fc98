//! Listener registry and topic matching.
//!
//! All domain events arrive over one wire subscription; filtering happens
//! here. The registry is shared between the read loop (dispatching) and the
//! caller API (registering/removing), so access goes through a mutex, but
//! handlers run outside the lock to keep registration non-blocking and to
//! allow a handler to remove itself.

// ============================================================================
// Imports
// ============================================================================

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::warn;

use crate::identifiers::SubscriptionId;

use super::envelope::EventEnvelope;

// ============================================================================
// Types
// ============================================================================

/// Listener callback invoked for each matching envelope.
pub(crate) type EventCallback = Arc<dyn Fn(&EventEnvelope) + Send + Sync>;

/// One registered listener.
struct ListenerEntry {
    /// Topic pattern the listener subscribed with.
    pattern: String,
    /// The callback.
    callback: EventCallback,
}

// ============================================================================
// ListenerRegistry
// ============================================================================

/// Registry of event listeners, keyed by subscription ID.
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    entries: Mutex<FxHashMap<SubscriptionId, ListenerEntry>>,
}

impl ListenerRegistry {
    /// Creates an empty registry.
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers a listener and returns its handle.
    pub(crate) fn insert(&self, pattern: String, callback: EventCallback) -> SubscriptionId {
        let id = SubscriptionId::next();
        self.entries
            .lock()
            .insert(id, ListenerEntry { pattern, callback });
        id
    }

    /// Removes a listener. Returns `false` if the handle was unknown.
    pub(crate) fn remove(&self, id: SubscriptionId) -> bool {
        self.entries.lock().remove(&id).is_some()
    }

    /// Drops every listener without invoking it. Returns how many were dropped.
    pub(crate) fn clear(&self) -> usize {
        let mut entries = self.entries.lock();
        let count = entries.len();
        entries.clear();
        count
    }

    /// Returns the number of registered listeners.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Dispatches an envelope to every matching listener.
    ///
    /// Best-effort: a panicking handler is caught and logged so it cannot
    /// kill the read loop or starve later frames.
    pub(crate) fn dispatch(&self, envelope: &EventEnvelope) {
        let matched: Vec<EventCallback> = {
            let entries = self.entries.lock();
            entries
                .values()
                .filter(|entry| topic_matches(&entry.pattern, &envelope.topic))
                .map(|entry| Arc::clone(&entry.callback))
                .collect()
        };

        for callback in matched {
            if catch_unwind(AssertUnwindSafe(|| callback(envelope))).is_err() {
                warn!(topic = %envelope.topic, "event listener panicked");
            }
        }
    }
}

// ============================================================================
// Topic Matching
// ============================================================================

/// Matches a listener pattern against an envelope topic.
///
/// Three forms: `*` matches everything, a trailing `*` matches by prefix,
/// anything else matches exactly.
pub(crate) fn topic_matches(pattern: &str, topic: &str) -> bool {
    if pattern == "*" {
        return true;
    }

    if let Some(prefix) = pattern.strip_suffix('*') {
        return topic.starts_with(prefix);
    }

    pattern == topic
}

// ============================================================================
// Tests
// ============================================================================
