//! Shared notification slot for user-facing messages.
//!
//! Error translation and session expiry publish human-readable messages
//! here; observing layers read the slot when they choose to. The slot is
//! last-write-wins with no queuing.

use std::sync::{Arc, RwLock};

/// A cheaply clonable, process-wide notification slot.
///
/// All clones share the same slot. Publishing replaces any previous
/// message; reading never blocks publishers for long.
#[derive(Debug, Clone, Default)]
pub struct MessageSink {
    slot: Arc<RwLock<Option<String>>>,
}

impl MessageSink {
    /// Create a new, empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a message, replacing any previous one.
    pub fn publish(&self, message: impl Into<String>) {
        *self.slot.write().unwrap() = Some(message.into());
    }

    /// Return a copy of the last published message, if any.
    #[must_use]
    pub fn last(&self) -> Option<String> {
        self.slot.read().unwrap().clone()
    }

    /// Take the last published message, leaving the slot empty.
    #[must_use]
    pub fn take(&self) -> Option<String> {
        self.slot.write().unwrap().take()
    }

    /// Clear the slot.
    pub fn clear(&self) {
        *self.slot.write().unwrap() = None;
    }
}
