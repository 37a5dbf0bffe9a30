//! Ordered, append-only log of session messages
//!
//! Arrival order is preserved; duplicate ids (optimistic echo plus network
//! redelivery) collapse to the first-seen entry. Session end freezes writes
//! at the controller level, never by deleting entries here.

use std::collections::HashSet;

use crate::types::identifiers::MessageId;
use crate::types::messages::ChatMessage;

/// Deduplicated message log for one session
#[derive(Debug, Default)]
pub struct MessageStore {
    entries: Vec<ChatMessage>,
    seen: HashSet<MessageId>,
}

impl MessageStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a message in arrival order
    ///
    /// A message whose id is already present is a no-op. Returns whether the
    /// message was actually inserted.
    pub fn append(&mut self, message: ChatMessage) -> bool {
        if !self.seen.insert(message.id.clone()) {
            return false;
        }
        self.entries.push(message);
        true
    }

    /// Ordered read view over the stored messages
    ///
    /// Restartable: safe to call repeatedly, never mutates the store.
    pub fn list(&self) -> impl Iterator<Item = &ChatMessage> {
        self.entries.iter()
    }

    /// Bulk-seed from a history fetch, merging against anything already
    /// appended
    ///
    /// Returns the number of messages actually inserted.
    pub fn load_history(&mut self, messages: Vec<ChatMessage>) -> usize {
        let mut appended = 0;
        for message in messages {
            if self.append(message) {
                appended += 1;
            }
        }
        appended
    }

    /// Whether a message id has been stored
    #[must_use]
    pub fn contains(&self, id: &MessageId) -> bool {
        self.seen.contains(id)
    }

    /// Number of distinct messages stored
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no messages
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Owned copy of the log, for handing across a lock boundary
    #[must_use]
    pub fn snapshot(&self) -> Vec<ChatMessage> {
        self.entries.clone()
    }
}
