//! Chat message types
//!
//! The authoritative message record as delivered by the backend, plus the
//! transient optimistic-send marker kept outside the message store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::identifiers::{MessageId, SessionId};

/// Who authored a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageSender {
    /// The visitor
    User,
    /// The assigned support agent
    Agent,
    /// Backend-generated notice (agent joined, chat closed, ...)
    System,
}

/// Identity attached to outbound events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SenderInfo {
    /// Role of the sender
    pub role: MessageSender,
    /// Display name, absent for anonymous visitors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl SenderInfo {
    /// Visitor identity with an optional display name
    pub fn user(name: Option<String>) -> Self {
        Self {
            role: MessageSender::User,
            name,
        }
    }
}

/// A chat message as delivered by the backend
///
/// Immutable once stored. Message order within a session is the arrival
/// order of authoritative events, not client send order. Fields the backend
/// may omit on malformed events fall back to defaults rather than failing
/// the whole frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Server-assigned id, unique within the session
    pub id: MessageId,
    /// Author role
    pub sender: MessageSender,
    /// Author display name; absent for visitor messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    /// Message text
    #[serde(default)]
    pub content: String,
    /// Server-side creation time; arrival time when the backend omits it
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    /// Back-reference to the owning session
    pub session_id: SessionId,
}

/// Optimistic marker for a message sent but not yet echoed by the server
///
/// Never inserted into the message store; the authoritative `new-message`
/// echo populates the store and clears the marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSend {
    /// Client-local id for correlating UI rows
    pub local_id: Uuid,
    /// Trimmed message text as sent
    pub content: String,
    /// When the send was issued
    pub queued_at: DateTime<Utc>,
}

impl PendingSend {
    /// Create a marker for freshly sent content
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            local_id: Uuid::new_v4(),
            content: content.into(),
            queued_at: Utc::now(),
        }
    }
}
