//! Wire protocol for the real-time transport
//!
//! Both directions use one JSON frame shape, `{"event": ..., "payload": ...}`,
//! modeled as closed tagged unions so controller handling is exhaustive
//! rather than string-keyed.

use serde::{Deserialize, Serialize};

use crate::error::{ChatError, Result};

use super::identifiers::SessionId;
use super::messages::{ChatMessage, MessageSender, SenderInfo};
use super::session::AgentInfo;

/// Session status carried by `chat-status-updated`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatStatus {
    /// Session is queued for an agent
    Waiting,
    /// Session has an active agent
    Active,
    /// Session was closed by either party
    Closed,
    /// Status value this client version does not know; tolerated, never fatal
    #[serde(other)]
    Unknown,
}

/// Events pushed by the backend broker
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// A message was added to the session; echoes of our own sends included
    NewMessage(ChatMessage),

    /// A human agent accepted the session
    #[serde(rename_all = "camelCase")]
    AgentAssigned {
        /// The agent who joined
        agent_info: AgentInfo,
        /// Backend-generated notice announcing the join
        system_message: ChatMessage,
    },

    /// The other party started typing; expires client-side, no stop event
    #[serde(rename_all = "camelCase")]
    UserTyping {
        /// Who is typing
        sender_info: SenderInfo,
    },

    /// Session status changed server-side
    #[serde(rename_all = "camelCase")]
    ChatStatusUpdated {
        /// New session status
        status: ChatStatus,
        /// Optional notice accompanying the change
        #[serde(default)]
        system_message: Option<ChatMessage>,
    },
}

/// Events published by this client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Subscribe the connection to one session's events
    #[serde(rename_all = "camelCase")]
    JoinChat {
        /// Session to join
        session_id: SessionId,
    },

    /// Send a chat message; the server echoes it back as `new-message`
    #[serde(rename_all = "camelCase")]
    SendMessage {
        /// Target session
        session_id: SessionId,
        /// Message text
        content: String,
        /// Sender role, always `user` from this client
        #[serde(rename = "type")]
        sender: MessageSender,
        /// Sender identity for display on the agent side
        sender_info: SenderInfo,
    },

    /// Visitor started typing
    #[serde(rename_all = "camelCase")]
    TypingStart {
        /// Target session
        session_id: SessionId,
        /// Sender identity
        sender_info: SenderInfo,
    },

    /// Visitor stopped typing
    #[serde(rename_all = "camelCase")]
    TypingStop {
        /// Target session
        session_id: SessionId,
        /// Sender identity
        sender_info: SenderInfo,
    },
}

/// Parse a raw wire frame into a typed server event
///
/// # Errors
/// Returns [`ChatError::EventParse`] with the offending payload attached when
/// the frame does not match any known event shape.
pub fn parse_event(data: serde_json::Value) -> Result<ServerEvent> {
    serde_json::from_value(data.clone())
        .map_err(|e| ChatError::event_parse(format!("Failed to parse event: {e}"), Some(data)))
}
