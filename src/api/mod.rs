//! REST collaborators for session creation and message durability
//!
//! The real-time transport carries the conversation; these endpoints create
//! sessions, serve message history, and persist sends independently of the
//! push echo. The [`SessionApi`] trait is the seam test doubles plug into.

mod http;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::identifiers::SessionId;
use crate::types::messages::{ChatMessage, MessageSender};
use crate::types::session::{AgentInfo, CustomerInfo, OriginChannel};

pub use http::HttpSessionApi;

/// Request body for `POST /sessions`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    /// Originating channel
    #[serde(rename = "type")]
    pub origin: OriginChannel,
    /// Visitor contact details
    pub customer: CustomerInfo,
    /// Short topic line
    pub subject: String,
    /// Opening message from the intake form, when there is one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_message: Option<String>,
}

/// Response body for `POST /sessions`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    /// Server-assigned session id
    pub session_id: SessionId,
    /// Agent already assigned at creation, if any
    #[serde(default)]
    pub agent: Option<AgentInfo>,
    /// Session creation time
    pub start_time: DateTime<Utc>,
}

/// Request body for `POST /sessions/{id}/messages`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistMessageRequest {
    /// Message text
    pub content: String,
    /// Sender role
    #[serde(rename = "type")]
    pub sender: MessageSender,
}

/// REST surface consumed by the chat session controller
pub trait SessionApi: Send + Sync + 'static {
    /// Create a support session
    ///
    /// # Errors
    /// Returns error if the request fails; the caller may retry with the
    /// same intake data
    fn create_session(
        &self,
        request: CreateSessionRequest,
    ) -> impl std::future::Future<Output = Result<CreateSessionResponse>> + Send;

    /// Fetch the ordered message history for a session
    ///
    /// # Errors
    /// Returns error if the request fails
    fn fetch_messages(
        &self,
        session_id: &SessionId,
    ) -> impl std::future::Future<Output = Result<Vec<ChatMessage>>> + Send;

    /// Persist a message for durability, independent of the real-time echo
    ///
    /// # Errors
    /// Returns error if the request fails
    fn persist_message(
        &self,
        session_id: &SessionId,
        request: PersistMessageRequest,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Ask the backend to close a session
    ///
    /// The session stage only changes when the resulting
    /// `chat-status-updated` event is pushed back, keeping client and server
    /// state consistent.
    ///
    /// # Errors
    /// Returns error if the request fails
    fn close_session(
        &self,
        session_id: &SessionId,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}
