//! Session lifecycle and metadata types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::identifiers::SessionId;

/// Coarse lifecycle stage of a support session
///
/// Transitions are monotonic: `form → waiting → connected → ended`, with
/// `ended` terminal. A session never re-enters `form` once it has an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStage {
    /// Visitor is still filling in the intake form; no session exists yet
    Form,
    /// Session created, waiting for a human agent to accept it
    Waiting,
    /// An agent is assigned and messages flow both ways
    Connected,
    /// Session closed; further sends are rejected
    Ended,
}

impl SessionStage {
    /// Whether the stage accepts outbound user messages
    #[must_use]
    pub const fn accepts_messages(self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Whether the stage is terminal
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Ended)
    }
}

impl std::fmt::Display for SessionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Form => "form",
            Self::Waiting => "waiting",
            Self::Connected => "connected",
            Self::Ended => "ended",
        };
        f.write_str(name)
    }
}

/// Where the session originated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OriginChannel {
    /// Started from the marketing site chat widget (intake form flow)
    Website,
    /// Started from an in-store kiosk (automatic handshake, no form)
    Store,
}

/// Visitor contact details captured by the intake form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInfo {
    /// Visitor name
    pub name: String,
    /// Contact email address
    pub email: String,
    /// Contact phone number, digits only after normalization
    pub phone: String,
}

/// Support agent assigned to a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentInfo {
    /// Backend agent identifier
    pub id: String,
    /// Display name shown in the conversation
    pub name: String,
}

/// Metadata for an established session
///
/// `agent` is populated only once a human joins, which also moves the stage
/// to `connected`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDetails {
    /// Server-assigned session id
    pub id: SessionId,
    /// Visitor contact details
    pub customer: CustomerInfo,
    /// Short topic line for the conversation
    pub subject: String,
    /// Assigned agent, once one has accepted the session
    #[serde(default)]
    pub agent: Option<AgentInfo>,
    /// When the backend created the session
    pub started_at: DateTime<Utc>,
    /// Channel the session originated from
    pub origin: OriginChannel,
}
