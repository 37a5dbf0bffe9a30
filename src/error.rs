//! Error types for the support chat client

use thiserror::Error;

use crate::intake::IntakeErrors;
use crate::types::identifiers::SessionId;
use crate::types::session::SessionStage;

/// Main error type for the support chat client
#[derive(Error, Debug)]
pub enum ChatError {
    /// Intake form failed validation; carries the field-level errors
    #[error("Intake validation failed ({} field(s))", .0.len())]
    Validation(IntakeErrors),

    /// Session-creation API call failed; the form may be resubmitted
    #[error("Session creation failed: {0}")]
    SessionCreation(String),

    /// REST collaborator returned a non-success status
    #[error("API error (status {status}): {message}")]
    Api {
        /// HTTP status code returned by the backend
        status: u16,
        /// Response body, when one was readable
        message: String,
    },

    /// HTTP request could not be completed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Connection error on the real-time channel
    #[error("Connection error: {0}")]
    Connection(String),

    /// Transport layer error
    #[error("Transport error: {0}")]
    Transport(String),

    /// WebSocket protocol error
    #[error("WebSocket error: {0}")]
    Socket(#[from] tokio_tungstenite::tungstenite::Error),

    /// JSON decode error on a wire frame or API response
    #[error("JSON decode error: {0}")]
    JsonDecode(#[from] serde_json::Error),

    /// Event parse error with optional raw payload
    #[error("Event parse error: {message}")]
    EventParse {
        /// Error message
        message: String,
        /// Raw event data that failed to parse
        data: Option<serde_json::Value>,
    },

    /// Operation requires a different session stage
    #[error("Invalid session stage: expected {expected}, session is {actual}")]
    InvalidStage {
        /// Stage the operation requires
        expected: SessionStage,
        /// Stage the session is actually in
        actual: SessionStage,
    },

    /// Session has been closed; no further messages are accepted
    #[error("Session {0} has ended")]
    SessionEnded(SessionId),

    /// Operation requires an established session
    #[error("No active session")]
    SessionNotStarted,

    /// Message content is empty after trimming
    #[error("Message content is empty")]
    EmptyMessage,

    /// The real-time link is down; the send was not attempted
    #[error("Transport is offline; message not sent")]
    NotConnected,

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for chat client operations
pub type Result<T> = std::result::Result<T, ChatError>;

impl ChatError {
    /// Create a session-creation error
    pub fn session_creation(msg: impl Into<String>) -> Self {
        Self::SessionCreation(msg.into())
    }

    /// Create an API error from a status code and response body
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a connection error
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create an event parse error
    pub fn event_parse(msg: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        Self::EventParse {
            message: msg.into(),
            data,
        }
    }

    /// Create an invalid-stage error
    #[must_use]
    pub fn invalid_stage(expected: SessionStage, actual: SessionStage) -> Self {
        Self::InvalidStage { expected, actual }
    }

    /// Whether the failed operation may simply be retried
    ///
    /// Covers transient network and backend failures; validation and
    /// state-machine errors are not retryable as-is.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::SessionCreation(_)
                | Self::Api { .. }
                | Self::Http(_)
                | Self::Connection(_)
                | Self::NotConnected
        )
    }
}
