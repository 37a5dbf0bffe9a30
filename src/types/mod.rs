//! Type definitions for the support chat client
//!
//! Organized into logical submodules:
//!
//! - [`identifiers`] - Type-safe ID wrappers (`SessionId`, `MessageId`)
//! - [`session`] - Session lifecycle stages and metadata
//! - [`messages`] - Chat message and sender types
//! - [`events`] - Closed wire-protocol event unions
//! - [`options`] - Client configuration options

pub mod events;
pub mod identifiers;
pub mod messages;
pub mod options;
pub mod session;

// Re-export commonly used types
pub use events::{ChatStatus, ClientEvent, ServerEvent, parse_event};
pub use identifiers::{MessageId, SessionId};
pub use messages::{ChatMessage, MessageSender, PendingSend, SenderInfo};
pub use options::{ChatClientOptions, ChatClientOptionsBuilder};
pub use session::{AgentInfo, CustomerInfo, OriginChannel, SessionDetails, SessionStage};
