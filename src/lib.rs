//! # PharmaDesk Support Chat Client
//!
//! Client SDK for the live support chat subsystem of the PharmaDesk
//! pharmacy platform. It implements the session lifecycle state machine
//! (`form → waiting → connected → ended`), the real-time transport contract,
//! the message/typing protocol, and an append-only deduplicated message
//! store. The HTTP session APIs and the real-time broker are external
//! collaborators consumed through the [`SessionApi`] and [`Transport`]
//! traits.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pharmadesk_chat::{
//!     ChatClientOptions, ChatController, ChatUpdate, HttpSessionApi, IntakeForm,
//!     SocketConfig, SocketTransport,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = SocketTransport::new(SocketConfig::new("wss://chat.pharmadesk.example/ws"));
//!     let api = HttpSessionApi::new("https://chat.pharmadesk.example/api");
//!     let mut controller = ChatController::new(transport, api, ChatClientOptions::default());
//!
//!     let mut updates = controller.subscribe();
//!
//!     let form = IntakeForm {
//!         name: "Dana Melton".to_string(),
//!         email: "dana@example.com".to_string(),
//!         phone: "(555) 010-7788".to_string(),
//!         message: "My refill still shows pending".to_string(),
//!     };
//!     controller.submit_intake(form, "Refill status").await?;
//!
//!     while let Ok(update) = updates.recv().await {
//!         match update {
//!             ChatUpdate::StageChanged(stage) => log::info!("stage: {stage}"),
//!             ChatUpdate::MessageAppended(message) => log::info!("{}", message.content),
//!             _ => {}
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`types`]: Core type definitions, ids, wire events, and options
//! - [`transport`]: Real-time channel abstraction and the WebSocket adapter
//! - [`api`]: REST collaborators (session creation, history, durability)
//! - [`store`]: Ordered, deduplicated message log
//! - [`intake`]: Intake form validation
//! - [`session`]: The `ChatController` state machine and background loop
//! - [`error`]: Error types and handling
//!
//! ## Behavior Notes
//!
//! - Messages render in arrival order, which under concurrent sends is not
//!   client send order; duplicate deliveries collapse by message id.
//! - Sends are optimistic in the UI sense only: the input can clear
//!   immediately, but nothing enters the store until the server echoes the
//!   message back with its id.
//! - A transport drop never changes the session stage; the adapter
//!   reconnects with backoff, re-joins the session, and the controller
//!   backfills missed messages from history.
//! - Sends attempted while the link is down are rejected visibly, never
//!   queued silently.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod error;
pub mod intake;
pub mod session;
pub mod store;
pub mod transport;
pub mod types;

// Re-export commonly used types for a flat public API
pub use api::{
    CreateSessionRequest, CreateSessionResponse, HttpSessionApi, PersistMessageRequest, SessionApi,
};
pub use error::{ChatError, Result};
pub use intake::{IntakeErrors, IntakeField, IntakeForm, normalize_phone, validate_intake};
pub use session::{ChatController, ChatUpdate};
pub use store::MessageStore;
pub use transport::{ConnectionState, SocketConfig, SocketTransport, Transport};
pub use types::events::{ChatStatus, ClientEvent, ServerEvent, parse_event};
pub use types::identifiers::{MessageId, SessionId};
pub use types::messages::{ChatMessage, MessageSender, PendingSend, SenderInfo};
pub use types::options::{ChatClientOptions, ChatClientOptionsBuilder};
pub use types::session::{AgentInfo, CustomerInfo, OriginChannel, SessionDetails, SessionStage};

/// Version of the client crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
