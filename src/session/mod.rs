//! Chat session controller
//!
//! Owns the session state machine (`form → waiting → connected → ended`),
//! the message store, and the session metadata, and mediates between the
//! real-time transport and the REST collaborators.
//!
//! # Module Structure
//!
//! - `controller` - Public `ChatController` API
//! - `commands` - Command protocol for the background loop
//! - `state` - Shared session state
//! - `event_loop` - Background task driving transport events and timers

mod commands;
mod controller;
mod event_loop;
mod state;

use crate::transport::ConnectionState;
use crate::types::messages::ChatMessage;
use crate::types::session::SessionStage;

pub use controller::ChatController;

/// UI-facing notification emitted on the controller's broadcast channel
///
/// Lets a rendering layer react to session activity without polling the
/// snapshot accessors.
#[derive(Debug, Clone)]
pub enum ChatUpdate {
    /// The session moved to a new lifecycle stage
    StageChanged(SessionStage),
    /// A message entered the store
    MessageAppended(ChatMessage),
    /// A history fetch merged this many previously unseen messages
    HistoryLoaded {
        /// Count of newly inserted messages
        appended: usize,
    },
    /// The agent-typing indicator switched on or off
    AgentTyping(bool),
    /// The transport connection state changed
    Connection(ConnectionState),
}
