//! Shared session state
//!
//! One snapshot struct shared between the controller handle and the session
//! loop. Guarded by `parking_lot::RwLock`; the lock is only ever held for
//! synchronous reads and writes, never across an await point.

use crate::store::MessageStore;
use crate::transport::ConnectionState;
use crate::types::messages::PendingSend;
use crate::types::session::{SessionDetails, SessionStage};

/// State shared between the controller handle and the session loop
#[derive(Debug)]
pub(super) struct SessionState {
    /// Current lifecycle stage
    pub stage: SessionStage,

    /// Session metadata; `None` until the session-creation API succeeds
    pub details: Option<SessionDetails>,

    /// Authoritative message log
    pub store: MessageStore,

    /// Optimistic sends awaiting their server echo
    pub pending: Vec<PendingSend>,

    /// Last observed transport connection state
    pub connection: ConnectionState,

    /// Whether the remote party is currently typing
    pub agent_typing: bool,
}

impl SessionState {
    pub fn new(stage: SessionStage) -> Self {
        Self {
            stage,
            details: None,
            store: MessageStore::new(),
            pending: Vec::new(),
            connection: ConnectionState::Offline,
            agent_typing: false,
        }
    }
}
