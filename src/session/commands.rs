//! Session command protocol
//!
//! Commands sent from the controller handle to the background session loop
//! via channel, eliminating shared locks on the transport.

use tokio::sync::oneshot;
use uuid::Uuid;

use crate::error::Result;

/// Commands that can be sent to the session background loop
pub(super) enum SessionCommand {
    /// Publish a user message and persist it for durability
    SendMessage {
        /// Raw message text; trimmed and validated by the loop
        content: String,
        /// Channel for the local pending-send id or the rejection
        response_tx: oneshot::Sender<Result<Uuid>>,
    },

    /// Visitor is editing the input; renews the idle window
    StartTyping,

    /// Visitor explicitly stopped editing (cleared or blurred the input)
    StopTyping,

    /// Ask the backend to close the session; the stage flips when the
    /// resulting status event is pushed back
    EndChat {
        /// Channel to report the close request's outcome
        response_tx: oneshot::Sender<Result<()>>,
    },

    /// Tear down the loop and disconnect the transport
    Shutdown {
        /// Channel to confirm teardown
        response_tx: oneshot::Sender<Result<()>>,
    },
}
