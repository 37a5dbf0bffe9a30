//! Public chat session controller

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::api::{CreateSessionRequest, SessionApi};
use crate::error::{ChatError, Result};
use crate::intake::{IntakeForm, validate_intake};
use crate::transport::{ConnectionState, Transport};
use crate::types::identifiers::SessionId;
use crate::types::messages::{ChatMessage, PendingSend, SenderInfo};
use crate::types::options::ChatClientOptions;
use crate::types::session::{CustomerInfo, OriginChannel, SessionDetails, SessionStage};

use super::ChatUpdate;
use super::commands::SessionCommand;
use super::event_loop::{LoopContext, spawn_session_loop};
use super::state::SessionState;

/// Client-side owner of one support conversation
///
/// Construct with [`new`](Self::new) for the website flow (intake form
/// first) or [`open_store`](Self::open_store) for the in-store kiosk flow
/// (session created immediately). Once a session exists, a background loop
/// owns the transport; this handle talks to it over a command channel and
/// reads state through cheap snapshots.
pub struct ChatController<T: Transport, A: SessionApi> {
    options: ChatClientOptions,
    api: Arc<A>,
    transport: Option<T>,
    shared: Arc<RwLock<SessionState>>,
    update_tx: broadcast::Sender<ChatUpdate>,
    command_tx: Option<mpsc::UnboundedSender<SessionCommand>>,
    loop_handle: Option<JoinHandle<()>>,
}

impl<T: Transport, A: SessionApi> ChatController<T, A> {
    /// Create a controller for the website flow
    ///
    /// The session starts at the `form` stage; call
    /// [`submit_intake`](Self::submit_intake) to request a session.
    pub fn new(transport: T, api: A, options: ChatClientOptions) -> Self {
        let (update_tx, _) = broadcast::channel(options.update_buffer);
        Self {
            options,
            api: Arc::new(api),
            transport: Some(transport),
            shared: Arc::new(RwLock::new(SessionState::new(SessionStage::Form))),
            update_tx,
            command_tx: None,
            loop_handle: None,
        }
    }

    /// Create a controller for the in-store kiosk flow
    ///
    /// The session is created immediately by automatic handshake and the
    /// controller starts at `waiting`; there is no intake form.
    ///
    /// # Errors
    /// Returns error if session creation or the transport connection fails
    pub async fn open_store(
        transport: T,
        api: A,
        options: ChatClientOptions,
        customer: CustomerInfo,
        subject: impl Into<String>,
    ) -> Result<Self> {
        let mut controller = Self::new(transport, api, options);
        controller
            .start_session(OriginChannel::Store, customer, subject.into(), None)
            .await?;
        Ok(controller)
    }

    /// Validate the intake form and request a session (website origin)
    ///
    /// On success the stage moves `form → waiting`, the transport joins the
    /// new session, and the initial message history is loaded. On failure
    /// the stage stays at `form` and the call may be retried with corrected
    /// input.
    ///
    /// # Errors
    /// Returns [`ChatError::Validation`] for field errors, or a retryable
    /// error when the session-creation API fails
    pub async fn submit_intake(
        &mut self,
        form: IntakeForm,
        subject: impl Into<String>,
    ) -> Result<SessionId> {
        let stage = self.stage();
        if stage != SessionStage::Form {
            return Err(ChatError::invalid_stage(SessionStage::Form, stage));
        }

        let errors = validate_intake(&form);
        if !errors.is_empty() {
            return Err(ChatError::Validation(errors));
        }

        let initial_message = Some(form.message.trim().to_string());
        self.start_session(
            OriginChannel::Website,
            form.customer(),
            subject.into(),
            initial_message,
        )
        .await
    }

    async fn start_session(
        &mut self,
        origin: OriginChannel,
        customer: CustomerInfo,
        subject: String,
        initial_message: Option<String>,
    ) -> Result<SessionId> {
        let request = CreateSessionRequest {
            origin,
            customer: customer.clone(),
            subject: subject.clone(),
            initial_message,
        };
        // Stage is untouched on failure so the caller can retry.
        let created = self.api.create_session(request).await?;
        let session_id = created.session_id.clone();

        let mut transport = self
            .transport
            .take()
            .ok_or_else(|| ChatError::transport("Transport already consumed"))?;

        if let Err(e) = transport.connect().await {
            // The backend session exists but we never joined it; hand the
            // transport back so a retry can create a fresh one.
            log::warn!("[{session_id}] Transport connect failed after creation: {e}");
            self.transport = Some(transport);
            return Err(e);
        }
        transport.join_session(&session_id).await?;

        let history = match self.api.fetch_messages(&session_id).await {
            Ok(history) => history,
            // A live session with an empty pane beats a stranded one; the
            // reconnect backfill retries this fetch.
            Err(e) => {
                log::warn!("[{session_id}] Initial history fetch failed: {e}");
                Vec::new()
            }
        };

        let sender = SenderInfo::user(Some(customer.name.clone()));
        let connection = *transport.state_changes().borrow();

        // An agent already present at creation means the backend matched
        // instantly; agent metadata is only valid from `connected` onward.
        let stage = if created.agent.is_some() {
            SessionStage::Connected
        } else {
            SessionStage::Waiting
        };

        let appended = {
            let mut state = self.shared.write();
            state.stage = stage;
            state.connection = connection;
            state.details = Some(SessionDetails {
                id: session_id.clone(),
                customer,
                subject,
                agent: created.agent,
                started_at: created.start_time,
                origin,
            });
            state.store.load_history(history)
        };

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        self.command_tx = Some(command_tx);
        let ctx = LoopContext {
            shared: Arc::clone(&self.shared),
            update_tx: self.update_tx.clone(),
            api: Arc::clone(&self.api),
            options: self.options.clone(),
            sender,
        };
        self.loop_handle = Some(spawn_session_loop(transport, command_rx, ctx));

        let _ = self.update_tx.send(ChatUpdate::StageChanged(stage));
        if appended > 0 {
            let _ = self.update_tx.send(ChatUpdate::HistoryLoaded { appended });
        }

        log::info!("[{session_id}] Session established ({stage})");
        Ok(session_id)
    }

    /// Send a chat message
    ///
    /// Requires the `connected` stage and non-empty text. The input may be
    /// cleared as soon as this returns: the returned id identifies a
    /// pending-send marker, and the message itself reaches
    /// [`messages`](Self::messages) through the server echo.
    ///
    /// # Errors
    /// Returns error if the stage is not `connected`, the text is empty, or
    /// the link is down; no publish and no persistence happen in that case
    pub async fn send_message(&self, content: impl Into<String>) -> Result<Uuid> {
        let (response_tx, response_rx) = oneshot::channel();
        self.command(SessionCommand::SendMessage {
            content: content.into(),
            response_tx,
        })?;
        response_rx
            .await
            .map_err(|_| ChatError::transport("Session loop dropped the request"))?
    }

    /// Signal that the visitor is typing
    ///
    /// Repeated calls renew the idle window; a `typing-stop` is emitted
    /// automatically after the configured idle timeout.
    pub fn start_typing(&self) {
        let _ = self.command(SessionCommand::StartTyping);
    }

    /// Explicitly signal that the visitor stopped typing
    pub fn stop_typing(&self) {
        let _ = self.command(SessionCommand::StopTyping);
    }

    /// Ask the backend to close the session
    ///
    /// The stage flips to `ended` only when the backend pushes the
    /// resulting `chat-status-updated`, keeping both sides consistent.
    ///
    /// # Errors
    /// Returns error if no session exists or the close request fails
    pub async fn end_chat(&self) -> Result<()> {
        let (response_tx, response_rx) = oneshot::channel();
        self.command(SessionCommand::EndChat { response_tx })?;
        response_rx
            .await
            .map_err(|_| ChatError::transport("Session loop dropped the request"))?
    }

    /// Disconnect the transport and stop the background loop
    ///
    /// The session itself is not ended server-side; it remains resumable.
    /// Safe to call multiple times.
    ///
    /// # Errors
    /// Returns error if transport teardown fails
    pub async fn shutdown(&mut self) -> Result<()> {
        let Some(command_tx) = self.command_tx.take() else {
            return Ok(());
        };

        let (response_tx, response_rx) = oneshot::channel();
        let mut result = Ok(());
        if command_tx
            .send(SessionCommand::Shutdown { response_tx })
            .is_ok()
        {
            if let Ok(outcome) = response_rx.await {
                result = outcome;
            }
        }

        if let Some(handle) = self.loop_handle.take() {
            let _ = handle.await;
        }
        result
    }

    /// Subscribe to UI-facing updates
    pub fn subscribe(&self) -> broadcast::Receiver<ChatUpdate> {
        self.update_tx.subscribe()
    }

    /// Current lifecycle stage
    pub fn stage(&self) -> SessionStage {
        self.shared.read().stage
    }

    /// Metadata for the established session, if any
    pub fn session(&self) -> Option<SessionDetails> {
        self.shared.read().details.clone()
    }

    /// Ordered snapshot of the message log
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.shared.read().store.snapshot()
    }

    /// Optimistic sends still awaiting their server echo
    pub fn pending_sends(&self) -> Vec<PendingSend> {
        self.shared.read().pending.clone()
    }

    /// Last observed transport connection state
    pub fn connection_state(&self) -> ConnectionState {
        self.shared.read().connection
    }

    /// Whether the remote party is currently typing
    pub fn is_agent_typing(&self) -> bool {
        self.shared.read().agent_typing
    }

    fn command(&self, cmd: SessionCommand) -> Result<()> {
        let command_tx = self.command_tx.as_ref().ok_or(ChatError::SessionNotStarted)?;
        command_tx
            .send(cmd)
            .map_err(|_| ChatError::transport("Session loop is gone"))
    }
}
