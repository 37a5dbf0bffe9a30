//! Background session loop
//!
//! One task per controller. It owns the transport and drives everything
//! event-shaped: pushed server events, commands from the controller handle,
//! connection-state changes, and the two typing deadlines. State mutations
//! happen under the shared lock; the lock is never held across an await.

use std::future::pending;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{self, Instant};
use uuid::Uuid;

use crate::api::{PersistMessageRequest, SessionApi};
use crate::error::{ChatError, Result};
use crate::transport::{ConnectionState, Transport};
use crate::types::events::{ChatStatus, ClientEvent, ServerEvent};
use crate::types::identifiers::SessionId;
use crate::types::messages::{ChatMessage, MessageSender, PendingSend, SenderInfo};
use crate::types::options::ChatClientOptions;
use crate::types::session::{AgentInfo, SessionStage};

use super::ChatUpdate;
use super::commands::SessionCommand;
use super::state::SessionState;

/// Everything the loop needs besides the transport itself
pub(super) struct LoopContext<A> {
    pub shared: Arc<RwLock<SessionState>>,
    pub update_tx: broadcast::Sender<ChatUpdate>,
    pub api: Arc<A>,
    pub options: ChatClientOptions,
    pub sender: SenderInfo,
}

/// Spawn the background task for an established session
///
/// The task runs until the controller sends `Shutdown`, drops its command
/// channel, or the transport event stream ends.
pub(super) fn spawn_session_loop<T, A>(
    mut transport: T,
    mut command_rx: mpsc::UnboundedReceiver<SessionCommand>,
    ctx: LoopContext<A>,
) -> tokio::task::JoinHandle<()>
where
    T: Transport,
    A: SessionApi,
{
    tokio::spawn(async move {
        let mut events = transport.events();
        let mut conn = transport.state_changes();
        let mut run = SessionLoop {
            transport,
            ctx,
            self_typing_deadline: None,
            agent_typing_deadline: None,
        };

        loop {
            tokio::select! {
                cmd = command_rx.recv() => match cmd {
                    Some(cmd) => {
                        if !run.handle_command(cmd).await {
                            break;
                        }
                    }
                    None => {
                        // Controller handle dropped; release the connection.
                        let _ = run.transport.disconnect().await;
                        break;
                    }
                },
                event = events.recv() => match event {
                    Some(Ok(event)) => run.handle_event(event),
                    Some(Err(e)) => log::warn!("Dropping malformed transport event: {e}"),
                    None => {
                        log::debug!("Transport event stream ended");
                        break;
                    }
                },
                changed = conn.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let state = *conn.borrow_and_update();
                    run.on_connection_change(state).await;
                }
                _ = deadline_tick(run.self_typing_deadline) => run.expire_self_typing().await,
                _ = deadline_tick(run.agent_typing_deadline) => run.expire_agent_typing(),
            }
        }
    })
}

/// Sleep until the deadline, or forever when there is none
async fn deadline_tick(deadline: Option<Instant>) {
    match deadline {
        Some(at) => time::sleep_until(at).await,
        None => pending().await,
    }
}

struct SessionLoop<T, A> {
    transport: T,
    ctx: LoopContext<A>,
    self_typing_deadline: Option<Instant>,
    agent_typing_deadline: Option<Instant>,
}

impl<T: Transport, A: SessionApi> SessionLoop<T, A> {
    fn emit(&self, update: ChatUpdate) {
        // No receivers is fine; snapshots still reflect the state.
        let _ = self.ctx.update_tx.send(update);
    }

    fn session_id(&self) -> Option<SessionId> {
        self.ctx
            .shared
            .read()
            .details
            .as_ref()
            .map(|details| details.id.clone())
    }

    /// Returns `false` when the loop should exit
    async fn handle_command(&mut self, cmd: SessionCommand) -> bool {
        match cmd {
            SessionCommand::SendMessage {
                content,
                response_tx,
            } => {
                let _ = response_tx.send(self.send_message(content).await);
            }
            SessionCommand::StartTyping => self.start_typing().await,
            SessionCommand::StopTyping => self.stop_typing().await,
            SessionCommand::EndChat { response_tx } => {
                let _ = response_tx.send(self.end_chat().await);
            }
            SessionCommand::Shutdown { response_tx } => {
                let _ = response_tx.send(self.transport.disconnect().await);
                return false;
            }
        }
        true
    }

    async fn send_message(&mut self, content: String) -> Result<Uuid> {
        let content = content.trim().to_string();
        if content.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let (stage, session_id) = {
            let state = self.ctx.shared.read();
            (
                state.stage,
                state.details.as_ref().map(|details| details.id.clone()),
            )
        };
        let Some(session_id) = session_id else {
            return Err(ChatError::SessionNotStarted);
        };
        if !stage.accepts_messages() {
            return Err(match stage {
                SessionStage::Ended => ChatError::SessionEnded(session_id),
                _ => ChatError::invalid_stage(SessionStage::Connected, stage),
            });
        }
        if !self.transport.is_ready() {
            return Err(ChatError::NotConnected);
        }

        let pending = PendingSend::new(content.clone());
        let local_id = pending.local_id;
        self.ctx.shared.write().pending.push(pending);

        // Sending implies the visitor stopped composing.
        self.stop_typing().await;

        let event = ClientEvent::SendMessage {
            session_id: session_id.clone(),
            content: content.clone(),
            sender: MessageSender::User,
            sender_info: self.ctx.sender.clone(),
        };
        if let Err(e) = self.transport.publish(event).await {
            self.ctx
                .shared
                .write()
                .pending
                .retain(|p| p.local_id != local_id);
            return Err(e);
        }

        // Durability path, independent of the real-time echo. A failure here
        // is logged, not surfaced: the echo is authoritative for the UI.
        let api = Arc::clone(&self.ctx.api);
        tokio::spawn(async move {
            let request = PersistMessageRequest {
                content,
                sender: MessageSender::User,
            };
            if let Err(e) = api.persist_message(&session_id, request).await {
                log::warn!("[{session_id}] Message persistence failed: {e}");
            }
        });

        Ok(local_id)
    }

    async fn start_typing(&mut self) {
        let stage = self.ctx.shared.read().stage;
        if !stage.accepts_messages() || !self.transport.is_ready() {
            return;
        }
        let Some(session_id) = self.session_id() else {
            return;
        };

        if self.self_typing_deadline.is_none() {
            let event = ClientEvent::TypingStart {
                session_id,
                sender_info: self.ctx.sender.clone(),
            };
            if let Err(e) = self.transport.publish(event).await {
                log::debug!("typing-start publish failed: {e}");
                return;
            }
        }
        self.self_typing_deadline = Some(Instant::now() + self.ctx.options.typing_idle_timeout);
    }

    async fn stop_typing(&mut self) {
        if self.self_typing_deadline.take().is_none() {
            return;
        }
        let Some(session_id) = self.session_id() else {
            return;
        };
        if !self.transport.is_ready() {
            return;
        }
        let event = ClientEvent::TypingStop {
            session_id,
            sender_info: self.ctx.sender.clone(),
        };
        if let Err(e) = self.transport.publish(event).await {
            log::debug!("typing-stop publish failed: {e}");
        }
    }

    /// Idle window elapsed without a renewal
    async fn expire_self_typing(&mut self) {
        self.stop_typing().await;
    }

    /// Remote indicator outlived its TTL with no stop event
    fn expire_agent_typing(&mut self) {
        self.agent_typing_deadline = None;
        let was_typing = {
            let mut state = self.ctx.shared.write();
            std::mem::replace(&mut state.agent_typing, false)
        };
        if was_typing {
            self.emit(ChatUpdate::AgentTyping(false));
        }
    }

    async fn end_chat(&mut self) -> Result<()> {
        let (stage, session_id) = {
            let state = self.ctx.shared.read();
            (
                state.stage,
                state.details.as_ref().map(|details| details.id.clone()),
            )
        };
        let Some(session_id) = session_id else {
            return Err(ChatError::SessionNotStarted);
        };

        match stage {
            SessionStage::Waiting | SessionStage::Connected => {
                self.ctx.api.close_session(&session_id).await
            }
            // Already closed; nothing left to request.
            SessionStage::Ended => Ok(()),
            SessionStage::Form => Err(ChatError::SessionNotStarted),
        }
    }

    fn handle_event(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::NewMessage(message) => self.on_new_message(message),
            ServerEvent::AgentAssigned {
                agent_info,
                system_message,
            } => self.on_agent_assigned(agent_info, system_message),
            ServerEvent::UserTyping { sender_info } => self.on_user_typing(&sender_info),
            ServerEvent::ChatStatusUpdated {
                status,
                system_message,
            } => self.on_status_updated(status, system_message),
        }
    }

    /// Messages append in any stage, decoupled from stage transitions
    fn on_new_message(&mut self, message: ChatMessage) {
        let mut agent_typing_cleared = false;
        let appended = {
            let mut state = self.ctx.shared.write();

            if message.sender == MessageSender::User {
                // The authoritative echo clears the oldest matching
                // optimistic marker.
                if let Some(pos) = state
                    .pending
                    .iter()
                    .position(|p| p.content == message.content)
                {
                    state.pending.remove(pos);
                }
            }

            if message.sender == MessageSender::Agent && state.agent_typing {
                state.agent_typing = false;
                agent_typing_cleared = true;
            }

            state.store.append(message.clone())
        };

        if agent_typing_cleared {
            self.agent_typing_deadline = None;
            self.emit(ChatUpdate::AgentTyping(false));
        }

        if appended {
            self.emit(ChatUpdate::MessageAppended(message));
        } else {
            log::debug!("Duplicate message {} ignored", message.id);
        }
    }

    fn on_agent_assigned(&mut self, agent: AgentInfo, system_message: ChatMessage) {
        let appended = {
            let mut state = self.ctx.shared.write();
            if state.stage != SessionStage::Waiting {
                log::debug!("agent-assigned ignored in stage {}", state.stage);
                return;
            }
            state.stage = SessionStage::Connected;
            if let Some(details) = state.details.as_mut() {
                details.agent = Some(agent);
            }
            state.store.append(system_message.clone())
        };

        self.emit(ChatUpdate::StageChanged(SessionStage::Connected));
        if appended {
            self.emit(ChatUpdate::MessageAppended(system_message));
        }
    }

    fn on_user_typing(&mut self, sender: &SenderInfo) {
        // Our own typing broadcast may be echoed back; only the other
        // party's indicator is shown.
        if sender.role == MessageSender::User {
            return;
        }

        self.agent_typing_deadline = Some(Instant::now() + self.ctx.options.typing_indicator_ttl);
        let switched_on = {
            let mut state = self.ctx.shared.write();
            !std::mem::replace(&mut state.agent_typing, true)
        };
        if switched_on {
            self.emit(ChatUpdate::AgentTyping(true));
        }
    }

    fn on_status_updated(&mut self, status: ChatStatus, system_message: Option<ChatMessage>) {
        if status != ChatStatus::Closed {
            log::debug!("chat status {status:?} ignored");
            return;
        }

        let appended = {
            let mut state = self.ctx.shared.write();
            if state.stage != SessionStage::Connected {
                log::debug!("chat-status-updated ignored in stage {}", state.stage);
                return;
            }
            state.stage = SessionStage::Ended;
            state.agent_typing = false;
            system_message.filter(|message| state.store.append(message.clone()))
        };

        self.self_typing_deadline = None;
        self.agent_typing_deadline = None;

        self.emit(ChatUpdate::StageChanged(SessionStage::Ended));
        if let Some(message) = appended {
            self.emit(ChatUpdate::MessageAppended(message));
        }
    }

    async fn on_connection_change(&mut self, connection: ConnectionState) {
        let previous = {
            let mut state = self.ctx.shared.write();
            std::mem::replace(&mut state.connection, connection)
        };
        if previous == connection {
            return;
        }

        self.emit(ChatUpdate::Connection(connection));

        // Push gaps accumulated while offline are closed by refetching
        // history; the store's id dedup makes the merge safe.
        if connection.is_online() {
            self.backfill_history().await;
        }
    }

    async fn backfill_history(&mut self) {
        let Some(session_id) = self.session_id() else {
            return;
        };

        match self.ctx.api.fetch_messages(&session_id).await {
            Ok(history) => {
                let appended = self.ctx.shared.write().store.load_history(history);
                if appended > 0 {
                    log::info!("[{session_id}] Backfilled {appended} message(s) after reconnect");
                    self.emit(ChatUpdate::HistoryLoaded { appended });
                }
            }
            Err(e) => log::warn!("[{session_id}] History backfill failed: {e}"),
        }
    }
}
