//! Shared test doubles for the chat session controller
//!
//! `MockTransport` and `MockApi` stand in for the WebSocket adapter and the
//! REST backend; each hands back a handle the test uses to inject events and
//! inspect what the controller did.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc, watch};

use pharmadesk_chat::api::{
    CreateSessionRequest, CreateSessionResponse, PersistMessageRequest, SessionApi,
};
use pharmadesk_chat::{
    AgentInfo, ChatError, ChatMessage, ChatUpdate, ClientEvent, ConnectionState, IntakeForm,
    MessageSender, Result, ServerEvent, SessionId, Transport,
};

// ============================================================================
// Mock transport
// ============================================================================

/// Test double for the real-time transport
pub struct MockTransport {
    ready: Arc<AtomicBool>,
    joined: Arc<Mutex<Vec<SessionId>>>,
    published: Arc<Mutex<Vec<ClientEvent>>>,
    event_rx: Option<mpsc::UnboundedReceiver<Result<ServerEvent>>>,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    // Keep a live receiver so state sends made before the session loop
    // subscribes (e.g. `connect`'s Online) update the watched value instead
    // of failing on a closed channel. The real transport's background task
    // keeps the channel open the same way.
    _state_keepalive: watch::Receiver<ConnectionState>,
}

/// Test-side handle for driving a [`MockTransport`]
#[derive(Clone)]
pub struct TransportHandle {
    /// Inject server events as if pushed by the broker
    pub events: mpsc::UnboundedSender<Result<ServerEvent>>,
    /// Everything the client published
    pub published: Arc<Mutex<Vec<ClientEvent>>>,
    /// Every session id the client joined
    pub joined: Arc<Mutex<Vec<SessionId>>>,
    /// Drive the reported connection state
    pub state: Arc<watch::Sender<ConnectionState>>,
    /// Toggle whether publishes succeed
    pub ready: Arc<AtomicBool>,
}

impl TransportHandle {
    pub fn push(&self, event: ServerEvent) {
        self.events.send(Ok(event)).expect("event channel closed");
    }

    /// Simulate a network drop
    pub fn go_offline(&self) {
        self.ready.store(false, Ordering::SeqCst);
        let _ = self.state.send(ConnectionState::Offline);
    }

    /// Simulate the adapter re-establishing the link
    pub fn go_online(&self) {
        self.ready.store(true, Ordering::SeqCst);
        let _ = self.state.send(ConnectionState::Online);
    }

    pub fn published_events(&self) -> Vec<ClientEvent> {
        self.published.lock().clone()
    }

    pub fn sent_contents(&self) -> Vec<String> {
        self.published
            .lock()
            .iter()
            .filter_map(|event| match event {
                ClientEvent::SendMessage { content, .. } => Some(content.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn typing_starts(&self) -> usize {
        self.count(|event| matches!(event, ClientEvent::TypingStart { .. }))
    }

    pub fn typing_stops(&self) -> usize {
        self.count(|event| matches!(event, ClientEvent::TypingStop { .. }))
    }

    fn count(&self, pred: impl Fn(&ClientEvent) -> bool) -> usize {
        self.published.lock().iter().filter(|e| pred(e)).count()
    }
}

pub fn mock_transport() -> (MockTransport, TransportHandle) {
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (state_tx, state_keepalive) = watch::channel(ConnectionState::Offline);
    let state_tx = Arc::new(state_tx);
    let ready = Arc::new(AtomicBool::new(false));
    let joined = Arc::new(Mutex::new(Vec::new()));
    let published = Arc::new(Mutex::new(Vec::new()));

    let transport = MockTransport {
        ready: Arc::clone(&ready),
        joined: Arc::clone(&joined),
        published: Arc::clone(&published),
        event_rx: Some(event_rx),
        state_tx: Arc::clone(&state_tx),
        _state_keepalive: state_keepalive,
    };
    let handle = TransportHandle {
        events: event_tx,
        published,
        joined,
        state: state_tx,
        ready,
    };
    (transport, handle)
}

impl Transport for MockTransport {
    async fn connect(&mut self) -> Result<()> {
        self.ready.store(true, Ordering::SeqCst);
        let _ = self.state_tx.send(ConnectionState::Online);
        Ok(())
    }

    async fn join_session(&mut self, session_id: &SessionId) -> Result<()> {
        self.joined.lock().push(session_id.clone());
        Ok(())
    }

    async fn publish(&mut self, event: ClientEvent) -> Result<()> {
        if !self.is_ready() {
            return Err(ChatError::NotConnected);
        }
        self.published.lock().push(event);
        Ok(())
    }

    fn events(&mut self) -> mpsc::UnboundedReceiver<Result<ServerEvent>> {
        self.event_rx.take().unwrap_or_else(|| {
            let (_tx, rx) = mpsc::unbounded_channel();
            rx
        })
    }

    fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.ready.store(false, Ordering::SeqCst);
        let _ = self.state_tx.send(ConnectionState::Offline);
        Ok(())
    }
}

// ============================================================================
// Mock session API
// ============================================================================

#[derive(Default)]
struct MockApiState {
    fail_create: AtomicBool,
    fetch_count: AtomicUsize,
    history: Mutex<Vec<ChatMessage>>,
    created: Mutex<Vec<CreateSessionRequest>>,
    persisted: Mutex<Vec<(SessionId, PersistMessageRequest)>>,
    closed: Mutex<Vec<SessionId>>,
}

/// Test double for the REST collaborators; clones share state
#[derive(Clone, Default)]
pub struct MockApi {
    inner: Arc<MockApiState>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_create(&self, fail: bool) {
        self.inner.fail_create.store(fail, Ordering::SeqCst);
    }

    /// History returned by subsequent fetches
    pub fn set_history(&self, messages: Vec<ChatMessage>) {
        *self.inner.history.lock() = messages;
    }

    pub fn fetch_count(&self) -> usize {
        self.inner.fetch_count.load(Ordering::SeqCst)
    }

    pub fn created_requests(&self) -> Vec<CreateSessionRequest> {
        self.inner.created.lock().clone()
    }

    pub fn persisted_messages(&self) -> Vec<(SessionId, PersistMessageRequest)> {
        self.inner.persisted.lock().clone()
    }

    pub fn closed_sessions(&self) -> Vec<SessionId> {
        self.inner.closed.lock().clone()
    }
}

impl SessionApi for MockApi {
    async fn create_session(&self, request: CreateSessionRequest) -> Result<CreateSessionResponse> {
        if self.inner.fail_create.load(Ordering::SeqCst) {
            return Err(ChatError::session_creation("backend unavailable"));
        }
        self.inner.created.lock().push(request);
        Ok(CreateSessionResponse {
            session_id: SessionId::new("sess-1"),
            agent: None,
            start_time: Utc::now(),
        })
    }

    async fn fetch_messages(&self, _session_id: &SessionId) -> Result<Vec<ChatMessage>> {
        self.inner.fetch_count.fetch_add(1, Ordering::SeqCst);
        Ok(self.inner.history.lock().clone())
    }

    async fn persist_message(
        &self,
        session_id: &SessionId,
        request: PersistMessageRequest,
    ) -> Result<()> {
        self.inner
            .persisted
            .lock()
            .push((session_id.clone(), request));
        Ok(())
    }

    async fn close_session(&self, session_id: &SessionId) -> Result<()> {
        self.inner.closed.lock().push(session_id.clone());
        Ok(())
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub fn message(id: &str, sender: MessageSender, content: &str) -> ChatMessage {
    ChatMessage {
        id: id.into(),
        sender,
        sender_name: match sender {
            MessageSender::Agent => Some("Sam".to_string()),
            _ => None,
        },
        content: content.to_string(),
        timestamp: Utc::now(),
        session_id: SessionId::new("sess-1"),
    }
}

pub fn agent() -> AgentInfo {
    AgentInfo {
        id: "agent-7".to_string(),
        name: "Sam".to_string(),
    }
}

pub fn agent_assigned(system_id: &str) -> ServerEvent {
    ServerEvent::AgentAssigned {
        agent_info: agent(),
        system_message: message(system_id, MessageSender::System, "Sam joined the chat"),
    }
}

pub fn chat_closed(system_id: &str) -> ServerEvent {
    ServerEvent::ChatStatusUpdated {
        status: pharmadesk_chat::ChatStatus::Closed,
        system_message: Some(message(system_id, MessageSender::System, "Chat ended")),
    }
}

pub fn intake_form() -> IntakeForm {
    IntakeForm {
        name: "Dana Melton".to_string(),
        email: "dana@example.com".to_string(),
        phone: "(555) 010-7788".to_string(),
        message: "My refill still shows pending".to_string(),
    }
}

/// Wait for a matching update, failing the test after one (virtual) second
pub async fn wait_for_update(
    updates: &mut broadcast::Receiver<ChatUpdate>,
    pred: impl Fn(&ChatUpdate) -> bool,
) -> ChatUpdate {
    tokio::time::timeout(Duration::from_secs(1), async {
        loop {
            let update = updates.recv().await.expect("update stream closed");
            if pred(&update) {
                return update;
            }
        }
    })
    .await
    .expect("timed out waiting for update")
}
