//! WebSocket transport for the support chat backend

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::error::{ChatError, Result};
use crate::transport::{ConnectionState, Transport};
use crate::types::events::{ClientEvent, ServerEvent};
use crate::types::identifiers::SessionId;

use super::config::SocketConfig;

/// WebSocket transport maintaining one live connection with automatic
/// reconnect
///
/// The connection itself lives in a background task spawned by `connect`;
/// this handle forwards outbound events to it over a channel and exposes the
/// inbound event stream and connection-state watch.
pub struct SocketTransport {
    pub(super) config: SocketConfig,
    pub(super) outbound_tx: Option<mpsc::UnboundedSender<ClientEvent>>,
    pub(super) event_tx: mpsc::UnboundedSender<Result<ServerEvent>>,
    pub(super) event_rx: Option<mpsc::UnboundedReceiver<Result<ServerEvent>>>,
    pub(super) state_tx: Arc<watch::Sender<ConnectionState>>,
    pub(super) joined: Arc<Mutex<Option<SessionId>>>,
    pub(super) ready: Arc<AtomicBool>,
    pub(super) conn_task: Option<JoinHandle<()>>,
}

impl SocketTransport {
    /// Create a transport for the given endpoint; nothing is dialed until
    /// `connect`
    #[must_use]
    pub fn new(config: SocketConfig) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (state_tx, _) = watch::channel(ConnectionState::Offline);

        Self {
            config,
            outbound_tx: None,
            event_tx,
            event_rx: Some(event_rx),
            state_tx: Arc::new(state_tx),
            joined: Arc::new(Mutex::new(None)),
            ready: Arc::new(AtomicBool::new(false)),
            conn_task: None,
        }
    }

    fn send_outbound(&self, event: ClientEvent) -> Result<()> {
        let outbound_tx = self
            .outbound_tx
            .as_ref()
            .ok_or_else(|| ChatError::transport("Transport is not connected"))?;

        outbound_tx
            .send(event)
            .map_err(|_| ChatError::transport("Connection task is gone"))
    }
}

impl Transport for SocketTransport {
    async fn connect(&mut self) -> Result<()> {
        self.connect_impl()
    }

    async fn join_session(&mut self, session_id: &SessionId) -> Result<()> {
        {
            let mut joined = self.joined.lock();
            if joined.as_ref() == Some(session_id) {
                return Ok(());
            }
            *joined = Some(session_id.clone());
        }

        // Buffered until the link is up; re-issued by the connection task on
        // every reconnect after this one.
        self.send_outbound(ClientEvent::JoinChat {
            session_id: session_id.clone(),
        })
    }

    async fn publish(&mut self, event: ClientEvent) -> Result<()> {
        if !self.is_ready() {
            return Err(ChatError::NotConnected);
        }
        self.send_outbound(event)
    }

    fn events(&mut self) -> mpsc::UnboundedReceiver<Result<ServerEvent>> {
        self.event_rx.take().unwrap_or_else(|| {
            log::warn!("Event stream already taken; returning a closed receiver");
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
        self.disconnect_impl().await
    }
}

impl Drop for SocketTransport {
    fn drop(&mut self) {
        if let Some(task) = self.conn_task.take() {
            task.abort();
        }
    }
}
