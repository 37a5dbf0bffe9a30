//! Lifecycle management for the WebSocket transport (connect, reconnect,
//! disconnect)

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::time;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::error::Result;
use crate::transport::ConnectionState;
use crate::types::events::{ClientEvent, ServerEvent};
use crate::types::identifiers::SessionId;

use super::config::{SHUTDOWN_GRACE, SocketConfig};
use super::reader;
use super::transport::SocketTransport;

/// Shared handles the connection task works against
pub(super) struct ConnectionContext {
    pub config: SocketConfig,
    pub event_tx: mpsc::UnboundedSender<Result<ServerEvent>>,
    pub state_tx: Arc<watch::Sender<ConnectionState>>,
    pub joined: Arc<Mutex<Option<SessionId>>>,
    pub ready: Arc<AtomicBool>,
}

impl SocketTransport {
    /// Spawn the connection task
    ///
    /// Idempotent: a second call while the task is alive is a no-op.
    pub(super) fn connect_impl(&mut self) -> Result<()> {
        if self.conn_task.is_some() {
            return Ok(());
        }

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        self.outbound_tx = Some(outbound_tx);

        let ctx = ConnectionContext {
            config: self.config.clone(),
            event_tx: self.event_tx.clone(),
            state_tx: Arc::clone(&self.state_tx),
            joined: Arc::clone(&self.joined),
            ready: Arc::clone(&self.ready),
        };

        self.conn_task = Some(tokio::spawn(run_connection(ctx, outbound_rx)));
        Ok(())
    }

    /// Tear down the connection task and clear the session subscription
    pub(super) async fn disconnect_impl(&mut self) -> Result<()> {
        // Dropping the outbound sender asks the task to close the socket.
        self.outbound_tx = None;
        self.ready.store(false, Ordering::SeqCst);
        *self.joined.lock() = None;

        if let Some(mut task) = self.conn_task.take() {
            if time::timeout(SHUTDOWN_GRACE, &mut task).await.is_err() {
                log::warn!("Connection task did not exit in time; aborting");
                task.abort();
            }
        }

        let _ = self.state_tx.send(ConnectionState::Offline);
        Ok(())
    }
}

/// Delay sequence for reconnect attempts
fn reconnect_delays(config: &SocketConfig) -> impl Iterator<Item = Duration> {
    let factor = (config.reconnect_base.as_millis() as u64 / 2).max(1);
    ExponentialBackoff::from_millis(2)
        .factor(factor)
        .max_delay(config.reconnect_cap)
        .map(jitter)
}

/// Own the socket for its whole life: dial with backoff, pump frames both
/// ways, reconnect on failure, exit when the transport handle drops the
/// outbound channel
async fn run_connection(
    ctx: ConnectionContext,
    mut outbound_rx: mpsc::UnboundedReceiver<ClientEvent>,
) {
    let mut resubscribe = false;

    'session: loop {
        let _ = ctx.state_tx.send(ConnectionState::Connecting);

        let ws = {
            let mut delays = reconnect_delays(&ctx.config);
            loop {
                match connect_async(ctx.config.url.as_str()).await {
                    Ok((ws, _response)) => break ws,
                    Err(e) => {
                        log::warn!("Chat socket dial failed: {e}");
                        let _ = ctx.state_tx.send(ConnectionState::Offline);
                        let delay = delays.next().unwrap_or(ctx.config.reconnect_cap);
                        tokio::select! {
                            _ = time::sleep(delay) => {
                                let _ = ctx.state_tx.send(ConnectionState::Connecting);
                            }
                            event = outbound_rx.recv() => {
                                if event.is_none() {
                                    break 'session;
                                }
                                // Stray publish while offline; callers were
                                // already told the link is down.
                            }
                        }
                    }
                }
            }
        };

        let (mut sink, mut stream) = ws.split();

        // Re-issue the session subscription before any replay is possible.
        // The first connection gets its join from the buffered outbound
        // channel instead.
        if resubscribe {
            let joined = ctx.joined.lock().clone();
            if let Some(session_id) = joined {
                let join = ClientEvent::JoinChat { session_id };
                match serde_json::to_string(&join) {
                    Ok(frame) => {
                        if let Err(e) = sink.send(Message::Text(frame)).await {
                            log::warn!("Session re-join failed: {e}");
                            let _ = ctx.state_tx.send(ConnectionState::Offline);
                            continue 'session;
                        }
                    }
                    Err(e) => log::error!("Failed to encode join event: {e}"),
                }
            }
        }

        ctx.ready.store(true, Ordering::SeqCst);
        let _ = ctx.state_tx.send(ConnectionState::Online);
        log::debug!("Chat socket online: {}", ctx.config.url);

        let mut closing = false;
        loop {
            tokio::select! {
                outbound = outbound_rx.recv() => match outbound {
                    Some(event) => {
                        let frame = match serde_json::to_string(&event) {
                            Ok(frame) => frame,
                            Err(e) => {
                                log::error!("Failed to encode client event: {e}");
                                continue;
                            }
                        };
                        if let Err(e) = sink.send(Message::Text(frame)).await {
                            log::warn!("Chat socket send failed: {e}");
                            break;
                        }
                    }
                    None => {
                        closing = true;
                        let _ = sink.send(Message::Close(None)).await;
                        break;
                    }
                },
                inbound = stream.next() => match inbound {
                    Some(Ok(Message::Text(text))) => reader::handle_frame(&ctx, &text),
                    Some(Ok(Message::Close(_))) => {
                        log::debug!("Chat socket closed by server");
                        break;
                    }
                    // Ping/pong are answered by tungstenite; binary frames
                    // are not part of the protocol.
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        log::warn!("Chat socket read error: {e}");
                        break;
                    }
                    None => break,
                },
            }
        }

        ctx.ready.store(false, Ordering::SeqCst);
        let _ = ctx.state_tx.send(ConnectionState::Offline);

        if closing {
            break;
        }
        resubscribe = true;
    }

    log::debug!("Chat socket connection task exited");
}
