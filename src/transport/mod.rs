//! Real-time transport layer for the support chat backend
//!
//! This module provides the transport abstraction and the WebSocket
//! implementation used to push and receive chat events. A transport is an
//! explicitly owned resource handed to the session controller at
//! construction; there is no ambient shared connection.

pub mod socket;

use tokio::sync::{mpsc, watch};

use crate::error::Result;
use crate::types::events::{ClientEvent, ServerEvent};
use crate::types::identifiers::SessionId;

/// Connection state reported to observers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// A connection attempt is in flight
    Connecting,
    /// The link is up and usable
    Online,
    /// The link is down; the adapter keeps retrying while alive
    Offline,
}

impl ConnectionState {
    /// Whether the link is currently usable
    #[must_use]
    pub const fn is_online(self) -> bool {
        matches!(self, Self::Online)
    }
}

/// Transport trait for the session-scoped real-time channel
///
/// An implementation owns exactly one live connection. Delivery to the
/// controller is at-most-once per network delivery; duplicate network
/// deliveries are tolerated by the message store's id dedup, not here.
/// Reconnection is the transport's responsibility, including re-issuing the
/// session subscription before any further events can arrive; it never
/// replays missed messages (the controller backfills via history fetch).
pub trait Transport: Send + 'static {
    /// Establish the connection
    ///
    /// Idempotent: calling while already connected is a no-op.
    /// Connection-state observers see `connecting` and then
    /// `online`/`offline`.
    ///
    /// # Errors
    /// Returns error if the connection cannot be initiated
    fn connect(&mut self) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Subscribe the connection to one session's events
    ///
    /// No-op if already joined to that id. The subscription survives
    /// reconnects.
    ///
    /// # Errors
    /// Returns error if the transport was never connected
    fn join_session(
        &mut self,
        session_id: &SessionId,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Fire-and-forget send; does not block on acknowledgment
    ///
    /// # Errors
    /// Returns error if the link is down; the event is not queued
    fn publish(&mut self, event: ClientEvent) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Typed stream of backend events
    ///
    /// Single consumer: the first call returns the live receiver, later
    /// calls return a closed one.
    fn events(&mut self) -> mpsc::UnboundedReceiver<Result<ServerEvent>>;

    /// Observe connection state changes
    fn state_changes(&self) -> watch::Receiver<ConnectionState>;

    /// Whether the link is currently usable for publishing
    fn is_ready(&self) -> bool;

    /// Release the connection and clear all subscriptions
    ///
    /// Safe to call multiple times.
    ///
    /// # Errors
    /// Returns error if teardown fails
    fn disconnect(&mut self) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub use socket::{SocketConfig, SocketTransport};
