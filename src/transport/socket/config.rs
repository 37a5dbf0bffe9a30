//! Configuration for the WebSocket transport

use std::time::Duration;

/// Cap on a single inbound frame (256KB); larger frames are reported as
/// parse errors instead of being buffered
pub const DEFAULT_MAX_FRAME_BYTES: usize = 256 * 1024;

/// First reconnect delay
pub const DEFAULT_RECONNECT_BASE: Duration = Duration::from_millis(500);

/// Ceiling for the exponential reconnect backoff
pub const DEFAULT_RECONNECT_CAP: Duration = Duration::from_secs(30);

/// How long `disconnect` waits for the connection task before aborting it
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Connection settings for [`SocketTransport`](super::SocketTransport)
#[derive(Debug, Clone)]
pub struct SocketConfig {
    /// WebSocket endpoint, e.g. `wss://host/chat`
    pub url: String,
    /// First reconnect delay; doubles per attempt with jitter
    pub reconnect_base: Duration,
    /// Ceiling for the reconnect backoff
    pub reconnect_cap: Duration,
    /// Maximum accepted inbound frame size in bytes
    pub max_frame_bytes: usize,
}

impl SocketConfig {
    /// Settings for the given endpoint with default timings
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reconnect_base: DEFAULT_RECONNECT_BASE,
            reconnect_cap: DEFAULT_RECONNECT_CAP,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}
