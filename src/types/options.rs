//! Chat client options and configuration
//!
//! Timing knobs for the session controller, with a builder for easy setup.
//! Endpoint URLs belong to the transport and API components themselves.

use std::time::Duration;

/// Default idle window before an automatic `typing-stop` (1s)
pub const DEFAULT_TYPING_IDLE_TIMEOUT: Duration = Duration::from_secs(1);

/// Default lifetime of a remote typing indicator with no stop event (3s)
pub const DEFAULT_TYPING_INDICATOR_TTL: Duration = Duration::from_secs(3);

/// Default capacity of the UI update broadcast channel
pub const DEFAULT_UPDATE_BUFFER: usize = 64;

/// Options for a [`ChatController`](crate::session::ChatController)
#[derive(Debug, Clone)]
pub struct ChatClientOptions {
    /// Idle window after the last keystroke before `typing-stop` is emitted
    pub typing_idle_timeout: Duration,
    /// How long a remote typing indicator stays visible without renewal
    pub typing_indicator_ttl: Duration,
    /// Capacity of the UI update broadcast channel; slow consumers that fall
    /// further behind than this lose the oldest updates
    pub update_buffer: usize,
}

impl Default for ChatClientOptions {
    fn default() -> Self {
        Self {
            typing_idle_timeout: DEFAULT_TYPING_IDLE_TIMEOUT,
            typing_indicator_ttl: DEFAULT_TYPING_INDICATOR_TTL,
            update_buffer: DEFAULT_UPDATE_BUFFER,
        }
    }
}

impl ChatClientOptions {
    /// Create a new builder for `ChatClientOptions`
    #[must_use]
    pub fn builder() -> ChatClientOptionsBuilder {
        ChatClientOptionsBuilder::default()
    }
}

/// Builder for [`ChatClientOptions`]
#[derive(Debug, Default)]
pub struct ChatClientOptionsBuilder {
    options: ChatClientOptions,
}

impl ChatClientOptionsBuilder {
    /// Set the idle window before an automatic `typing-stop`
    #[must_use]
    pub fn typing_idle_timeout(mut self, timeout: Duration) -> Self {
        self.options.typing_idle_timeout = timeout;
        self
    }

    /// Set the lifetime of a remote typing indicator
    #[must_use]
    pub fn typing_indicator_ttl(mut self, ttl: Duration) -> Self {
        self.options.typing_indicator_ttl = ttl;
        self
    }

    /// Set the UI update channel capacity
    #[must_use]
    pub fn update_buffer(mut self, capacity: usize) -> Self {
        self.options.update_buffer = capacity;
        self
    }

    /// Build the options
    #[must_use]
    pub fn build(self) -> ChatClientOptions {
        self.options
    }
}
