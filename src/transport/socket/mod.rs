//! WebSocket transport implementation
//!
//! # Module Structure
//!
//! - `config` - Connection settings and tunables
//! - `transport` - `SocketTransport` struct and trait impl
//! - `lifecycle` - Connection task: dial, backoff reconnect, frame pump
//! - `reader` - Inbound frame decoding

mod config;
mod lifecycle;
mod reader;
mod transport;

pub use config::SocketConfig;
pub use transport::SocketTransport;
