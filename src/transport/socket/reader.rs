//! Inbound frame decoding for the WebSocket transport

use crate::error::ChatError;
use crate::types::events::parse_event;

use super::lifecycle::ConnectionContext;

/// Decode one text frame into a typed server event and forward it
///
/// Oversized or malformed frames become error entries on the event stream;
/// the consumer decides whether to log or surface them. A dropped receiver
/// is not an error here.
pub(super) fn handle_frame(ctx: &ConnectionContext, text: &str) {
    if text.len() > ctx.config.max_frame_bytes {
        let _ = ctx.event_tx.send(Err(ChatError::event_parse(
            format!(
                "Frame exceeded maximum size of {} bytes",
                ctx.config.max_frame_bytes
            ),
            None,
        )));
        return;
    }

    let event = match serde_json::from_str::<serde_json::Value>(text) {
        Ok(value) => parse_event(value),
        Err(e) => Err(ChatError::JsonDecode(e)),
    };

    if ctx.event_tx.send(event).is_err() {
        log::debug!("Event receiver dropped; frame discarded");
    }
}
