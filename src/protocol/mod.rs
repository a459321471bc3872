//! Wire protocol message types.
//!
//! This module defines the JSON message format exchanged over one stream's
//! WebSocket: short control commands inbound, status and frame events
//! outbound. The codec is pure and stateless; session state lives in
//! [`crate::session`].
//!
//! # Inbound commands (client → gateway)
//!
//! Every command is a JSON object with a `type` tag:
//!
//! | type | fields | accepted while |
//! |------|--------|----------------|
//! | `start_stream` | `rtsp_url` | connecting, not yet started |
//! | `play` | — | connected |
//! | `pause` | — | connected + playing |
//! | `stop_stream` | — | connected |
//! | `set_speed` | `speed` (> 0) | connected |
//!
//! # Outbound events (gateway → client)
//!
//! Every event is a JSON object with a `type` tag and the `stream_id` it
//! concerns:
//!
//! | type | extra fields |
//! |------|--------------|
//! | `connection_established` | — |
//! | `stream_started` | `rtsp_url` |
//! | `frame` | `frame` (base64 image), `timestamp` (epoch ms) |
//! | `stream_paused` | — |
//! | `stream_resumed` | — |
//! | `stream_stopped` | — |
//! | `speed_changed` | `speed` |
//! | `error` | `message` |
//!
//! # Decoding policy
//!
//! Malformed input (not JSON, no `type`, wrong field shapes) decodes to a
//! protocol error which the session reports back as an `error` event. A
//! structurally valid object whose `type` is outside the command set decodes
//! to [`Inbound::Unknown`]; the session logs and ignores it.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | Inbound command set and decoder |
//! | `event` | Outbound event set and encoder |

// ============================================================================
// Submodules
// ============================================================================

/// Inbound command definitions and classification.
pub mod command;

/// Outbound event message types.
pub mod event;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::{Command, Inbound, decode};
pub use event::Event;
