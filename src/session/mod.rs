//! Per-stream sessions and their manager.
//!
//! One session serves one stream over one WebSocket, on one task. The
//! session interprets inbound commands against its current state, drives a
//! frame source subscription, and pushes status and frame events back out.
//! The manager keeps the only cross-session state: the stream id →
//! session map, with at most one live session per stream id.
//!
//! # State machine
//!
//! Connection states are one-shot per session (`Disconnected → Connecting →
//! Connected → Disconnected`); playback states apply within `Connected`:
//!
//! | From | Trigger | Emits | To |
//! |------|---------|-------|----|
//! | Disconnected | transport opens | `connection_established` | Connecting |
//! | Connecting | `start_stream` | `stream_started` | Connected/Playing |
//! | Connected/Playing | `pause` | `stream_paused` | Connected/Paused |
//! | Connected/Paused | `play` | `stream_resumed` | Connected/Playing |
//! | Connected/Stopped | `play` | `stream_started` | Connected/Playing |
//! | Connected/* | `stop_stream` | `stream_stopped` | Connected/Stopped |
//! | Connected/* | `set_speed` | `speed_changed` | unchanged |
//! | Connected/Playing | source ends | `stream_stopped` | Connected/Stopped |
//! | Connecting, Connected/* | source fails | `error` | Errored → Disconnected |
//! | any | transport closes | — | Disconnected (terminal) |
//!
//! Commands outside their accepted states are answered with an `error`
//! event naming the refused transition; the connection stays open. A second
//! `start_stream` is refused the same way (the source URL is fixed per
//! session). Repeating the current playback mode (`play` while playing,
//! `pause` while paused) is ignored.
//!
//! While `Paused` the subscription keeps running and its frames are drained
//! and discarded, so a stalled consumer never builds up buffered frames.

// ============================================================================
// Submodules
// ============================================================================

/// The stream id → session registration map.
pub mod manager;

/// The per-stream session task.
pub mod session;

/// Session state record and state enums.
pub mod state;


// ============================================================================
// Re-exports
// ============================================================================

pub use manager::SessionManager;
pub use session::{Session, StreamSocket};
pub use state::{ConnectionState, PlaybackState, StreamSession};
