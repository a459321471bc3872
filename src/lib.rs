//! Stream gateway - WebSocket session layer for live camera feeds.
//!
//! This library lets a client observe and control independent live video
//! feeds over one persistent bidirectional channel per feed: short JSON
//! control commands in, a continuous push of status events and decoded
//! frames out.
//!
//! # Architecture
//!
//! The gateway follows a one-session-per-stream model:
//!
//! - **Gateway**: accepts WebSocket upgrades on `/ws/stream/{id}`
//! - **Session Manager**: owns the stream id → session map (at most one
//!   live session per stream)
//! - **Session**: owns one socket and one frame source subscription, runs
//!   the playback state machine on its own task
//! - **Frame Source**: pluggable decode engine behind a trait boundary
//!
//! Key design principles:
//!
//! - Each [`Session`] owns: WebSocket + subscription + state machine
//! - Protocol uses tagged JSON messages (`{"type": "play"}` style)
//! - Commands invalid for the current state are answered with `error`
//!   events, never silently dropped
//! - Sessions are isolated: no shared state beyond the manager's map,
//!   exactly one cleanup per connection lifetime
//!
//! # Quick Start
//!
//! ```no_run
//! use camgate::{Gateway, Result, TestPatternSource};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // Bind the gateway with the built-in synthetic source
//!     let gateway = Gateway::builder()
//!         .bind_addr(([127, 0, 0, 1], 9191))
//!         .frame_source(TestPatternSource::default())
//!         .build()
//!         .await?;
//!
//!     // Clients connect to ws://127.0.0.1:9191/ws/stream/{stream_id}
//!     // and send {"type": "start_stream", "rtsp_url": "rtsp://cam/1"}
//!     println!("gateway ready at {}", gateway.ws_url());
//!
//!     tokio::signal::ctrl_c().await?;
//!     gateway.shutdown();
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`gateway`] | Listener, WebSocket upgrade, connection dispatch |
//! | [`session`] | Per-stream [`Session`], [`SessionManager`], state machine |
//! | [`protocol`] | JSON command/event codec |
//! | [`source`] | [`FrameSource`] boundary and the built-in test pattern |
//! | [`registry`] | Stream record CRUD ([`MemoryRegistry`]) |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe [`StreamId`] wrapper |
//!
//! # Features
//!
//! - **Per-stream isolation**: one task per session, failures never cross
//!   streams
//! - **Total command validation**: every command checked against the state
//!   machine, invalid transitions reported
//! - **Bounded memory**: paused sessions drain and discard frames instead
//!   of buffering
//! - **Deterministic cleanup**: subscription and socket released exactly
//!   once, on every exit path

// ============================================================================
// Modules
// ============================================================================

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// WebSocket gateway: listener, upgrade, and connection dispatch.
///
/// Use [`Gateway::builder()`] to bind and start a gateway.
pub mod gateway;

/// Type-safe identifiers.
///
/// [`StreamId`] wraps the UUID minted by the stream registry.
pub mod identifiers;

/// JSON wire protocol: inbound commands, outbound events.
pub mod protocol;

/// Stream record CRUD boundary and the in-memory reference registry.
pub mod registry;

/// Per-stream sessions, their manager, and the playback state machine.
pub mod session;

/// Frame source collaborator boundary and built-in sources.
pub mod source;

// ============================================================================
// Re-exports
// ============================================================================

// Gateway types
pub use gateway::{Gateway, GatewayBuilder};

// Session types
pub use session::{
    ConnectionState, PlaybackState, Session, SessionManager, StreamSession, StreamSocket,
};

// Protocol types
pub use protocol::{Command, Event, Inbound};

// Frame source types
pub use source::{Frame, FrameSource, FrameSubscription, TestPatternSource};

// Registry types
pub use registry::{MemoryRegistry, StreamRecord, StreamRegistry};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::StreamId;
