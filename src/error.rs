//! Error types for the stream gateway.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use camgate::{Result, Error};
//!
//! async fn example(gateway: &Gateway) -> Result<()> {
//!     let manager = gateway.manager();
//!     manager.remove(stream_id);
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! The categories map onto how a live session reacts to the failure:
//!
//! | Category | Variants | Session outcome |
//! |----------|----------|-----------------|
//! | Configuration | [`Error::Config`] | construction fails |
//! | Protocol | [`Error::Protocol`], [`Error::InvalidStreamPath`] | reported, session continues |
//! | State | [`Error::InvalidTransition`], [`Error::StreamAlreadyStarted`], [`Error::InvalidSpeed`], [`Error::SessionActive`] | reported, session continues |
//! | Source | [`Error::SourceUnavailable`], [`Error::Source`] | reported, session terminates |
//! | Registry | [`Error::InvalidSourceUrl`] | record rejected |
//! | Transport / External | [`Error::WebSocket`], [`Error::Io`], [`Error::Json`] | session terminates, log only |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::StreamId;
use crate::session::{ConnectionState, PlaybackState};

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging. The `Display`
/// rendering of protocol, state, and source variants is what a connected
/// client sees in `error` events.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when gateway configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Malformed or undecodable inbound message.
    ///
    /// Returned when an inbound message is not valid JSON, lacks a `type`
    /// tag, or carries fields of the wrong shape. The session reports it
    /// and keeps the connection open.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// Upgrade request path does not name a stream.
    ///
    /// Returned when a WebSocket upgrade arrives on a path other than
    /// `/ws/stream/{id}`.
    #[error("Invalid stream path: {path}")]
    InvalidStreamPath {
        /// The offending request path.
        path: String,
    },

    // ========================================================================
    // State Errors
    // ========================================================================
    /// Command not valid in the session's current state.
    ///
    /// Returned when a command arrives outside the states that accept it,
    /// naming the transition that was refused.
    #[error("Invalid command '{command}' while {connection}/{playback}")]
    InvalidTransition {
        /// Wire name of the refused command.
        command: String,
        /// Connection state at the time of the command.
        connection: ConnectionState,
        /// Playback state at the time of the command.
        playback: PlaybackState,
    },

    /// A second `start_stream` arrived on the same session.
    ///
    /// A session's source URL is fixed for its lifetime; restarting after
    /// `stop_stream` uses `play`.
    #[error("Stream {stream_id} already started: source URL is fixed for the session")]
    StreamAlreadyStarted {
        /// The session's stream id.
        stream_id: StreamId,
    },

    /// Speed factor outside the accepted range.
    ///
    /// Returned for factors that are zero, negative, or non-finite. The
    /// stored playback speed is left untouched.
    #[error("Invalid speed factor {speed}: must be a positive number")]
    InvalidSpeed {
        /// The rejected factor.
        speed: f64,
    },

    /// A live session already exists for the stream.
    ///
    /// Returned to a second concurrent connect for the same stream id;
    /// the existing session is unaffected.
    #[error("Stream {stream_id} already has an active session")]
    SessionActive {
        /// The contested stream id.
        stream_id: StreamId,
    },

    // ========================================================================
    // Source Errors
    // ========================================================================
    /// Frame source could not be opened.
    ///
    /// Returned when `open` fails for the given URL. Fatal to the session.
    #[error("Source unavailable: {url}: {message}")]
    SourceUnavailable {
        /// The source URL that could not be reached.
        url: String,
        /// Description of the open failure.
        message: String,
    },

    /// Frame source failed mid-stream.
    ///
    /// Returned when an open subscription reports a failure. Fatal to the
    /// session.
    #[error("Source error: {message}")]
    Source {
        /// Description of the source failure.
        message: String,
    },

    // ========================================================================
    // Registry Errors
    // ========================================================================
    /// Source URL rejected by the registry.
    ///
    /// Accepted schemes are `rtsp`, `http`, and `https`.
    #[error("Invalid source URL: {url}")]
    InvalidSourceUrl {
        /// The rejected URL.
        url: String,
    },

    // ========================================================================
    // Transport / External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates an invalid stream path error.
    #[inline]
    pub fn invalid_stream_path(path: impl Into<String>) -> Self {
        Self::InvalidStreamPath { path: path.into() }
    }

    /// Creates an invalid transition error.
    #[inline]
    pub fn invalid_transition(
        command: impl Into<String>,
        connection: ConnectionState,
        playback: PlaybackState,
    ) -> Self {
        Self::InvalidTransition {
            command: command.into(),
            connection,
            playback,
        }
    }

    /// Creates a stream already started error.
    #[inline]
    pub fn stream_already_started(stream_id: StreamId) -> Self {
        Self::StreamAlreadyStarted { stream_id }
    }

    /// Creates an invalid speed error.
    #[inline]
    pub fn invalid_speed(speed: f64) -> Self {
        Self::InvalidSpeed { speed }
    }

    /// Creates a session active error.
    #[inline]
    pub fn session_active(stream_id: StreamId) -> Self {
        Self::SessionActive { stream_id }
    }

    /// Creates a source unavailable error.
    #[inline]
    pub fn source_unavailable(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates a source error.
    #[inline]
    pub fn source(message: impl Into<String>) -> Self {
        Self::Source {
            message: message.into(),
        }
    }

    /// Creates an invalid source URL error.
    #[inline]
    pub fn invalid_source_url(url: impl Into<String>) -> Self {
        Self::InvalidSourceUrl { url: url.into() }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a protocol error.
    #[inline]
    #[must_use]
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Self::Protocol { .. } | Self::InvalidStreamPath { .. }
        )
    }

    /// Returns `true` if this is a state error.
    #[inline]
    #[must_use]
    pub fn is_state_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidTransition { .. }
                | Self::StreamAlreadyStarted { .. }
                | Self::InvalidSpeed { .. }
                | Self::SessionActive { .. }
        )
    }

    /// Returns `true` if this is a source error.
    #[inline]
    #[must_use]
    pub fn is_source_error(&self) -> bool {
        matches!(self, Self::SourceUnavailable { .. } | Self::Source { .. })
    }

    /// Returns `true` if this error terminates the session it occurred on.
    ///
    /// Protocol and state errors are reported to the client and recovered
    /// locally; source, transport, and external errors are fatal to the
    /// session (never to the manager or to other sessions).
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !self.is_protocol_error() && !self.is_state_error() && !matches!(self, Self::Config { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================
