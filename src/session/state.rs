//! Session state record and state enums.
//!
//! [`StreamSession`] is the single owned record behind one live session.
//! It is mutated only by the session task that owns it, one transition at a
//! time, so there are no locks here and no partial states: every mutation
//! corresponds to one row of the transition table in [`crate::session`].

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use crate::error::{Error, Result};
use crate::identifiers::StreamId;

// ============================================================================
// State Enums
// ============================================================================

/// Transport-level lifecycle of a session.
///
/// One-shot per session: `Disconnected → Connecting → Connected →
/// Disconnected`, with `Errored` interposed before disconnect on fatal
/// source or transport failures. A disconnected session is never revived;
/// reconnection is a fresh session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport attached (initial and terminal state).
    Disconnected,
    /// Transport open, waiting for `start_stream`.
    Connecting,
    /// Stream started; playback commands are accepted.
    Connected,
    /// Fatal failure recorded; disconnect follows immediately.
    Errored,
}

/// Frame delivery mode within a connected session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// No active subscription; frames are not produced.
    Stopped,
    /// Frames flow from the subscription to the transport.
    Playing,
    /// Subscription stays open; frames are drained and discarded.
    Paused,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Errored => "errored",
        };
        f.write_str(name)
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Stopped => "stopped",
            Self::Playing => "playing",
            Self::Paused => "paused",
        };
        f.write_str(name)
    }
}

// ============================================================================
// StreamSession
// ============================================================================

/// The live unit of work for one stream.
///
/// Invariant: `playback ∈ {Playing, Paused}` implies
/// `connection = Connected`. The source URL is set by the first successful
/// `start_stream` and fixed for the session's lifetime.
#[derive(Debug, Clone)]
pub struct StreamSession {
    id: StreamId,
    source_url: Option<String>,
    connection: ConnectionState,
    playback: PlaybackState,
    speed: f64,
    last_frame_ms: Option<i64>,
}

impl StreamSession {
    /// Creates a fresh record in `Disconnected`/`Stopped` at speed 1.0.
    #[must_use]
    pub fn new(id: StreamId) -> Self {
        Self {
            id,
            source_url: None,
            connection: ConnectionState::Disconnected,
            playback: PlaybackState::Stopped,
            speed: 1.0,
            last_frame_ms: None,
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Returns the stream id this session serves.
    #[inline]
    #[must_use]
    pub fn id(&self) -> StreamId {
        self.id
    }

    /// Returns the fixed source URL, once `start_stream` has succeeded.
    #[inline]
    #[must_use]
    pub fn source_url(&self) -> Option<&str> {
        self.source_url.as_deref()
    }

    /// Returns the transport-level state.
    #[inline]
    #[must_use]
    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    /// Returns the playback state.
    #[inline]
    #[must_use]
    pub fn playback(&self) -> PlaybackState {
        self.playback
    }

    /// Returns the stored playback speed factor.
    #[inline]
    #[must_use]
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Returns the timestamp of the last forwarded frame, if any.
    #[inline]
    #[must_use]
    pub fn last_frame_ms(&self) -> Option<i64> {
        self.last_frame_ms
    }

    /// Returns `true` while the connection state is `Connected`.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection == ConnectionState::Connected
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    /// Transport opened: `Disconnected → Connecting`.
    pub fn open_transport(&mut self) {
        debug_assert_eq!(self.connection, ConnectionState::Disconnected);
        self.connection = ConnectionState::Connecting;
    }

    /// A subscription was opened for `url`: enter `Connected`/`Playing`.
    ///
    /// Covers both the initial `start_stream` and a `play` that reopens the
    /// source after `stop_stream`; the URL never changes after the first
    /// call.
    pub fn stream_started(&mut self, url: impl Into<String>) {
        self.source_url = Some(url.into());
        self.connection = ConnectionState::Connected;
        self.playback = PlaybackState::Playing;
    }

    /// Suspend delivery: `Playing → Paused`.
    pub fn pause(&mut self) {
        debug_assert!(self.is_connected());
        self.playback = PlaybackState::Paused;
    }

    /// Resume delivery: `Paused → Playing`.
    pub fn resume(&mut self) {
        debug_assert!(self.is_connected());
        self.playback = PlaybackState::Playing;
    }

    /// Subscription released: any playback state → `Stopped`.
    pub fn stop(&mut self) {
        self.playback = PlaybackState::Stopped;
    }

    /// Fatal source or transport failure: mark `Errored`.
    ///
    /// The owning task disconnects immediately afterwards; `Errored` is
    /// never observable across a suspension point.
    pub fn fail(&mut self) {
        self.connection = ConnectionState::Errored;
    }

    /// Terminal cleanup: release playback and mark `Disconnected`.
    pub fn close(&mut self) {
        self.playback = PlaybackState::Stopped;
        self.connection = ConnectionState::Disconnected;
    }

    /// Stores a validated speed factor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSpeed`] for zero, negative, or non-finite
    /// factors; the stored speed is left untouched in that case.
    pub fn set_speed(&mut self, factor: f64) -> Result<()> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(Error::invalid_speed(factor));
        }
        self.speed = factor;
        Ok(())
    }

    /// Records the timestamp of a forwarded frame.
    #[inline]
    pub fn record_frame(&mut self, timestamp_ms: i64) {
        self.last_frame_ms = Some(timestamp_ms);
    }

    /// Builds the state error for a command that is invalid right now.
    #[must_use]
    pub fn invalid(&self, command: &str) -> Error {
        Error::invalid_transition(command, self.connection, self.playback)
    }
}

// ============================================================================
// Tests
// ============================================================================
