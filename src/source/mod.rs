//! Frame source collaborator boundary.
//!
//! A frame source turns a stream URL into a lazy, unbounded sequence of
//! timestamped frames. The decode/capture engine itself is out of scope for
//! this crate; sessions drive it exclusively through the traits defined
//! here. One subscription serves exactly one session: there is no fan-out,
//! and a stopped subscription is only ever restarted by opening a new one.
//!
//! [`TestPatternSource`] ships as a built-in implementation that needs no
//! camera, for demos and downstream integration tests.
//!
//! | Item | Role |
//! |------|------|
//! | [`Frame`] | One decoded image with its source timestamp |
//! | [`FrameSource`] | Opens subscriptions for a URL |
//! | [`FrameSubscription`] | Yields frames, adjusts rate, releases resources |

// ============================================================================
// Submodules
// ============================================================================

/// Built-in synthetic source producing a moving test pattern.
pub mod pattern;

pub use pattern::TestPatternSource;

// ============================================================================
// Imports
// ============================================================================

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;

use crate::error::Result;

// ============================================================================
// Frame
// ============================================================================

/// One decoded frame as produced by a frame source.
///
/// The payload is an encoded image (JPEG for the built-in sources); the
/// session forwards it opaquely and the codec base64-encodes it at the wire
/// boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Encoded image bytes.
    pub payload: Vec<u8>,
    /// Capture timestamp, milliseconds since the Unix epoch.
    ///
    /// Sources must produce non-decreasing timestamps; sessions forward
    /// frames without reordering.
    pub timestamp_ms: i64,
}

impl Frame {
    /// Creates a frame from payload bytes and a timestamp.
    #[inline]
    #[must_use]
    pub fn new(payload: Vec<u8>, timestamp_ms: i64) -> Self {
        Self {
            payload,
            timestamp_ms,
        }
    }
}

/// Returns the current wall-clock time in milliseconds since the Unix epoch.
///
/// Convenience for source implementations stamping live captures.
#[must_use]
pub fn epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as i64)
}

// ============================================================================
// FrameSource
// ============================================================================

/// Factory for frame subscriptions.
///
/// Implementations wrap a decode/capture engine. `open` is called once per
/// playback start; each call must produce an independent subscription.
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Opens a subscription for the given source URL.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::SourceUnavailable`] if the URL cannot be
    /// reached or the decode engine refuses it.
    async fn open(&self, url: &str) -> Result<Box<dyn FrameSubscription>>;
}

// ============================================================================
// FrameSubscription
// ============================================================================

/// One live decode subscription.
///
/// Owned exclusively by one session, which polls `next_frame` in its event
/// loop. `next_frame` must be cancel-safe: the session drops the in-flight
/// future whenever a command or transport message wins the race, and polls
/// again on the next loop turn.
#[async_trait]
pub trait FrameSubscription: Send {
    /// Waits for the next frame.
    ///
    /// Returns `Ok(Some(frame))` for a produced frame, `Ok(None)` when the
    /// source is exhausted (end of a finite feed), and an error when the
    /// source fails. After `Ok(None)` or an error the subscription yields
    /// nothing further; restarting requires a new subscription.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Source`] when decoding fails or the feed
    /// becomes unreachable mid-stream.
    async fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Adjusts the production rate by a factor relative to real time.
    ///
    /// Best-effort: sources that cannot retime (live cameras) ignore it.
    /// The session only forwards validated factors (positive, finite), and
    /// implementations must tolerate that entire range, clamping internally
    /// where their pacing cannot represent it.
    async fn set_rate(&mut self, _factor: f64) {}

    /// Releases the underlying decode resources.
    ///
    /// Idempotent and safe to call after a failure. The session awaits this
    /// on every exit path before its cleanup returns.
    async fn close(&mut self);
}
