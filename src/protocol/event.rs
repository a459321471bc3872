//! Outbound event message types.
//!
//! Events are pushed to the client over the stream socket. Every event is
//! stamped with the [`StreamId`] it concerns, so clients multiplexing
//! several sockets can route by payload alone. Frame payloads cross this
//! boundary already base64-encoded; raw bytes never leave the session.

// ============================================================================
// Imports
// ============================================================================

use base64::Engine;
use base64::engine::general_purpose::STANDARD as Base64Standard;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::identifiers::StreamId;
use crate::source::Frame;

// ============================================================================
// Event Enum
// ============================================================================

/// Status and frame events sent to the client.
///
/// The closed event set of the wire protocol. Variants mirror the session
/// state machine: lifecycle acknowledgements, frame delivery, and error
/// reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// The transport is open and the session is waiting for `start_stream`.
    ConnectionEstablished {
        /// Stream this session serves.
        stream_id: StreamId,
    },

    /// A frame source subscription was opened and playback began.
    ///
    /// Sent for the initial `start_stream` and again for every `play` that
    /// reopens the source after `stop_stream`.
    StreamStarted {
        /// Stream this session serves.
        stream_id: StreamId,
        /// URL the subscription was opened for.
        rtsp_url: String,
    },

    /// One decoded frame.
    Frame {
        /// Stream this session serves.
        stream_id: StreamId,
        /// Base64-encoded image payload.
        frame: String,
        /// Source timestamp, milliseconds since the Unix epoch.
        timestamp: i64,
    },

    /// Frame delivery was suspended; the source stays open.
    StreamPaused {
        /// Stream this session serves.
        stream_id: StreamId,
    },

    /// Frame delivery resumed after a pause.
    StreamResumed {
        /// Stream this session serves.
        stream_id: StreamId,
    },

    /// The frame source subscription was released.
    StreamStopped {
        /// Stream this session serves.
        stream_id: StreamId,
    },

    /// The playback rate changed.
    SpeedChanged {
        /// Stream this session serves.
        stream_id: StreamId,
        /// The newly stored rate factor.
        speed: f64,
    },

    /// A protocol, state, or source error report.
    Error {
        /// Stream this session serves.
        stream_id: StreamId,
        /// Human-readable description of the failure.
        message: String,
    },
}

// ============================================================================
// Event Implementation
// ============================================================================

impl Event {
    /// Builds a `frame` event from a decoded frame, base64-encoding the
    /// payload.
    #[must_use]
    pub fn frame(stream_id: StreamId, frame: &Frame) -> Self {
        Self::Frame {
            stream_id,
            frame: Base64Standard.encode(&frame.payload),
            timestamp: frame.timestamp_ms,
        }
    }

    /// Builds an `error` event carrying the error's display rendering.
    #[inline]
    #[must_use]
    pub fn error(stream_id: StreamId, error: &Error) -> Self {
        Self::Error {
            stream_id,
            message: error.to_string(),
        }
    }

    /// Returns the event's wire name.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConnectionEstablished { .. } => "connection_established",
            Self::StreamStarted { .. } => "stream_started",
            Self::Frame { .. } => "frame",
            Self::StreamPaused { .. } => "stream_paused",
            Self::StreamResumed { .. } => "stream_resumed",
            Self::StreamStopped { .. } => "stream_stopped",
            Self::SpeedChanged { .. } => "speed_changed",
            Self::Error { .. } => "error",
        }
    }

    /// Returns the stream id stamped on the event.
    #[inline]
    #[must_use]
    pub fn stream_id(&self) -> StreamId {
        match self {
            Self::ConnectionEstablished { stream_id }
            | Self::StreamStarted { stream_id, .. }
            | Self::Frame { stream_id, .. }
            | Self::StreamPaused { stream_id }
            | Self::StreamResumed { stream_id }
            | Self::StreamStopped { stream_id }
            | Self::SpeedChanged { stream_id, .. }
            | Self::Error { stream_id, .. } => *stream_id,
        }
    }

    /// Serializes the event to its wire form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if serialization fails.
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::Value;
    use uuid::Uuid;

    fn id() -> StreamId {
        StreamId::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8").expect("uuid")
    }

    #[test]
    fn test_connection_established_shape() {
        let json = Event::ConnectionEstablished { stream_id: id() }
            .encode()
            .expect("encode");
        let value: Value = serde_json::from_str(&json).expect("parse");

        assert_eq!(value["type"], "connection_established");
        assert_eq!(value["stream_id"], "67e55044-10b1-426f-9247-bb680e5fe0c8");
    }

    #[test]
    fn test_frame_event_encodes_payload_as_base64() {
        let frame = Frame {
            payload: vec![0xFF, 0xD8, 0xFF, 0xE0],
            timestamp_ms: 1_700_000_000_123,
        };
        let event = Event::frame(id(), &frame);

        let value: Value = serde_json::from_str(&event.encode().expect("encode")).expect("parse");
        assert_eq!(value["type"], "frame");
        assert_eq!(value["timestamp"], 1_700_000_000_123_i64);

        let encoded = value["frame"].as_str().expect("frame field");
        let decoded = Base64Standard.decode(encoded).expect("base64");
        assert_eq!(decoded, frame.payload);
    }

    #[test]
    fn test_error_event_carries_display_message() {
        let err = Error::invalid_speed(0.0);
        let event = Event::error(id(), &err);

        let value: Value = serde_json::from_str(&event.encode().expect("encode")).expect("parse");
        assert_eq!(value["type"], "error");
        assert_eq!(
            value["message"],
            "Invalid speed factor 0: must be a positive number"
        );
    }

    #[test]
    fn test_speed_changed_shape() {
        let event = Event::SpeedChanged {
            stream_id: id(),
            speed: 2.0,
        };
        let value: Value = serde_json::from_str(&event.encode().expect("encode")).expect("parse");
        assert_eq!(value["type"], "speed_changed");
        assert_eq!(value["speed"], 2.0);
    }

    #[test]
    fn test_client_side_deserialization() {
        let stream_id = StreamId::new(Uuid::new_v4());
        let json = format!(r#"{{"type":"stream_stopped","stream_id":"{stream_id}"}}"#);

        let event: Event = serde_json::from_str(&json).expect("parse event");
        assert_eq!(event, Event::StreamStopped { stream_id });
        assert_eq!(event.kind(), "stream_stopped");
        assert_eq!(event.stream_id(), stream_id);
    }
}
