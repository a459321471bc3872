//! Inbound command definitions and classification.
//!
//! Commands arrive as JSON text frames. [`decode`] splits the input into
//! three outcomes the session treats differently:
//!
//! - a known, well-formed command ([`Inbound::Command`]),
//! - a structurally valid message of an unknown `type`
//!   ([`Inbound::Unknown`], logged and ignored at the boundary),
//! - malformed input (a protocol error, reported back to the client).

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

// ============================================================================
// Command Set
// ============================================================================

/// Wire names of every command the gateway understands.
const COMMAND_TYPES: [&str; 5] = ["start_stream", "play", "pause", "stop_stream", "set_speed"];

/// Control commands a client may send on a stream socket.
///
/// The closed command set; anything else is either [`Inbound::Unknown`] or a
/// protocol error. Validity against the session's current state is enforced
/// by the session, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Open the frame source and begin playback.
    ///
    /// Accepted once per session; the URL is fixed afterwards.
    StartStream {
        /// Locator of the camera or feed to open.
        rtsp_url: String,
    },

    /// Start or resume frame delivery.
    Play,

    /// Suspend frame delivery without releasing the source.
    Pause,

    /// Release the frame source; the connection stays open.
    StopStream,

    /// Change the playback rate.
    SetSpeed {
        /// Rate factor; must be a positive finite number.
        speed: f64,
    },
}

impl Command {
    /// Returns the command's wire name, as used in logs and error events.
    #[inline]
    #[must_use]
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::StartStream { .. } => "start_stream",
            Self::Play => "play",
            Self::Pause => "pause",
            Self::StopStream => "stop_stream",
            Self::SetSpeed { .. } => "set_speed",
        }
    }
}

// ============================================================================
// Inbound Classification
// ============================================================================

/// Result of decoding one inbound text frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// A well-formed command from the known set.
    Command(Command),

    /// A JSON object with a string `type` outside the command set.
    ///
    /// Treated as a no-op by the session; logged at the boundary.
    Unknown {
        /// The unrecognized `type` value.
        kind: String,
    },
}

/// Decodes one inbound text frame.
///
/// # Errors
///
/// Returns [`Error::Protocol`] when the input is not valid JSON, is not an
/// object, lacks a string `type` field, or names a known command with
/// missing or ill-typed fields. Unknown `type` values are not errors; they
/// decode to [`Inbound::Unknown`].
pub fn decode(text: &str) -> Result<Inbound> {
    let value: Value =
        serde_json::from_str(text).map_err(|_| Error::protocol("invalid JSON message"))?;

    if !value.is_object() {
        return Err(Error::protocol("message must be a JSON object"));
    }

    let Some(kind) = value.get("type").and_then(Value::as_str) else {
        return Err(Error::protocol("message is missing a string 'type' field"));
    };

    if !COMMAND_TYPES.contains(&kind) {
        return Ok(Inbound::Unknown { kind: kind.into() });
    }

    let kind = kind.to_string();
    serde_json::from_value::<Command>(value)
        .map(Inbound::Command)
        .map_err(|e| Error::protocol(format!("malformed '{kind}' command: {e}")))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    fn decode_command(text: &str) -> Command {
        match decode(text).expect("decode") {
            Inbound::Command(cmd) => cmd,
            other => panic!("expected command, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_start_stream() {
        let cmd = decode_command(r#"{"type": "start_stream", "rtsp_url": "rtsp://cam/1"}"#);
        assert_eq!(
            cmd,
            Command::StartStream {
                rtsp_url: "rtsp://cam/1".into()
            }
        );
        assert_eq!(cmd.wire_name(), "start_stream");
    }

    #[test]
    fn test_decode_bare_commands() {
        assert_eq!(decode_command(r#"{"type": "play"}"#), Command::Play);
        assert_eq!(decode_command(r#"{"type": "pause"}"#), Command::Pause);
        assert_eq!(
            decode_command(r#"{"type": "stop_stream"}"#),
            Command::StopStream
        );
    }

    #[test]
    fn test_decode_set_speed() {
        let cmd = decode_command(r#"{"type": "set_speed", "speed": 1.5}"#);
        assert_eq!(cmd, Command::SetSpeed { speed: 1.5 });
    }

    #[test]
    fn test_decode_tolerates_extra_fields() {
        let cmd = decode_command(r#"{"type": "play", "requested_by": "ui"}"#);
        assert_eq!(cmd, Command::Play);
    }

    #[test]
    fn test_unknown_type_is_not_an_error() {
        let inbound = decode(r#"{"type": "subscribe_metadata"}"#).expect("decode");
        assert_eq!(
            inbound,
            Inbound::Unknown {
                kind: "subscribe_metadata".into()
            }
        );
    }

    #[test]
    fn test_invalid_json_is_protocol_error() {
        let err = decode("{nope").unwrap_err();
        assert!(err.is_protocol_error());
        assert_eq!(err.to_string(), "Protocol error: invalid JSON message");
    }

    #[test]
    fn test_non_object_is_protocol_error() {
        let err = decode(r#"["play"]"#).unwrap_err();
        assert!(err.is_protocol_error());
    }

    #[test]
    fn test_missing_type_is_protocol_error() {
        let err = decode(r#"{"speed": 2.0}"#).unwrap_err();
        assert!(err.is_protocol_error());
    }

    #[test]
    fn test_missing_field_is_protocol_error() {
        let err = decode(r#"{"type": "start_stream"}"#).unwrap_err();
        assert!(err.is_protocol_error());
        assert!(err.to_string().contains("start_stream"));
    }

    #[test]
    fn test_ill_typed_field_is_protocol_error() {
        let err = decode(r#"{"type": "set_speed", "speed": "fast"}"#).unwrap_err();
        assert!(err.is_protocol_error());
    }

    #[test]
    fn test_command_serialization_round_trip() {
        let cmd = Command::SetSpeed { speed: 2.0 };
        let json = serde_json::to_string(&cmd).expect("serialize");
        assert_eq!(json, r#"{"type":"set_speed","speed":2.0}"#);

        let back = decode_command(&json);
        assert_eq!(back, cmd);
    }

    proptest! {
        // Classification is total: arbitrary input decodes to a command,
        // an unknown, or a protocol error, and never panics.
        #[test]
        fn decode_never_panics(input in ".{0,256}") {
            match decode(&input) {
                Ok(Inbound::Command(_)) | Ok(Inbound::Unknown { .. }) => {}
                Err(err) => prop_assert!(err.is_protocol_error()),
            }
        }
    }
}
