//! Identifier newtypes used across the crate.
//!
//! Stream identifiers are opaque to the session core: they are minted by the
//! external stream registry and arrive here as path segments on the transport
//! or as fields on registry records. The core parses and compares them, it
//! never generates them.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

// ============================================================================
// StreamId
// ============================================================================

/// Unique identifier for one stream.
///
/// Wraps a UUID. On the wire it appears as the canonical hyphenated string,
/// both in the transport path (`/ws/stream/{id}`) and in the `stream_id`
/// field stamped on every outbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamId(Uuid);

impl StreamId {
    /// Creates a stream id from an existing UUID.
    #[inline]
    #[must_use]
    pub const fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Parses a stream id from its canonical string form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the input is not a valid UUID.
    pub fn parse_str(input: &str) -> Result<Self> {
        Uuid::parse_str(input)
            .map(Self)
            .map_err(|e| Error::protocol(format!("invalid stream id '{input}': {e}")))
    }

    /// Returns the underlying UUID.
    #[inline]
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for StreamId {
    #[inline]
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl FromStr for StreamId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_str(s)
    }
}

// ============================================================================
// Tests
// ============================================================================
