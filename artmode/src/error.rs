//! Error taxonomy for session and protocol operations.

use std::time::Duration;

use frames::CodecError;

use crate::transport::TransportError;

/// Error returned by [`crate::Session`] and the protocol operations.
#[derive(Debug, thiserror::Error)]
pub enum ArtModeError {
    /// The websocket could not be opened, dropped, or failed earlier.
    #[error("connection error: {0}")]
    Connection(#[from] TransportError),
    /// The channel handshake produced an unexpected outer event.
    #[error("handshake failed: expected `{expected}`, found `{found}`")]
    Handshake {
        expected: &'static str,
        found: String,
    },
    /// An inbound frame could not be decoded, or an outbound one encoded.
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// A response arrived with a different event than the call expected.
    #[error("protocol mismatch: expected `{expected}`, found `{found}`")]
    ProtocolMismatch { expected: String, found: String },
    /// No frame arrived before the configured receive deadline.
    #[error("timed out after {0:?} waiting for a frame")]
    Timeout(Duration),
    /// The session was closed by the caller.
    #[error("session is closed")]
    Closed,
}

impl ArtModeError {
    /// Whether the session that produced this error can no longer be used.
    ///
    /// Mismatch and codec errors only fail the current call; everything else
    /// leaves the session `Failed` or `Closed`.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::Handshake { .. } | Self::Timeout(_) | Self::Closed
        )
    }
}
