//! Session — handshake and lockstep request/response over one transport.
//!
//! ARCHITECTURE
//! ============
//! Opening a session connects the transport and waits for two outer events,
//! `ms.channel.connect` then `ms.channel.ready`. Once `Ready`, every request
//! is sent, then exactly one frame is received and checked against the
//! caller's expected events before the next request may go out.
//!
//! DESIGN
//! ======
//! - Responses are matched by event name only. The `id` assigned to each
//!   request is kept for logging; the TV is not known to echo it.
//! - Transport errors, timeouts and handshake failures leave the session
//!   `Failed`. Mismatch and codec errors fail the current call and keep the
//!   session `Ready`, because the offending response has been consumed.
//! - `&mut self` on every operation serializes access; share a session across
//!   tasks behind a `tokio::sync::Mutex`.

use std::time::Duration;

use frames::{DecodedMessage, EncodedBinary, EncodedRequest, InnerRequest};
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::ArtModeError;
use crate::transport::{Transport, TransportError, WsTransport};

/// First outer event after connecting.
pub const CHANNEL_CONNECT: &str = "ms.channel.connect";

/// Second outer event; the channel accepts requests after it.
pub const CHANNEL_READY: &str = "ms.channel.ready";

/// Outer event wrapping every art-app response.
pub const RESPONSE_EVENT: &str = "d2d_service_message";

/// Lifecycle of a [`Session`].
///
/// The handshake states are only held inside [`Session::handshake`]; a
/// returned session starts `Ready`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    AwaitingConnectAck,
    AwaitingReady,
    Ready,
    Closed,
    Failed,
}

/// Events a response must carry. `None` skips that check.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Expect<'a> {
    pub event: Option<&'a str>,
    pub data_event: Option<&'a str>,
}

impl<'a> Expect<'a> {
    /// Expect the standard art-app response wrapper.
    #[must_use]
    pub fn response() -> Self {
        Self {
            event: Some(RESPONSE_EVENT),
            data_event: None,
        }
    }

    /// Accept any response.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn data_event(mut self, data_event: &'a str) -> Self {
        self.data_event = Some(data_event);
        self
    }
}

pub struct Session<T> {
    transport: T,
    state: SessionState,
    recv_timeout: Option<Duration>,
    last_request_id: Option<String>,
}

impl Session<WsTransport> {
    /// Connect to the art-app channel described by `config` and complete the
    /// handshake.
    ///
    /// # Errors
    ///
    /// Returns [`ArtModeError::Connection`] if the websocket cannot be opened
    /// and [`ArtModeError::Handshake`] if the TV sends unexpected events.
    pub async fn open(config: &ClientConfig) -> Result<Self, ArtModeError> {
        let endpoint = config.endpoint();
        tracing::debug!(%endpoint, "opening art-app channel");
        let transport = WsTransport::connect(&endpoint).await.inspect_err(|error| {
            tracing::warn!(%endpoint, %error, "art-app channel connect failed");
        })?;
        Self::handshake(transport, config.recv_timeout).await
    }
}

impl<T: Transport> Session<T> {
    /// Run the channel handshake over an already connected transport.
    ///
    /// # Errors
    ///
    /// Returns [`ArtModeError::Handshake`] when either sentinel event is
    /// wrong, or the receive error that interrupted the handshake.
    pub async fn handshake(transport: T, recv_timeout: Option<Duration>) -> Result<Self, ArtModeError> {
        let mut session = Self {
            transport,
            state: SessionState::AwaitingConnectAck,
            recv_timeout,
            last_request_id: None,
        };

        session.expect_handshake_event(CHANNEL_CONNECT).await?;
        session.state = SessionState::AwaitingReady;
        session.expect_handshake_event(CHANNEL_READY).await?;
        session.state = SessionState::Ready;

        tracing::info!("art-app channel ready");
        Ok(session)
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Correlation id of the most recent request, if any was sent.
    #[must_use]
    pub fn last_request_id(&self) -> Option<&str> {
        self.last_request_id.as_deref()
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send one request and wait for its response.
    ///
    /// With a `payload` the request goes out as a length-prefixed binary
    /// frame; otherwise as text. Returns the normalized response data.
    ///
    /// # Errors
    ///
    /// - [`ArtModeError::Closed`] or [`ArtModeError::Connection`] when the
    ///   session was closed or has failed.
    /// - [`ArtModeError::Codec`] for oversized envelopes or undecodable
    ///   responses.
    /// - [`ArtModeError::ProtocolMismatch`] when `expect` does not match.
    /// - [`ArtModeError::Timeout`] when the receive deadline passes.
    pub async fn request(
        &mut self,
        request: &InnerRequest,
        expect: Expect<'_>,
        payload: Option<&[u8]>,
    ) -> Result<Value, ArtModeError> {
        self.ensure_ready()?;

        let id = match payload {
            Some(payload) => {
                let EncodedBinary { id, bytes } = frames::encode_binary_frame(request, payload)?;
                tracing::debug!(request = request.name(), %id, bytes = bytes.len(), "sending binary request");
                let sent = self.transport.send_binary(bytes).await;
                sent.map_err(|error| self.fail(error))?;
                id
            }
            None => {
                let EncodedRequest { id, text } = frames::encode_request(request)?;
                tracing::debug!(request = request.name(), %id, bytes = text.len(), "sending request");
                let sent = self.transport.send_text(text).await;
                sent.map_err(|error| self.fail(error))?;
                id
            }
        };
        self.last_request_id = Some(id);

        let message = self.recv().await?;
        check_expectation(&message, expect)?;
        Ok(message.into_data())
    }

    /// Close the connection. Closing an already closed session is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`ArtModeError::Connection`] if the close handshake fails; the
    /// session is `Closed` either way.
    pub async fn close(&mut self) -> Result<(), ArtModeError> {
        match self.state {
            SessionState::Closed => return Ok(()),
            SessionState::Failed => {
                self.state = SessionState::Closed;
                return Ok(());
            }
            _ => {}
        }

        let closed = self.transport.close().await;
        self.state = SessionState::Closed;
        tracing::info!("art-app channel closed");
        closed.map_err(ArtModeError::from)
    }

    async fn expect_handshake_event(&mut self, expected: &'static str) -> Result<(), ArtModeError> {
        let message = match self.recv().await {
            Ok(message) => message,
            Err(error) => {
                self.state = SessionState::Failed;
                return Err(error);
            }
        };

        if message.event != expected {
            tracing::warn!(expected, found = %message.event, "unexpected handshake event");
            self.state = SessionState::Failed;
            return Err(ArtModeError::Handshake {
                expected,
                found: message.event,
            });
        }

        tracing::debug!(event = expected, "handshake step complete");
        Ok(())
    }

    async fn recv(&mut self) -> Result<DecodedMessage, ArtModeError> {
        let received = match self.recv_timeout {
            Some(deadline) => match tokio::time::timeout(deadline, self.transport.receive()).await {
                Ok(received) => received,
                Err(_) => {
                    tracing::warn!(?deadline, "receive deadline elapsed");
                    self.state = SessionState::Failed;
                    return Err(ArtModeError::Timeout(deadline));
                }
            },
            None => self.transport.receive().await,
        };

        let frame = received.map_err(|error| self.fail(error))?;
        let message = frames::decode_frame(&frame).inspect_err(|error| {
            tracing::warn!(%error, bytes = frame.len(), "failed to decode frame");
        })?;
        tracing::debug!(
            event = %message.event,
            data_event = message.data_event().unwrap_or_default(),
            "received frame"
        );
        Ok(message)
    }

    fn ensure_ready(&self) -> Result<(), ArtModeError> {
        match self.state {
            SessionState::Failed => Err(ArtModeError::Connection(TransportError::Unusable)),
            SessionState::Closed => Err(ArtModeError::Closed),
            _ => Ok(()),
        }
    }

    fn fail(&mut self, error: TransportError) -> ArtModeError {
        tracing::warn!(%error, "art-app channel failed");
        self.state = SessionState::Failed;
        ArtModeError::Connection(error)
    }
}

fn check_expectation(message: &DecodedMessage, expect: Expect<'_>) -> Result<(), ArtModeError> {
    if let Some(expected) = expect.event {
        if message.event != expected {
            tracing::warn!(expected, found = %message.event, "unexpected response event");
            return Err(ArtModeError::ProtocolMismatch {
                expected: expected.to_owned(),
                found: message.event.clone(),
            });
        }
    }

    if let Some(expected) = expect.data_event {
        let found = message.data_event();
        if found != Some(expected) {
            tracing::warn!(expected, found = found.unwrap_or_default(), "unexpected data event");
            return Err(ArtModeError::ProtocolMismatch {
                expected: expected.to_owned(),
                found: found.unwrap_or("<none>").to_owned(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
