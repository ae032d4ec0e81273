//! Duplex message transport underneath a [`crate::Session`].

use frames::Frame;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The websocket connect, send, or receive failed.
    #[error("websocket error: {0}")]
    Ws(Box<tungstenite::Error>),
    /// The peer closed the connection or the stream ended.
    #[error("websocket closed")]
    Closed,
    /// The session already failed; the connection is not used again.
    #[error("connection unusable after an earlier failure")]
    Unusable,
}

impl From<tungstenite::Error> for TransportError {
    fn from(error: tungstenite::Error) -> Self {
        match error {
            tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
                Self::Closed
            }
            other => Self::Ws(Box::new(other)),
        }
    }
}

/// Send text/binary messages and receive one message at a time.
///
/// `receive` resolves only with a complete text or binary message; control
/// frames are handled underneath.
#[async_trait::async_trait]
pub trait Transport: Send {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;
    async fn send_binary(&mut self, bytes: Vec<u8>) -> Result<(), TransportError>;
    async fn receive(&mut self) -> Result<Frame, TransportError>;
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// [`Transport`] over a `tokio-tungstenite` client stream.
pub struct WsTransport {
    stream: WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
}

impl WsTransport {
    /// Open a websocket to `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the TCP connect or websocket upgrade fails.
    pub async fn connect(url: &str) -> Result<Self, TransportError> {
        let (stream, response) = connect_async(url).await?;
        tracing::debug!(%url, status = %response.status(), "websocket connected");
        Ok(Self { stream })
    }
}

#[async_trait::async_trait]
impl Transport for WsTransport {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.stream.send(Message::Text(text.into())).await?;
        Ok(())
    }

    async fn send_binary(&mut self, bytes: Vec<u8>) -> Result<(), TransportError> {
        self.stream.send(Message::Binary(bytes.into())).await?;
        Ok(())
    }

    async fn receive(&mut self) -> Result<Frame, TransportError> {
        loop {
            let Some(message) = self.stream.next().await else {
                return Err(TransportError::Closed);
            };
            match message? {
                Message::Text(text) => return Ok(Frame::Text(text.as_str().to_owned())),
                Message::Binary(bytes) => return Ok(Frame::Binary(bytes.to_vec())),
                Message::Close(_) => return Err(TransportError::Closed),
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        match self.stream.close(None).await {
            Ok(()) | Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                Ok(())
            }
            Err(error) => Err(error.into()),
        }
    }
}
