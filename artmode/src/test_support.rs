//! Scripted in-memory transport for session and operation tests.

use std::collections::VecDeque;

use frames::Frame;
use serde_json::{Value, json};

use crate::session::Session;
use crate::transport::{Transport, TransportError};

/// Replays queued inbound frames and records everything sent.
///
/// When the queue is empty, `receive` fails with `Closed`, or never resolves
/// if `stall_when_empty` is set.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    pub incoming: VecDeque<Result<Frame, TransportError>>,
    pub sent: Vec<Frame>,
    pub close_calls: usize,
    pub fail_sends: bool,
    pub stall_when_empty: bool,
}

impl ScriptedTransport {
    pub fn new<I: IntoIterator<Item = Frame>>(frames: I) -> Self {
        Self {
            incoming: frames.into_iter().map(Ok).collect(),
            ..Self::default()
        }
    }

    /// Transport that yields the two handshake sentinels followed by `frames`.
    pub fn after_handshake<I: IntoIterator<Item = Frame>>(frames: I) -> Self {
        Self::new(handshake_frames().into_iter().chain(frames))
    }
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        if self.fail_sends {
            return Err(TransportError::Closed);
        }
        self.sent.push(Frame::Text(text));
        Ok(())
    }

    async fn send_binary(&mut self, bytes: Vec<u8>) -> Result<(), TransportError> {
        if self.fail_sends {
            return Err(TransportError::Closed);
        }
        self.sent.push(Frame::Binary(bytes));
        Ok(())
    }

    async fn receive(&mut self) -> Result<Frame, TransportError> {
        match self.incoming.pop_front() {
            Some(next) => next,
            None if self.stall_when_empty => std::future::pending().await,
            None => Err(TransportError::Closed),
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.close_calls += 1;
        Ok(())
    }
}

pub fn text(value: &Value) -> Frame {
    Frame::Text(value.to_string())
}

pub fn handshake_frames() -> Vec<Frame> {
    vec![
        text(&json!({ "event": "ms.channel.connect", "data": {} })),
        text(&json!({ "event": "ms.channel.ready", "data": {} })),
    ]
}

/// Art-app response whose `data` is a JSON-encoded string, as the TV sends it.
pub fn response(data: &Value) -> Frame {
    text(&json!({ "event": "d2d_service_message", "data": data.to_string() }))
}

pub async fn ready_session<I: IntoIterator<Item = Frame>>(frames: I) -> Session<ScriptedTransport> {
    Session::handshake(ScriptedTransport::after_handshake(frames), None)
        .await
        .expect("handshake should succeed")
}

/// Inner request object carried by a sent text or binary frame.
pub fn sent_inner(frame: &Frame) -> Value {
    let envelope = match frame {
        Frame::Text(text) => text.as_str(),
        Frame::Binary(bytes) => frames::split_binary_frame(bytes).expect("binary frame").0,
    };
    let outer: Value = serde_json::from_str(envelope).expect("envelope json");
    let data = outer["params"]["data"].as_str().expect("data string");
    serde_json::from_str(data).expect("inner json")
}
