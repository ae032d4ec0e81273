//! Envelope model and codec for the art-app channel.
//!
//! Every request the client sends is wrapped twice: the operation itself is
//! a JSON object (`request`, `id`, operation fields) that gets serialized to a
//! string and embedded in an `ms.channel.emit` envelope. Image uploads use a
//! binary message: a 2-byte big-endian length, the envelope text, then the raw
//! image bytes.
//!
//! Inbound messages are `{event, data}` where `data` is either a JSON object
//! or a string holding more JSON. [`decode_frame`] normalizes both shapes so
//! callers never look at how the payload arrived.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

// =============================================================================
// WIRE CONSTANTS
// =============================================================================

/// Outer method for every client request.
pub const EMIT_METHOD: &str = "ms.channel.emit";

/// Envelope `params.event` for art-app requests.
pub const ART_APP_REQUEST: &str = "art_app_request";

/// Envelope `params.to` target.
pub const EMIT_TARGET: &str = "host";

/// Largest envelope the 2-byte length prefix can describe.
pub const MAX_ENVELOPE_LEN: usize = u16::MAX as usize;

/// Error returned by the encode/decode functions in this crate.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The frame text is not valid JSON, or does not have the envelope shape.
    #[error("failed to decode frame: {0}")]
    Json(#[from] serde_json::Error),
    /// The top-level `event` key is absent.
    #[error("frame has no `event` field")]
    MissingEvent,
    /// `data` arrived as a string that does not hold valid JSON.
    #[error("failed to decode nested data: {0}")]
    NestedJson(serde_json::Error),
    /// A field the operation requires is absent from the payload.
    #[error("missing expected field `{0}`")]
    MissingField(&'static str),
    /// The envelope text cannot be described by the 2-byte length prefix.
    #[error("envelope is {len} bytes, limit is {MAX_ENVELOPE_LEN}")]
    PayloadTooLarge { len: usize },
    /// A binary message arrived where only text responses are expected.
    #[error("unexpected binary frame ({len} bytes)")]
    UnexpectedBinary { len: usize },
}

/// A single message on the websocket, as seen by the codec.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

impl Frame {
    /// Byte length of the message body.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Binary(bytes) => bytes.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// OUTBOUND
// =============================================================================

/// Inner request object: a `request` name plus operation fields.
///
/// The correlation `id` is not set here; it is injected at encode time so a
/// request value can never be sent twice with the same id.
#[derive(Clone, Debug, PartialEq)]
pub struct InnerRequest {
    fields: Map<String, Value>,
}

impl InnerRequest {
    #[must_use]
    pub fn new(request: &str) -> Self {
        let mut fields = Map::new();
        fields.insert("request".to_owned(), Value::String(request.to_owned()));
        Self { fields }
    }

    /// Add an operation field. An `id` set here is replaced at encode time.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_owned(), value.into());
        self
    }

    /// Operation name carried in the `request` field.
    #[must_use]
    pub fn name(&self) -> &str {
        self.fields
            .get("request")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

/// Text envelope ready to send, with the id that was assigned to it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedRequest {
    pub id: String,
    pub text: String,
}

/// Binary frame ready to send, with the id that was assigned to it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedBinary {
    pub id: String,
    pub bytes: Vec<u8>,
}

#[derive(Serialize)]
struct Envelope<'a> {
    method: &'static str,
    params: EnvelopeParams<'a>,
}

#[derive(Serialize)]
struct EnvelopeParams<'a> {
    event: &'static str,
    to: &'static str,
    data: &'a str,
}

/// Assign a fresh correlation id and wrap the request in the emit envelope.
///
/// # Errors
///
/// Returns [`CodecError::Json`] if the request cannot be serialized.
pub fn encode_request(request: &InnerRequest) -> Result<EncodedRequest, CodecError> {
    let id = Uuid::new_v4().to_string();
    let mut fields = request.fields.clone();
    fields.insert("id".to_owned(), Value::String(id.clone()));

    let inner = serde_json::to_string(&fields)?;
    let text = serde_json::to_string(&Envelope {
        method: EMIT_METHOD,
        params: EnvelopeParams {
            event: ART_APP_REQUEST,
            to: EMIT_TARGET,
            data: &inner,
        },
    })?;

    Ok(EncodedRequest { id, text })
}

/// Encode a request as `[u16 BE length][envelope text][payload]`.
///
/// # Errors
///
/// Returns [`CodecError::PayloadTooLarge`] when the envelope text exceeds
/// [`MAX_ENVELOPE_LEN`] bytes.
pub fn encode_binary_frame(
    request: &InnerRequest,
    payload: &[u8],
) -> Result<EncodedBinary, CodecError> {
    let EncodedRequest { id, text } = encode_request(request)?;
    let len = u16::try_from(text.len()).map_err(|_| CodecError::PayloadTooLarge { len: text.len() })?;

    let mut bytes = Vec::with_capacity(2 + text.len() + payload.len());
    bytes.extend_from_slice(&len.to_be_bytes());
    bytes.extend_from_slice(text.as_bytes());
    bytes.extend_from_slice(payload);

    Ok(EncodedBinary { id, bytes })
}

/// Split a binary frame back into envelope text and payload.
///
/// Returns `None` when the prefix claims more bytes than the frame holds or
/// the envelope is not UTF-8.
#[must_use]
pub fn split_binary_frame(bytes: &[u8]) -> Option<(&str, &[u8])> {
    let (prefix, rest) = bytes.split_first_chunk::<2>()?;
    let len = usize::from(u16::from_be_bytes(*prefix));
    if rest.len() < len {
        return None;
    }
    let (text, payload) = rest.split_at(len);
    Some((std::str::from_utf8(text).ok()?, payload))
}

// =============================================================================
// INBOUND
// =============================================================================

/// How `data` arrived on the wire.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireData {
    Encoded(String),
    Structured(Value),
}

impl WireData {
    fn normalize(self) -> Result<Value, CodecError> {
        match self {
            Self::Encoded(text) => serde_json::from_str(&text).map_err(CodecError::NestedJson),
            Self::Structured(value) => Ok(value),
        }
    }
}

#[derive(Debug, Deserialize)]
struct InboundEnvelope {
    event: Option<String>,
    #[serde(default)]
    data: Option<WireData>,
}

/// An inbound message after both decode passes.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedMessage {
    /// Outer event name, e.g. `"ms.channel.ready"`.
    pub event: String,
    /// Normalized payload; `null` when the message carried no `data`.
    pub data: Value,
}

impl DecodedMessage {
    /// Inner event name, when the payload is an object with an `event` string.
    #[must_use]
    pub fn data_event(&self) -> Option<&str> {
        self.data.get("event").and_then(Value::as_str)
    }

    #[must_use]
    pub fn into_data(self) -> Value {
        self.data
    }
}

/// Decode an inbound frame into its outer event and normalized payload.
///
/// # Errors
///
/// Returns [`CodecError::UnexpectedBinary`] for binary frames,
/// [`CodecError::Json`] / [`CodecError::NestedJson`] for malformed JSON and
/// [`CodecError::MissingEvent`] when the outer `event` is absent.
pub fn decode_frame(frame: &Frame) -> Result<DecodedMessage, CodecError> {
    match frame {
        Frame::Text(text) => decode_text(text),
        Frame::Binary(bytes) => Err(CodecError::UnexpectedBinary { len: bytes.len() }),
    }
}

fn decode_text(text: &str) -> Result<DecodedMessage, CodecError> {
    let envelope: InboundEnvelope = serde_json::from_str(text)?;
    let event = envelope.event.ok_or(CodecError::MissingEvent)?;
    let data = match envelope.data {
        Some(data) => data.normalize()?,
        None => Value::Null,
    };
    Ok(DecodedMessage { event, data })
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
