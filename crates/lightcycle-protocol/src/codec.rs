//! Codec trait and the JSON-lines implementation.
//!
//! Decoding is two-phase. The first pass reads only the `type` tag through
//! a tiny [`Envelope`] struct; the tag picks a [`MessageKind`], and the
//! second pass deserializes the same bytes into that variant's payload
//! struct. Payload structs ignore the extra `type` field, so no
//! intermediate `Value` is needed on the hot path.
//!
//! Framing (the trailing newline) is the transport's job; the codec sees
//! one line without its delimiter.

use serde::de::DeserializeOwned;
use serde::ser::Error as _;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Message, MessageKind, Origin, ProtocolError};

/// Converts [`Message`]s to bytes and back.
///
/// `Send + Sync + 'static` so one codec value can be shared by the
/// session's writer and its background reader task.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a message, without the line delimiter.
    ///
    /// # Errors
    /// [`ProtocolError::Encode`]: unreachable for well-formed messages.
    fn encode(&self, msg: &Message) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes one line produced by `origin`.
    ///
    /// # Errors
    /// - [`ProtocolError::MissingKind`]: no usable `type` field
    /// - [`ProtocolError::UnknownKind`]: `type` names nothing we know
    /// - [`ProtocolError::MalformedPayload`]: payload fails its schema
    fn decode_from(&self, origin: Origin, data: &[u8]) -> Result<Message, ProtocolError>;

    /// Deserializes one line sent by the server. This is the client's
    /// normal inbound direction.
    fn decode(&self, data: &[u8]) -> Result<Message, ProtocolError> {
        self.decode_from(Origin::Server, data)
    }
}

/// First-pass view of a line: just the discriminant.
#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
}

/// JSON codec (one object per line).
///
/// ```rust
/// use lightcycle_protocol::{Chat, Codec, JsonCodec, Message, PlayerColor};
///
/// let codec = JsonCodec;
/// let msg = Message::Chat(Chat {
///     message: "hi".into(),
///     color: PlayerColor::new("#0000FF"),
/// });
/// let bytes = codec.encode(&msg).unwrap();
/// assert_eq!(codec.decode(&bytes).unwrap(), msg);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode(&self, msg: &Message) -> Result<Vec<u8>, ProtocolError> {
        let mut body = match msg {
            Message::ConnectRequest(p) => to_object(p)?,
            Message::ConnectResponse(p) => to_object(p)?,
            Message::Ready(p) => to_object(p)?,
            Message::Chat(p) => to_object(p)?,
            Message::RosterChange(p) => to_object(p)?,
            Message::Tick(p) => to_object(p)?,
            Message::StartGame => Map::new(),
            Message::PlayerEvent(p) => to_object(p)?,
        };
        body.insert(
            "type".to_string(),
            Value::String(msg.kind().wire_tag().to_string()),
        );
        serde_json::to_vec(&Value::Object(body)).map_err(ProtocolError::Encode)
    }

    fn decode_from(&self, origin: Origin, data: &[u8]) -> Result<Message, ProtocolError> {
        let envelope: Envelope =
            serde_json::from_slice(data).map_err(ProtocolError::MissingKind)?;
        let kind = MessageKind::from_wire_tag(&envelope.kind, origin)
            .ok_or(ProtocolError::UnknownKind(envelope.kind))?;

        let msg = match kind {
            MessageKind::ConnectRequest => Message::ConnectRequest(payload(kind, data)?),
            MessageKind::ConnectResponse => Message::ConnectResponse(payload(kind, data)?),
            MessageKind::Ready => Message::Ready(payload(kind, data)?),
            MessageKind::Chat => Message::Chat(payload(kind, data)?),
            MessageKind::RosterChange => Message::RosterChange(payload(kind, data)?),
            MessageKind::Tick => Message::Tick(payload(kind, data)?),
            MessageKind::StartGame => Message::StartGame,
            MessageKind::PlayerEvent => Message::PlayerEvent(payload(kind, data)?),
        };
        Ok(msg)
    }
}

fn to_object<T: Serialize>(payload: &T) -> Result<Map<String, Value>, ProtocolError> {
    match serde_json::to_value(payload).map_err(ProtocolError::Encode)? {
        Value::Object(map) => Ok(map),
        other => Err(ProtocolError::Encode(serde_json::Error::custom(format!(
            "payload is not an object: {other}"
        )))),
    }
}

fn payload<T: DeserializeOwned>(kind: MessageKind, data: &[u8]) -> Result<T, ProtocolError> {
    serde_json::from_slice(data).map_err(|source| ProtocolError::MalformedPayload { kind, source })
}
