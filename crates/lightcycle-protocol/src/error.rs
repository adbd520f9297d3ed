//! Error types for the protocol layer.

use crate::MessageKind;

/// What can go wrong turning lines into [`Message`](crate::Message)s and
/// back.
///
/// Decoding errors are always recoverable: the offending line is dropped
/// and the caller keeps reading.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serializing an internally built message failed. Not reachable for
    /// the message types this crate defines.
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// The line is not a JSON object with a string `type` field.
    #[error("missing message type: {0}")]
    MissingKind(#[source] serde_json::Error),

    /// The `type` field names no known message.
    #[error("unknown message type '{0}'")]
    UnknownKind(String),

    /// The `type` was recognized but the payload does not match its schema.
    #[error("malformed {kind} payload: {source}")]
    MalformedPayload {
        kind: MessageKind,
        #[source]
        source: serde_json::Error,
    },
}

impl ProtocolError {
    /// The discriminant involved, when one was recognized.
    pub fn kind(&self) -> Option<MessageKind> {
        match self {
            Self::MalformedPayload { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}
