//! Error types for the lobby layer.

use lightcycle_protocol::PlayerColor;
use lightcycle_transport::TransportError;

/// Errors raised while applying lobby input.
///
/// None of these end the lobby; the engine logs them (and for most, shows
/// a system line) and keeps going.
#[derive(Debug, thiserror::Error)]
pub enum LobbyError {
    /// A message referenced a color that is not in the roster.
    #[error("unknown player {0}")]
    UnknownPlayer(PlayerColor),

    /// A message had a shape the lobby cannot act on.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// The operation needs a server connection.
    #[error("not connected")]
    NotConnected,

    /// The connection failed underneath us.
    #[error(transparent)]
    Transport(#[from] TransportError),
}
