//! Error types for the game layer.

use lightcycle_protocol::PlayerColor;
use lightcycle_transport::TransportError;

/// Errors raised while running a game.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// A color that is not part of this game. Recoverable: the rest of the
    /// tick still applies.
    #[error("unknown player {0}")]
    UnknownPlayer(PlayerColor),

    /// The server says a player is alive who is dead locally.
    #[error("player {color} is dead locally but alive on the server")]
    AliveMismatch { color: PlayerColor },

    /// The server's last tick left more than one player alive locally.
    #[error("last tick with {0} players alive")]
    TooManyAlive(usize),

    /// The local game is for exactly two players.
    #[error("local game needs exactly 2 players, got {0}")]
    LocalPlayerCount(usize),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
