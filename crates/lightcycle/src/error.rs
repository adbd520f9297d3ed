//! Unified error type for the lightcycle client.

use lightcycle_game::GameError;
use lightcycle_transport::TransportError;

/// Top-level error for a client run. Lobby problems never get here: the
/// lobby shows them as chat lines and keeps going.
#[derive(Debug, thiserror::Error)]
pub enum LightcycleError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Game(#[from] GameError),

    /// Terminal or log file I/O.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err: LightcycleError = TransportError::NotConnected.into();
        assert!(matches!(err, LightcycleError::Transport(_)));
    }

    #[test]
    fn test_from_game_error_keeps_message() {
        let err: LightcycleError = GameError::TooManyAlive(3).into();
        assert!(matches!(err, LightcycleError::Game(_)));
        assert!(err.to_string().contains('3'));
    }

    #[test]
    fn test_from_io_error() {
        let err: LightcycleError = std::io::Error::other("disk full").into();
        assert!(matches!(err, LightcycleError::Io(_)));
    }
}
