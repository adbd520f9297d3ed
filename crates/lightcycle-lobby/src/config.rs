//! Lobby configuration and state machine.

use std::time::Duration;

use lightcycle_transport::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_HANDSHAKE_TIMEOUT};

/// Settings for a [`LobbyEngine`](crate::LobbyEngine).
#[derive(Debug, Clone)]
pub struct LobbyConfig {
    /// Host used by `/connect` without arguments.
    pub host: String,

    /// Port used by `/connect` without a port argument.
    pub port: u16,

    /// The local player's name until `/setname` changes it.
    pub name: String,

    /// Sent in the connect request.
    pub privacy: String,

    /// Group to join. `None` lets the server pick.
    pub group_id: Option<String>,

    pub connect_timeout: Duration,
    pub handshake_timeout: Duration,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8765,
            name: "Buddy".to_string(),
            privacy: "private".to_string(),
            group_id: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }
}

impl LobbyConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_server(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }
}

/// Where the lobby is in its lifecycle.
///
/// ```text
/// Disconnected → Connecting → InLobby → GameStarting
///       ↑             │          │
///       └─────────────┴──────────┘  (failure, /disconnect, connection lost)
/// ```
///
/// `GameStarting` is terminal: the connection is handed to the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LobbyState {
    Disconnected,
    Connecting,
    InLobby,
    GameStarting,
}

impl LobbyState {
    /// `true` while a server connection is held.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::InLobby | Self::GameStarting)
    }

    /// Returns `true` if moving to `target` is a legal transition.
    pub fn can_transition_to(self, target: Self) -> bool {
        use LobbyState::*;
        matches!(
            (self, target),
            (Disconnected, Connecting)
                | (Connecting, InLobby)
                | (Connecting, Disconnected)
                | (InLobby, Disconnected)
                | (InLobby, GameStarting)
        )
    }
}

impl std::fmt::Display for LobbyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::InLobby => write!(f, "InLobby"),
            Self::GameStarting => write!(f, "GameStarting"),
        }
    }
}
