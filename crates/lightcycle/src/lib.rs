//! # Lightcycle
//!
//! Client for a multiplayer light-cycle grid game. Players meet in a chat
//! lobby on a server, and once the server starts the game every player
//! steers a cycle that leaves a trail. The last one moving wins.
//!
//! The client is split into layers, each its own crate:
//!
//! ```text
//! lightcycle-protocol   JSON-lines messages
//! lightcycle-transport  TCP session, handshake, message stream
//! lightcycle-lobby      chat, roster, slash commands
//! lightcycle-tick       fixed-period ticker for local games
//! lightcycle-game       grid simulation and input handlers
//! ```
//!
//! This crate ties them together in [`Client`] and ships the `lightcycle`
//! binary.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lightcycle::prelude::*;
//! use tokio::sync::mpsc;
//!
//! # async fn demo() -> Result<(), LightcycleError> {
//! let (_lines_tx, mut lines) = mpsc::channel(16);
//! let mut board = HeadlessGame::default();
//! let config = ClientConfig::default().local(true);
//! let _outcome = Client::new(config).run(&mut lines, &mut board).await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod terminal;

pub use client::{Client, ClientConfig, ClientOutcome, LOCAL_COLORS, LOCAL_SECOND_NAME};
pub use error::LightcycleError;
pub use terminal::{TextBoard, TextChat};

/// Re-exports for the common case.
pub mod prelude {
    pub use crate::{Client, ClientConfig, ClientOutcome, LightcycleError, TextBoard, TextChat};
    pub use lightcycle_game::{
        GameConfig, GameDisplay, GameSummary, HeadlessGame, Outcome, PlayerKey,
    };
    pub use lightcycle_lobby::{ChatDisplay, LobbyConfig};
    pub use lightcycle_protocol::{Direction, LobbyPlayer, PlayerColor};
    pub use lightcycle_tick::TickConfig;
}
