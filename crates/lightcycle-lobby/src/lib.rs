//! The pre-game lobby for the lightcycle client.
//!
//! A [`LobbyEngine`] owns the chat history, the roster and (once
//! `/connect` succeeds) the server [`Session`](lightcycle_transport::Session).
//! It moves through [`LobbyState`]s until the server sends `start_game`,
//! then hands the still-open session to the game as a [`GameHandoff`].
//!
//! # Key types
//!
//! - [`LobbyEngine`]: the state machine; local lines and server messages in,
//!   chat lines out
//! - [`CommandTable`]: the slash commands, built once and passed in
//! - [`Roster`]: the local player plus everyone else, keyed by color
//! - [`ChatDisplay`]: where the history is pushed after every append
//! - [`LobbyConfig`]: server address, name and timeouts

mod chat;
mod commands;
mod config;
mod engine;
mod error;
mod roster;

pub use chat::{ChatDisplay, ChatHistory, DisplayKind, HeadlessChat, SYSTEM_SENDER};
pub use commands::{CommandAction, CommandSpec, CommandTable, InputLine};
pub use config::{LobbyConfig, LobbyState};
pub use engine::{GameHandoff, LineOutcome, LobbyEngine, LobbyOutcome};
pub use error::LobbyError;
pub use roster::Roster;
