//! The in-game phase of the lightcycle client.
//!
//! - [`Game`]: grid, players and the per-tick [`step`](Game::step)
//! - [`GameHandler`]: who advances the game, a local ticker or the server
//! - [`GameDisplay`]: where frames go
//!
//! ```text
//! keys ─► GameHandler ─► Game::step ─► GameDisplay
//!              ▲
//!   server_tick (networked) / TickScheduler (local)
//! ```

mod display;
mod engine;
mod error;
mod handler;

pub use display::{GameDisplay, HeadlessGame, PlayerKey};
pub use engine::{
    CollisionRule, Game, Grid, Outcome, PlayerBlock, PlayerState, Position, StepReport,
};
pub use error::GameError;
pub use handler::{GameConfig, GameHandler, GameSummary, LOCAL_PLAYERS, apply_tick};
