//! Drives a [`Game`] from input.
//!
//! Two strategies, picked when the game starts:
//!
//! - [`GameHandler::Local`]: two players on one keyboard. A
//!   [`TickScheduler`] advances the game; each player has a small FIFO of
//!   pending turns and at most one is taken per tick.
//! - [`GameHandler::Networked`]: the server's `server_tick` messages advance
//!   the game and local keys are sent upstream as `player_event`s. The
//!   client never steps on its own.
//!
//! Both run until the outcome is decided or the caller fires `stop`.

use lightcycle_protocol::{Direction, LobbyPlayer, Message, PlayerColor, PlayerEvent, Tick};
use lightcycle_tick::{TickConfig, TickScheduler, TickStats};
use lightcycle_transport::Session;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::GameError;
use crate::display::{GameDisplay, PlayerKey};
use crate::engine::{CollisionRule, Game, Grid, Outcome, StepReport};

/// Number of players in a local game.
pub const LOCAL_PLAYERS: usize = 2;

/// Settings shared by both strategies.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub width: u16,
    pub height: u16,
    /// Local mode only.
    pub tick: TickConfig,
    /// Pending turns kept per local player.
    pub queue_capacity: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            width: 40,
            height: 20,
            tick: TickConfig::default(),
            queue_capacity: 10,
        }
    }
}

impl GameConfig {
    pub fn grid(&self) -> Grid {
        Grid::new(self.width, self.height)
    }
}

/// How a finished (or stopped) game ended.
#[derive(Debug, Clone, PartialEq)]
pub struct GameSummary {
    /// `Running` if the game was stopped before it was decided.
    pub outcome: Outcome,
    pub ticks: u64,
    pub winner_name: Option<String>,
    /// Step timing of the local ticker. `None` when the server drove the
    /// ticks.
    pub timing: Option<TickStats>,
}

impl GameSummary {
    fn of(game: &Game) -> Self {
        Self {
            outcome: game.outcome().clone(),
            ticks: game.ticks(),
            winner_name: game.winner_name().map(str::to_string),
            timing: None,
        }
    }
}

/// A game plus the strategy that feeds it.
#[derive(Debug)]
pub enum GameHandler {
    Local {
        game: Game,
        config: GameConfig,
    },
    Networked {
        game: Game,
        session: Session,
        me: PlayerColor,
    },
}

impl GameHandler {
    /// A two-player game on this machine with trail collisions.
    ///
    /// # Errors
    /// [`GameError::LocalPlayerCount`] unless `players` has exactly two
    /// entries.
    pub fn local(config: GameConfig, players: &[LobbyPlayer]) -> Result<Self, GameError> {
        if players.len() != LOCAL_PLAYERS {
            return Err(GameError::LocalPlayerCount(players.len()));
        }
        let game = Game::from_roster(config.grid(), CollisionRule::Trails, players);
        Ok(Self::Local { game, config })
    }

    /// A game mirrored from the server over `session`, which must have
    /// completed its handshake.
    ///
    /// # Errors
    /// [`GameError::UnknownPlayer`] if `me` is not in `players`.
    pub fn networked(
        config: &GameConfig,
        session: Session,
        me: PlayerColor,
        players: &[LobbyPlayer],
    ) -> Result<Self, GameError> {
        if !players.iter().any(|p| p.color == me) {
            return Err(GameError::UnknownPlayer(me));
        }
        let game = Game::from_roster(config.grid(), CollisionRule::WallsOnly, players);
        Ok(Self::Networked { game, session, me })
    }

    pub fn game(&self) -> &Game {
        match self {
            Self::Local { game, .. } | Self::Networked { game, .. } => game,
        }
    }

    /// Plays until the outcome is decided, the server stops sending, or
    /// `stop` fires (a dropped sender counts as firing). A tick that is
    /// already being processed always finishes.
    ///
    /// # Errors
    /// Networked mode only: a desync with the server ([`GameError::AliveMismatch`],
    /// [`GameError::TooManyAlive`]) or a session that cannot be read.
    pub async fn run(
        self,
        keys: mpsc::Receiver<PlayerKey>,
        display: &mut dyn GameDisplay,
        stop: oneshot::Receiver<()>,
    ) -> Result<GameSummary, GameError> {
        match self {
            Self::Local { game, config } => Ok(run_local(game, config, keys, display, stop).await),
            Self::Networked { game, session, me } => {
                run_networked(game, session, me, keys, display, stop).await
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Local
// ---------------------------------------------------------------------------

async fn run_local(
    mut game: Game,
    config: GameConfig,
    keys: mpsc::Receiver<PlayerKey>,
    display: &mut dyn GameDisplay,
    mut stop: oneshot::Receiver<()>,
) -> GameSummary {
    let capacity = config.queue_capacity.max(1);
    let (senders, mut queues): (Vec<_>, Vec<_>) = (0..LOCAL_PLAYERS)
        .map(|_| mpsc::channel::<Direction>(capacity))
        .unzip();
    let router = tokio::spawn(route_keys(keys, senders));

    let mut scheduler = TickScheduler::new(config.tick);
    display.set_blocks(&game.initial_blocks());
    info!(players = game.players().len(), "local game started");

    loop {
        tokio::select! {
            biased;

            _ = &mut stop => {
                info!(tick = game.ticks(), "local game stopped");
                break;
            }

            _ = scheduler.wait_for_tick() => {
                for (index, queue) in queues.iter_mut().enumerate() {
                    if let Ok(direction) = queue.try_recv() {
                        game.change_direction_at(index, direction);
                    }
                }
                let report = game.step();
                display.append_blocks(&report.appended);
                scheduler.record_tick_end();
                if report.outcome.is_decided() {
                    display.set_outcome(&report.outcome, game.winner_name());
                    break;
                }
            }
        }
    }

    router.abort();
    let stats = scheduler.stats().clone();
    info!(
        ticks = stats.ticks,
        late_ticks = stats.late_ticks,
        mean_step = ?stats.mean_step,
        slowest_step = ?stats.slowest_step,
        "local game timing"
    );
    GameSummary {
        timing: Some(stats),
        ..GameSummary::of(&game)
    }
}

/// Sorts key presses into the per-player queues. Never waits on a full
/// queue.
async fn route_keys(mut keys: mpsc::Receiver<PlayerKey>, queues: Vec<mpsc::Sender<Direction>>) {
    while let Some(key) = keys.recv().await {
        let (player, direction) = key.binding();
        let Some(queue) = queues.get(player) else {
            continue;
        };
        match queue.try_send(direction) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!(player, %direction, "turn queue full, key dropped");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => return,
        }
    }
}

// ---------------------------------------------------------------------------
// Networked
// ---------------------------------------------------------------------------

async fn run_networked(
    mut game: Game,
    mut session: Session,
    me: PlayerColor,
    mut keys: mpsc::Receiver<PlayerKey>,
    display: &mut dyn GameDisplay,
    mut stop: oneshot::Receiver<()>,
) -> Result<GameSummary, GameError> {
    let mut stream = match session.receive_stream() {
        Ok(stream) => stream,
        Err(e) => {
            session.close().await;
            return Err(e.into());
        }
    };
    display.set_blocks(&game.initial_blocks());
    info!(%me, players = game.players().len(), "networked game started");

    let mut keys_open = true;
    let result = loop {
        tokio::select! {
            biased;

            _ = &mut stop => {
                info!(tick = game.ticks(), "networked game stopped");
                break Ok(());
            }

            msg = stream.recv() => match msg {
                Some(Message::Tick(tick)) => match apply_tick(&mut game, &tick) {
                    Ok(report) => {
                        display.append_blocks(&report.appended);
                        if report.outcome.is_decided() {
                            display.set_outcome(&report.outcome, game.winner_name());
                            break Ok(());
                        }
                        if tick.last_tick {
                            info!(tick = game.ticks(), "server sent the last tick");
                            break Ok(());
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "game out of sync with server");
                        break Err(e);
                    }
                },
                Some(other) => debug!(kind = %other.kind(), "ignoring message during game"),
                None => {
                    warn!(tick = game.ticks(), "server stream ended during game");
                    break Ok(());
                }
            },

            key = keys.recv(), if keys_open => match key {
                Some(key) => {
                    if let Some(event) = player_event(&game, &me, key) {
                        if let Err(e) = session.send(&Message::PlayerEvent(event)).await {
                            warn!(error = %e, "could not send player event");
                        }
                    }
                }
                None => keys_open = false,
            },
        }
    };

    session.reclaim(stream).await;
    session.close().await;
    result.map(|()| GameSummary::of(&game))
}

/// The `player_event` to send for `key`, if any. Keys of a dead player and
/// reversals of the current heading are dropped.
fn player_event(game: &Game, me: &PlayerColor, key: PlayerKey) -> Option<PlayerEvent> {
    let player = game.player_by_color(me).ok()?;
    let direction = key.direction();
    if !player.alive {
        return None;
    }
    if direction == player.direction.opposite() {
        debug!(from = %player.direction, to = %direction, "reversal not sent");
        return None;
    }
    Some(PlayerEvent {
        color: me.clone(),
        direction,
    })
}

/// Applies one server tick and steps the game.
///
/// On the last tick the local game must already have at most one player
/// alive. For each change a present direction is applied through the
/// reversal guard; a death the server reports is adopted, while a player
/// the server still counts alive but who is dead here is a desync. Changes
/// for unknown colors are logged and skipped.
///
/// # Errors
/// [`GameError::TooManyAlive`] or [`GameError::AliveMismatch`]. The game is
/// not stepped in either case.
pub fn apply_tick(game: &mut Game, tick: &Tick) -> Result<StepReport, GameError> {
    if tick.last_tick {
        let alive = game.alive_count();
        if alive > 1 {
            return Err(GameError::TooManyAlive(alive));
        }
    }

    let mut resolved = Vec::with_capacity(tick.changes.len());
    for change in &tick.changes {
        let Some(index) = game.index_of(&change.color) else {
            warn!(color = %change.color, "tick change for unknown player");
            continue;
        };
        if !game.players()[index].alive && !change.dead {
            return Err(GameError::AliveMismatch {
                color: change.color.clone(),
            });
        }
        resolved.push((index, change));
    }

    // Nothing is applied until every change has been checked.
    for (index, change) in resolved {
        if let Some(direction) = change.direction {
            game.change_direction_at(index, direction);
        }
        if change.dead {
            game.kill_at(index);
        }
    }

    if tick.countdown > 0 {
        debug!(countdown = tick.countdown, "countdown tick");
    }
    Ok(game.step())
}
