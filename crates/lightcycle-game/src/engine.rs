//! The light-cycle simulation.
//!
//! A [`Game`] is a fixed grid plus an ordered list of players. Each
//! [`step`](Game::step) moves every living player one cell in its current
//! direction and grows its trail. Players die by leaving the grid, and
//! under [`CollisionRule::Trails`] also by running into any trail.
//!
//! Player order is fixed when the game is built and doubles as the index
//! used by the local input queues.

use std::collections::{HashMap, HashSet};

use lightcycle_protocol::{Direction, LobbyPlayer, PlayerColor};
use tracing::{debug, info};

use crate::GameError;

/// A cell on the grid. Coordinates may go negative for a candidate move
/// that leaves the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The neighbouring cell in `direction`. Up is toward `y = 0`.
    pub fn moved(self, direction: Direction) -> Self {
        match direction {
            Direction::Up => Self::new(self.x, self.y - 1),
            Direction::Down => Self::new(self.x, self.y + 1),
            Direction::Left => Self::new(self.x - 1, self.y),
            Direction::Right => Self::new(self.x + 1, self.y),
        }
    }
}

/// Playing field size. Fixed for one game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    pub width: u16,
    pub height: u16,
}

impl Grid {
    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }

    /// `true` if `pos` lies in `[0, width) × [0, height)`.
    pub fn contains(&self, pos: Position) -> bool {
        (0..i32::from(self.width)).contains(&pos.x) && (0..i32::from(self.height)).contains(&pos.y)
    }
}

/// Which collisions the engine detects itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollisionRule {
    /// Walls only. Trail collisions are left to the server.
    #[default]
    WallsOnly,
    /// Walls, every trail (own included) and head-on meetings.
    Trails,
}

/// Where the game stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Running,
    /// Nobody moved on the deciding tick.
    Draw,
    /// Exactly one player moved on the deciding tick.
    Winner(PlayerColor),
}

impl Outcome {
    pub fn is_decided(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// One cell of one player's trail, as the renderer sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerBlock {
    pub position: Position,
    pub color: PlayerColor,
}

/// One light cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerState {
    pub color: PlayerColor,
    pub name: String,
    pub direction: Direction,
    /// Head is the last element. Never empty.
    pub trail: Vec<Position>,
    pub alive: bool,
}

impl PlayerState {
    pub fn new(
        color: impl Into<PlayerColor>,
        name: impl Into<String>,
        start: Position,
        direction: Direction,
    ) -> Self {
        Self {
            color: color.into(),
            name: name.into(),
            direction,
            trail: vec![start],
            alive: true,
        }
    }

    pub fn head(&self) -> Position {
        // The trail starts with one cell and only ever grows.
        self.trail[self.trail.len() - 1]
    }
}

/// What one [`Game::step`] changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    /// Tick number after this step.
    pub tick: u64,
    /// Newly occupied cells, in player order.
    pub appended: Vec<PlayerBlock>,
    /// Players who died on this tick.
    pub died: Vec<PlayerColor>,
    pub outcome: Outcome,
}

/// Grid, players and outcome of one game.
#[derive(Debug, Clone)]
pub struct Game {
    grid: Grid,
    rule: CollisionRule,
    players: Vec<PlayerState>,
    outcome: Outcome,
    ticks: u64,
}

impl Game {
    pub fn new(grid: Grid, rule: CollisionRule, players: Vec<PlayerState>) -> Self {
        Self {
            grid,
            rule,
            players,
            outcome: Outcome::Running,
            ticks: 0,
        }
    }

    /// Places `roster` on the grid in order: spread evenly along the
    /// horizontal middle line, even indices heading up and odd ones down.
    pub fn from_roster(grid: Grid, rule: CollisionRule, roster: &[LobbyPlayer]) -> Self {
        let slots = roster.len() as i32 + 1;
        let width = i32::from(grid.width);
        let y = i32::from(grid.height) / 2;
        let players = roster
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let x = (i as i32 + 1) * width / slots;
                let direction = if i % 2 == 0 {
                    Direction::Up
                } else {
                    Direction::Down
                };
                PlayerState::new(p.color.clone(), p.name.clone(), Position::new(x, y), direction)
            })
            .collect();
        Self::new(grid, rule, players)
    }

    pub fn grid(&self) -> Grid {
        self.grid
    }

    pub fn rule(&self) -> CollisionRule {
        self.rule
    }

    pub fn players(&self) -> &[PlayerState] {
        &self.players
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    /// Steps taken so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn alive_count(&self) -> usize {
        self.players.iter().filter(|p| p.alive).count()
    }

    pub fn index_of(&self, color: &PlayerColor) -> Option<usize> {
        self.players.iter().position(|p| p.color == *color)
    }

    /// # Errors
    /// [`GameError::UnknownPlayer`] if no player has `color`.
    pub fn player_by_color(&self, color: &PlayerColor) -> Result<&PlayerState, GameError> {
        self.players
            .iter()
            .find(|p| p.color == *color)
            .ok_or_else(|| GameError::UnknownPlayer(color.clone()))
    }

    /// Name of the winner, if there is one.
    pub fn winner_name(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Winner(color) => self
                .players
                .iter()
                .find(|p| p.color == *color)
                .map(|p| p.name.as_str()),
            _ => None,
        }
    }

    /// Turns the player with `color`. A reversal is ignored.
    ///
    /// Returns whether the direction changed.
    ///
    /// # Errors
    /// [`GameError::UnknownPlayer`] if no player has `color`.
    pub fn change_direction(
        &mut self,
        color: &PlayerColor,
        direction: Direction,
    ) -> Result<bool, GameError> {
        let index = self
            .index_of(color)
            .ok_or_else(|| GameError::UnknownPlayer(color.clone()))?;
        Ok(self.change_direction_at(index, direction))
    }

    /// Index-based variant of [`change_direction`](Self::change_direction).
    /// Out-of-range indices are ignored.
    pub fn change_direction_at(&mut self, index: usize, direction: Direction) -> bool {
        let Some(player) = self.players.get_mut(index) else {
            return false;
        };
        if direction == player.direction.opposite() {
            debug!(
                color = %player.color,
                from = %player.direction,
                to = %direction,
                "reversal ignored"
            );
            return false;
        }
        player.direction = direction;
        true
    }

    /// Marks a player dead without moving anyone. The trail stays.
    pub fn kill_at(&mut self, index: usize) {
        if let Some(player) = self.players.get_mut(index) {
            if player.alive {
                debug!(color = %player.color, "player killed");
                player.alive = false;
            }
        }
    }

    /// Cells of every trail, for the renderer's first frame.
    pub fn initial_blocks(&self) -> Vec<PlayerBlock> {
        self.players
            .iter()
            .flat_map(|p| {
                p.trail.iter().map(|&position| PlayerBlock {
                    position,
                    color: p.color.clone(),
                })
            })
            .collect()
    }

    /// Advances one tick. Once the outcome is decided this does nothing
    /// and reports the frozen outcome.
    pub fn step(&mut self) -> StepReport {
        if self.outcome.is_decided() {
            return StepReport {
                tick: self.ticks,
                appended: Vec::new(),
                died: Vec::new(),
                outcome: self.outcome.clone(),
            };
        }
        self.ticks += 1;

        // Candidate heads of everyone still alive.
        let mut candidates: Vec<(usize, Position)> = self
            .players
            .iter()
            .enumerate()
            .filter(|(_, p)| p.alive)
            .map(|(i, p)| (i, p.head().moved(p.direction)))
            .collect();

        let mut died = Vec::new();
        let mut dead_now: HashSet<usize> = HashSet::new();
        for &(i, pos) in &candidates {
            if !self.grid.contains(pos) {
                dead_now.insert(i);
            }
        }

        if self.rule == CollisionRule::Trails {
            let occupied: HashSet<Position> = self
                .players
                .iter()
                .flat_map(|p| p.trail.iter().copied())
                .collect();
            let mut arrivals: HashMap<Position, usize> = HashMap::new();
            for &(i, pos) in &candidates {
                if !dead_now.contains(&i) {
                    *arrivals.entry(pos).or_default() += 1;
                }
            }
            for &(i, pos) in &candidates {
                if occupied.contains(&pos) || arrivals.get(&pos).is_some_and(|&n| n > 1) {
                    dead_now.insert(i);
                }
            }
        }

        candidates.retain(|(i, _)| !dead_now.contains(i));
        for (i, player) in self.players.iter_mut().enumerate() {
            if dead_now.contains(&i) {
                player.alive = false;
                died.push(player.color.clone());
            }
        }

        let mut appended = Vec::with_capacity(candidates.len());
        for &(i, pos) in &candidates {
            let player = &mut self.players[i];
            player.trail.push(pos);
            appended.push(PlayerBlock {
                position: pos,
                color: player.color.clone(),
            });
        }

        self.outcome = match candidates.as_slice() {
            [] => Outcome::Draw,
            [(sole, _)] => Outcome::Winner(self.players[*sole].color.clone()),
            _ => Outcome::Running,
        };
        if self.outcome.is_decided() {
            info!(tick = self.ticks, outcome = ?self.outcome, "game decided");
        }

        StepReport {
            tick: self.ticks,
            appended,
            died,
            outcome: self.outcome.clone(),
        }
    }
}
