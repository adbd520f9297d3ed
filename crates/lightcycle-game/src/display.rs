//! Rendering and key input seams for a running game.

use lightcycle_protocol::Direction;

use crate::engine::{Outcome, PlayerBlock};

/// Receives the game as deltas. Implementations own the terminal (or
/// whatever they draw on).
pub trait GameDisplay: Send {
    /// Full picture, sent once before the first tick.
    fn set_blocks(&mut self, blocks: &[PlayerBlock]);

    /// Cells occupied on the latest tick.
    fn append_blocks(&mut self, blocks: &[PlayerBlock]);

    /// Called once the outcome is decided. `winner` is the winner's name.
    fn set_outcome(&mut self, outcome: &Outcome, winner: Option<&str>);
}

/// Keeps the blocks in memory and draws nothing.
#[derive(Debug, Default)]
pub struct HeadlessGame {
    pub blocks: Vec<PlayerBlock>,
    pub frames: usize,
    pub outcome: Option<Outcome>,
}

impl GameDisplay for HeadlessGame {
    fn set_blocks(&mut self, blocks: &[PlayerBlock]) {
        self.blocks = blocks.to_vec();
    }

    fn append_blocks(&mut self, blocks: &[PlayerBlock]) {
        self.blocks.extend_from_slice(blocks);
        self.frames += 1;
    }

    fn set_outcome(&mut self, outcome: &Outcome, _winner: Option<&str>) {
        self.outcome = Some(outcome.clone());
    }
}

/// A key press the game understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerKey {
    Up,
    Down,
    Left,
    Right,
    W,
    A,
    S,
    D,
}

impl PlayerKey {
    /// Arrow keys steer player 0, `W A S D` steer player 1.
    pub fn binding(self) -> (usize, Direction) {
        match self {
            Self::Up => (0, Direction::Up),
            Self::Down => (0, Direction::Down),
            Self::Left => (0, Direction::Left),
            Self::Right => (0, Direction::Right),
            Self::W => (1, Direction::Up),
            Self::A => (1, Direction::Left),
            Self::S => (1, Direction::Down),
            Self::D => (1, Direction::Right),
        }
    }

    pub fn direction(self) -> Direction {
        self.binding().1
    }

    /// Parses one typed token (`up`, `w`, ...), case-insensitive.
    pub fn parse(token: &str) -> Option<Self> {
        let key = match token.to_ascii_lowercase().as_str() {
            "up" => Self::Up,
            "down" => Self::Down,
            "left" => Self::Left,
            "right" => Self::Right,
            "w" => Self::W,
            "a" => Self::A,
            "s" => Self::S,
            "d" => Self::D,
            _ => return None,
        };
        Some(key)
    }
}
