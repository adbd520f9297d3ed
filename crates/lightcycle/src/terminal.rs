//! Plain-text displays that write to any [`Write`]r, used by the binary
//! with stdout.

use std::io::Write;

use lightcycle_game::{GameDisplay, Outcome, PlayerBlock};
use lightcycle_lobby::ChatDisplay;
use tracing::warn;

/// Prints each chat line once, as it is appended.
pub struct TextChat<W> {
    out: W,
    printed: usize,
}

impl<W: Write> TextChat<W> {
    pub fn new(out: W) -> Self {
        Self { out, printed: 0 }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> ChatDisplay for TextChat<W> {
    fn set_history(&mut self, history: &[String]) {
        let fresh = history.get(self.printed..).unwrap_or_default();
        for line in fresh {
            if let Err(e) = writeln!(self.out, "{line}") {
                warn!(error = %e, "could not print chat line");
                return;
            }
        }
        self.printed = history.len();
        let _ = self.out.flush();
    }
}

/// Prints board deltas, one `color x,y` cell per line.
pub struct TextBoard<W> {
    out: W,
}

impl<W: Write> TextBoard<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_blocks(&mut self, blocks: &[PlayerBlock]) -> std::io::Result<()> {
        for block in blocks {
            writeln!(
                self.out,
                "{} {},{}",
                block.color, block.position.x, block.position.y
            )?;
        }
        self.out.flush()
    }
}

impl<W: Write + Send> GameDisplay for TextBoard<W> {
    fn set_blocks(&mut self, blocks: &[PlayerBlock]) {
        if let Err(e) = writeln!(self.out, "-- start --").and_then(|()| self.write_blocks(blocks)) {
            warn!(error = %e, "could not print board");
        }
    }

    fn append_blocks(&mut self, blocks: &[PlayerBlock]) {
        if let Err(e) = self.write_blocks(blocks) {
            warn!(error = %e, "could not print board");
        }
    }

    fn set_outcome(&mut self, outcome: &Outcome, winner: Option<&str>) {
        let line = match (outcome, winner) {
            (Outcome::Winner(_), Some(name)) => format!("-- {name} wins --"),
            (Outcome::Winner(color), None) => format!("-- {color} wins --"),
            (Outcome::Draw, _) => "-- draw --".to_string(),
            (Outcome::Running, _) => return,
        };
        if let Err(e) = writeln!(self.out, "{line}") {
            warn!(error = %e, "could not print outcome");
        }
    }
}
