//! The lobby roster: the local player plus everyone else, keyed by color.

use lightcycle_protocol::{LobbyPlayer, PlayerColor};
use tracing::debug;

use crate::LobbyError;

/// Who is in the lobby.
///
/// The local player is kept apart from `others`, which keeps the order the
/// server sent it in. Colors are unique across both.
#[derive(Debug, Clone)]
pub struct Roster {
    me: LobbyPlayer,
    others: Vec<LobbyPlayer>,
}

impl Roster {
    /// An empty roster with an unassigned local player.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            me: LobbyPlayer::new(PlayerColor::default(), name, false),
            others: Vec::new(),
        }
    }

    pub fn me(&self) -> &LobbyPlayer {
        &self.me
    }

    pub fn others(&self) -> &[LobbyPlayer] {
        &self.others
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.me.name = name.into();
    }

    /// Adopts the color and roster from a connect response. An entry with
    /// our own color, or a repeat of an earlier color, is dropped.
    pub fn assign(&mut self, color: PlayerColor, players: Vec<LobbyPlayer>) {
        self.me.color = color;
        self.me.ready = false;
        self.others.clear();
        for player in players {
            let seen = self.others.iter().any(|p| p.color == player.color);
            if seen || player.color == self.me.color {
                debug!(color = %player.color, "skipping duplicate roster entry");
                continue;
            }
            self.others.push(player);
        }
        debug!(color = %self.me.color, others = self.others.len(), "roster assigned");
    }

    /// Looks up a player by color, the local player first.
    pub fn find(&self, color: &PlayerColor) -> Option<&LobbyPlayer> {
        if !self.me.color.is_unassigned() && self.me.color == *color {
            return Some(&self.me);
        }
        self.others.iter().find(|p| p.color == *color)
    }

    pub fn find_mut(&mut self, color: &PlayerColor) -> Option<&mut LobbyPlayer> {
        if !self.me.color.is_unassigned() && self.me.color == *color {
            return Some(&mut self.me);
        }
        self.others.iter_mut().find(|p| p.color == *color)
    }

    /// Adds a player, or replaces the entry that already has its color.
    /// Our own color updates the local player in place. Returns `true` if
    /// an entry was replaced.
    pub fn upsert(&mut self, player: LobbyPlayer) -> bool {
        if let Some(existing) = self.find_mut(&player.color) {
            *existing = player;
            true
        } else {
            self.others.push(player);
            false
        }
    }

    /// Removes the other player with `color`.
    ///
    /// # Errors
    /// [`LobbyError::UnknownPlayer`] if nobody has that color.
    pub fn remove(&mut self, color: &PlayerColor) -> Result<LobbyPlayer, LobbyError> {
        let index = self
            .others
            .iter()
            .position(|p| p.color == *color)
            .ok_or_else(|| LobbyError::UnknownPlayer(color.clone()))?;
        Ok(self.others.remove(index))
    }

    /// Forgets the server-assigned state; the name survives.
    pub fn clear(&mut self) {
        self.me.color = PlayerColor::default();
        self.me.ready = false;
        self.others.clear();
    }

    /// Everyone, local player first, then the others in server order.
    pub fn snapshot(&self) -> Vec<LobbyPlayer> {
        std::iter::once(self.me.clone())
            .chain(self.others.iter().cloned())
            .collect()
    }
}
