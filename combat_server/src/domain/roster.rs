// Presence cache of every known player, active or not.

use crate::domain::state::{Player, PlayerId, PlayerSnapshot};
use std::collections::BTreeMap;

/// Players keyed by id. Iteration is in ascending id order, which is also the order
/// collision checkers use to pick the first player in range.
#[derive(Debug, Default)]
pub struct Roster {
    players: BTreeMap<PlayerId, Player>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Player> {
        self.players.get_mut(id)
    }

    /// Active player with this id, if any.
    pub fn active(&self, id: &str) -> Option<&Player> {
        self.players.get(id).filter(|p| p.active)
    }

    pub fn active_mut(&mut self, id: &str) -> Option<&mut Player> {
        self.players.get_mut(id).filter(|p| p.active)
    }

    /// Inserts or replaces a player, returning the previous entry.
    pub fn upsert(&mut self, player: Player) -> Option<Player> {
        self.players.insert(player.id.clone(), player)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.players.values_mut()
    }

    pub fn active_snapshots(&self) -> Vec<PlayerSnapshot> {
        self.players
            .values()
            .filter(|p| p.active)
            .map(PlayerSnapshot::from)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
