// Health, defeat, respawn, and timed status effects.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::types::GameEvent;
use crate::domain::events::{ServerEvent, Target};
use crate::domain::ports::{RespawnScheduler, Transport};
use crate::domain::state::{ActiveStatus, LifeState, Player, PlayerId, StatusKind};
use crate::domain::tuning::player::PlayerTuning;
use crate::domain::Roster;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    /// Target unknown, inactive, or already defeated.
    Ignored,
    Wounded { health: i32 },
    Defeated,
}

pub struct Combat {
    tuning: PlayerTuning,
    scheduler: Arc<dyn RespawnScheduler>,
    // Latest defeat per player; only the timer carrying it may revive them.
    pending_respawns: HashMap<PlayerId, u64>,
    deaths: u64,
}

impl Combat {
    pub fn new(tuning: PlayerTuning, scheduler: Arc<dyn RespawnScheduler>) -> Self {
        Self {
            tuning,
            scheduler,
            pending_respawns: HashMap::new(),
            deaths: 0,
        }
    }

    pub fn max_health(&self) -> i32 {
        self.tuning.max_health
    }

    pub fn has_pending_respawn(&self, player_id: &str) -> bool {
        self.pending_respawns.contains_key(player_id)
    }

    /// A rejoining player whose respawn timer is still running stays defeated until it fires.
    pub fn hold_until_respawn(&self, player: &mut Player) -> bool {
        if !self.has_pending_respawn(&player.id) {
            return false;
        }
        player.life = LifeState::Dead;
        player.health = 0;
        player.status = None;
        true
    }

    /// Removes health, clamped at zero. Reaching zero defeats the player exactly once.
    pub fn damage(
        &mut self,
        roster: &mut Roster,
        transport: &dyn Transport,
        player_id: &str,
        amount: i32,
        source_id: Option<&str>,
    ) -> DamageOutcome {
        let Some(player) = roster.active_mut(player_id) else {
            debug!(%player_id, "damage ignored; player not active");
            return DamageOutcome::Ignored;
        };
        if !player.is_alive() {
            debug!(%player_id, "damage ignored; player already defeated");
            return DamageOutcome::Ignored;
        }

        player.health = (player.health - amount.max(0)).max(0);
        if player.health > 0 {
            return DamageOutcome::Wounded {
                health: player.health,
            };
        }

        player.life = LifeState::Dead;
        player.status = None;
        info!(victim_id = %player_id, killer_id = ?source_id, "player defeated");
        transport.emit(
            Target::All,
            ServerEvent::PlayerDefeated {
                victim_id: player_id.to_string(),
                killer_id: source_id.map(str::to_string),
            },
        );

        self.deaths += 1;
        let death = self.deaths;
        self.pending_respawns.insert(player_id.to_string(), death);
        let delay = Duration::try_from_secs_f64(self.tuning.respawn_seconds).unwrap_or_else(|_| {
            warn!(
                respawn_seconds = self.tuning.respawn_seconds,
                "respawn delay out of range; respawning immediately"
            );
            Duration::ZERO
        });
        self.scheduler.schedule(player_id.to_string(), death, delay);
        DamageOutcome::Defeated
    }

    /// Tags a live player with a timed status. A newer status replaces the old one.
    pub fn apply_status(
        &mut self,
        roster: &mut Roster,
        player_id: &str,
        kind: StatusKind,
        source_id: &str,
        duration: f64,
        now: f64,
    ) -> bool {
        let Some(player) = roster.active_mut(player_id) else {
            return false;
        };
        if !player.is_alive() {
            return false;
        }

        player.status = Some(ActiveStatus {
            kind,
            source_id: source_id.to_string(),
            expires_at: now + duration,
        });
        debug!(%player_id, ?kind, %source_id, duration, "status applied");
        true
    }

    /// Clears statuses whose time is up. Returns how many were cleared.
    pub fn expire_statuses(&mut self, roster: &mut Roster, now: f64) -> usize {
        let mut cleared = 0;
        for player in roster.iter_mut() {
            if player
                .status
                .as_ref()
                .is_some_and(|status| now >= status.expires_at)
            {
                player.status = None;
                cleared += 1;
            }
        }
        cleared
    }

    /// Restores a defeated player to full health when `death` is their latest defeat.
    /// Timers left over from an earlier defeat are ignored.
    pub fn respawn(
        &mut self,
        roster: &mut Roster,
        transport: &dyn Transport,
        player_id: &str,
        death: u64,
    ) -> bool {
        if self.pending_respawns.get(player_id) != Some(&death) {
            debug!(%player_id, death, "stale respawn timer ignored");
            return false;
        }
        self.pending_respawns.remove(player_id);

        let Some(player) = roster.get_mut(player_id) else {
            warn!(%player_id, "respawn for unknown player");
            return false;
        };
        if player.is_alive() {
            debug!(%player_id, "respawn skipped; player already alive");
            return false;
        }

        player.health = self.tuning.max_health;
        player.life = LifeState::Alive;
        info!(%player_id, health = player.health, "player respawned");

        if player.active {
            transport.emit(
                Target::All,
                ServerEvent::PlayerRespawned {
                    player_id: player_id.to_string(),
                    health: player.health,
                },
            );
        }
        true
    }
}

/// Production scheduler: sleeps, then posts `GameEvent::Respawn` back into the world input.
pub struct ChannelRespawnScheduler {
    input_tx: mpsc::Sender<GameEvent>,
}

impl ChannelRespawnScheduler {
    pub fn new(input_tx: mpsc::Sender<GameEvent>) -> Self {
        Self { input_tx }
    }
}

impl RespawnScheduler for ChannelRespawnScheduler {
    fn schedule(&self, player_id: PlayerId, death: u64, delay: Duration) {
        let input_tx = self.input_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if input_tx
                .send(GameEvent::Respawn { player_id, death })
                .await
                .is_err()
            {
                debug!("world input closed; respawn dropped");
            }
        });
    }
}
