// Outbound notifications: what the core tells sessions and the external relay.

use crate::domain::kinematics::Vec3;
use crate::domain::state::{
    Color, HitEffect, PlayerId, PlayerSnapshot, PlayerStats, ProjectileId, ProjectileKind,
};
use serde::Serialize;

/// Which sessions receive an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Only(PlayerId),
    AllExcept(PlayerId),
    All,
}

impl Target {
    pub fn includes(&self, player_id: &str) -> bool {
        match self {
            Target::Only(id) => id == player_id,
            Target::AllExcept(id) => id != player_id,
            Target::All => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    PlayerJoined {
        player: PlayerSnapshot,
    },
    AllPlayers {
        players: Vec<PlayerSnapshot>,
    },
    PlayerDisconnected {
        player_id: PlayerId,
    },
    PlayerMoved {
        player_id: PlayerId,
        position: Vec3,
        rotation: Option<f64>,
        mode: Option<String>,
    },
    PlayerUpdated {
        player_id: PlayerId,
        name: Option<String>,
        color: Option<Color>,
    },
    WeaponFired {
        kind: ProjectileKind,
        projectile_id: ProjectileId,
        owner_id: PlayerId,
        position: Vec3,
        direction: Vec3,
        speed: f64,
    },
    ProjectileHit {
        kind: ProjectileKind,
        projectile_id: ProjectileId,
        owner_id: PlayerId,
        victim_id: PlayerId,
        effect: HitEffect,
        hit_position: Vec3,
    },
    PlayerDefeated {
        victim_id: PlayerId,
        killer_id: Option<PlayerId>,
    },
    PlayerRespawned {
        player_id: PlayerId,
        health: i32,
    },
    PlayerAchievement {
        player_id: PlayerId,
        name: String,
        achievement: String,
        stats: PlayerStats,
    },
    NewMessage {
        player_id: PlayerId,
        sender_name: String,
        content: String,
        timestamp: f64,
    },
    CooldownActive {
        kind: ProjectileKind,
        remaining: f64,
    },
}

/// Notifications for an optional external relay (e.g. a chat bridge).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum RelayEvent {
    PlayerJoined {
        name: String,
    },
    PlayerLeft {
        name: String,
    },
    Chat {
        player_id: PlayerId,
        sender_name: String,
        content: String,
        timestamp: f64,
    },
    Achievement {
        player_id: PlayerId,
        name: String,
        achievement: String,
    },
}
