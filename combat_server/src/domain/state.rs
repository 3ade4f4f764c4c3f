// Domain-level players, projectiles, and the durable player mirror.

use crate::domain::kinematics::Vec3;
use serde::{Deserialize, Serialize};
use std::fmt;

pub type PlayerId = String;
pub type ProjectileId = String;

pub const DEFAULT_MODE: &str = "boat";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Default for Color {
    fn default() -> Self {
        Self {
            r: 0.3,
            g: 0.6,
            b: 0.8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlayerStats {
    pub kills: u64,
    pub catches: u64,
    pub currency: u64,
}

/// Health state machine. Dying and respawning are instantaneous transitions between
/// these two resting states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifeState {
    Alive,
    Dead,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Harpooned,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActiveStatus {
    pub kind: StatusKind,
    pub source_id: PlayerId,
    pub expires_at: f64,
}

/// Live, in-memory view of a player. The durable mirror is `PlayerRecord`.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub color: Color,
    pub position: Option<Vec3>,
    pub rotation: f64,
    pub mode: String,

    // Combat state.
    pub health: i32,
    pub life: LifeState,
    pub status: Option<ActiveStatus>,

    pub stats: PlayerStats,
    pub active: bool,
    pub last_update: f64,
}

impl Player {
    pub fn is_alive(&self) -> bool {
        self.life == LifeState::Alive
    }
}

/// Durable player document as stored by the persistence service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub id: PlayerId,
    pub name: String,
    pub color: Color,
    pub position: Option<Vec3>,
    pub rotation: f64,
    pub mode: String,
    pub health: i32,
    pub stats: PlayerStats,
    pub active: bool,
    pub last_update: f64,
}

impl PlayerRecord {
    /// Defaults for a player seen for the first time.
    pub fn new_default(id: impl Into<PlayerId>, max_health: i32, now: f64) -> Self {
        let id = id.into();
        let short: String = id.chars().take(4).collect();
        Self {
            name: format!("Sailor {short}"),
            id,
            color: Color::default(),
            position: Some(Vec3::ZERO),
            rotation: 0.0,
            mode: DEFAULT_MODE.to_string(),
            health: max_health,
            stats: PlayerStats::default(),
            active: true,
            last_update: now,
        }
    }
}

impl From<PlayerRecord> for Player {
    fn from(record: PlayerRecord) -> Self {
        let life = if record.health > 0 {
            LifeState::Alive
        } else {
            LifeState::Dead
        };
        Self {
            id: record.id,
            name: record.name,
            color: record.color,
            position: record.position,
            rotation: record.rotation,
            mode: record.mode,
            health: record.health,
            life,
            status: None,
            stats: record.stats,
            active: record.active,
            last_update: record.last_update,
        }
    }
}

/// Partial update of a durable player record; unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerPatch {
    pub name: Option<String>,
    pub color: Option<Color>,
    pub position: Option<Vec3>,
    pub rotation: Option<f64>,
    pub mode: Option<String>,
    pub health: Option<i32>,
    pub stats: Option<PlayerStats>,
    pub active: Option<bool>,
    pub last_update: f64,
}

impl PlayerPatch {
    pub fn at(now: f64) -> Self {
        Self {
            last_update: now,
            ..Default::default()
        }
    }

    pub fn apply(&self, record: &mut PlayerRecord) {
        if let Some(name) = &self.name {
            record.name = name.clone();
        }
        if let Some(color) = self.color {
            record.color = color;
        }
        if let Some(position) = self.position {
            record.position = Some(position);
        }
        if let Some(rotation) = self.rotation {
            record.rotation = rotation;
        }
        if let Some(mode) = &self.mode {
            record.mode = mode.clone();
        }
        if let Some(health) = self.health {
            record.health = health;
        }
        if let Some(stats) = self.stats {
            record.stats = stats;
        }
        if let Some(active) = self.active {
            record.active = active;
        }
        record.last_update = self.last_update;
    }
}

/// Broadcastable view of a player.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub name: String,
    pub color: Color,
    pub position: Option<Vec3>,
    pub rotation: f64,
    pub mode: String,
    pub health: i32,
    pub stats: PlayerStats,
    pub active: bool,
}

impl From<&Player> for PlayerSnapshot {
    fn from(p: &Player) -> Self {
        Self {
            id: p.id.clone(),
            name: p.name.clone(),
            color: p.color,
            position: p.position,
            rotation: p.rotation,
            mode: p.mode.clone(),
            health: p.health,
            stats: p.stats,
            active: p.active,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectileKind {
    Cannon,
    Harpoon,
}

impl ProjectileKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProjectileKind::Cannon => "cannon",
            ProjectileKind::Harpoon => "harpoon",
        }
    }
}

impl fmt::Display for ProjectileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Weapon-specific data carried by a projectile and read back by its collision checker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProjectilePayload {
    Cannon { blast_radius: f64, damage: i32 },
    Harpoon { hit_radius: f64, status_duration: f64 },
}

/// What a hit did to its victim.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HitEffect {
    Damage { amount: i32 },
    Status { kind: StatusKind, duration: f64 },
}

pub struct Projectile {
    pub id: ProjectileId,
    pub owner_id: PlayerId,
    pub kind: ProjectileKind,
    pub initial_position: Vec3,
    /// Unit launch direction.
    pub direction: Vec3,
    pub speed: f64,
    pub gravity: f64,
    pub created_at: f64,
    pub expires_at: f64,
    /// Recomputed from the launch state every tick.
    pub position: Vec3,
    pub payload: ProjectilePayload,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_record_is_new_then_name_uses_first_four_id_chars() {
        let record = PlayerRecord::new_default("abcdef123", 100, 10.0);

        assert_eq!(record.name, "Sailor abcd");
        assert_eq!(record.mode, DEFAULT_MODE);
        assert_eq!(record.health, 100);
        assert!(record.active);
        assert_eq!(record.position, Some(Vec3::ZERO));
    }

    #[test]
    fn when_patch_is_applied_then_only_set_fields_change() {
        let mut record = PlayerRecord::new_default("p1", 100, 0.0);
        let mut patch = PlayerPatch::at(5.0);
        patch.position = Some(Vec3::new(1.0, 2.0, 3.0));
        patch.active = Some(false);

        patch.apply(&mut record);

        assert_eq!(record.position, Some(Vec3::new(1.0, 2.0, 3.0)));
        assert!(!record.active);
        assert_eq!(record.name, "Sailor p1");
        assert_eq!(record.last_update, 5.0);
    }

    #[test]
    fn when_record_has_no_health_then_player_starts_dead() {
        let mut record = PlayerRecord::new_default("p1", 100, 0.0);
        record.health = 0;

        let player = Player::from(record);

        assert_eq!(player.life, LifeState::Dead);
    }
}
