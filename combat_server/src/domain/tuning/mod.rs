// Gameplay tuning, kept separate from runtime/server configuration.

pub mod player;
pub mod sync;
pub mod weapon;

pub use player::PlayerTuning;
pub use sync::SyncTuning;
pub use weapon::{CannonTuning, HarpoonTuning};

use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// All gameplay knobs in one place; any section missing from a tuning file keeps its defaults.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct GameTuning {
    pub cannon: CannonTuning,
    pub harpoon: HarpoonTuning,
    pub player: PlayerTuning,
    pub sync: SyncTuning,
}

/// A tuning value the simulation cannot run with.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidTuning {
    pub field: &'static str,
    pub value: f64,
}

impl fmt::Display for InvalidTuning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tuning value {} = {} is out of range", self.field, self.value)
    }
}

impl std::error::Error for InvalidTuning {}

impl GameTuning {
    /// Every float must be finite and non-negative, health must be positive, and the
    /// respawn delay must fit a timer.
    pub fn validate(&self) -> Result<(), InvalidTuning> {
        let floats = [
            ("cannon.speed", self.cannon.speed),
            ("cannon.lifetime", self.cannon.lifetime),
            ("cannon.gravity", self.cannon.gravity),
            ("cannon.cooldown", self.cannon.cooldown),
            ("cannon.blast_radius", self.cannon.blast_radius),
            ("harpoon.speed", self.harpoon.speed),
            ("harpoon.lifetime", self.harpoon.lifetime),
            ("harpoon.cooldown", self.harpoon.cooldown),
            ("harpoon.hit_radius", self.harpoon.hit_radius),
            ("harpoon.status_duration", self.harpoon.status_duration),
            ("player.respawn_seconds", self.player.respawn_seconds),
            ("sync.min_interval_secs", self.sync.min_interval_secs),
            ("sync.min_distance", self.sync.min_distance),
        ];
        for (field, value) in floats {
            if !value.is_finite() || value < 0.0 {
                return Err(InvalidTuning { field, value });
            }
        }

        if Duration::try_from_secs_f64(self.player.respawn_seconds).is_err() {
            return Err(InvalidTuning {
                field: "player.respawn_seconds",
                value: self.player.respawn_seconds,
            });
        }
        if self.player.max_health <= 0 {
            return Err(InvalidTuning {
                field: "player.max_health",
                value: f64::from(self.player.max_health),
            });
        }
        if self.cannon.damage < 0 {
            return Err(InvalidTuning {
                field: "cannon.damage",
                value: f64::from(self.cannon.damage),
            });
        }
        Ok(())
    }
}
