/// Gameplay tuning for the deck cannon.
///
/// Cannonballs fly a shallow parabolic arc and deal raw damage inside their blast radius.
#[derive(Debug, Clone, Copy, serde::Deserialize)]
#[serde(default)]
pub struct CannonTuning {
    /// Launch speed in world units per second.
    pub speed: f64,

    /// Seconds before an unexploded cannonball is discarded.
    pub lifetime: f64,

    /// Downward acceleration applied to the arc.
    pub gravity: f64,

    /// Minimum seconds between two shots from the same player.
    pub cooldown: f64,

    /// Health removed from the victim on a hit.
    pub damage: i32,

    /// Hit test radius around the cannonball.
    pub blast_radius: f64,
}

impl Default for CannonTuning {
    fn default() -> Self {
        Self {
            speed: 100.0,
            lifetime: 3.0,
            gravity: 0.0981,
            cooldown: 0.5,
            damage: 10,
            blast_radius: 8.0,
        }
    }
}

/// Gameplay tuning for the harpoon.
///
/// Harpoons fly straight, live shorter than cannonballs, and tag the victim with a
/// status instead of dealing damage.
#[derive(Debug, Clone, Copy, serde::Deserialize)]
#[serde(default)]
pub struct HarpoonTuning {
    pub speed: f64,
    pub lifetime: f64,
    pub cooldown: f64,
    pub hit_radius: f64,

    /// How long the harpooned status stays on the victim, in seconds.
    pub status_duration: f64,
}

impl Default for HarpoonTuning {
    fn default() -> Self {
        Self {
            speed: 80.0,
            lifetime: 2.0,
            cooldown: 1.5,
            hit_radius: 5.0,
            status_duration: 2.0,
        }
    }
}
