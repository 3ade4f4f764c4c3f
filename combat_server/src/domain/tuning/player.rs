/// Gameplay tuning for player vessels.
#[derive(Debug, Clone, Copy, serde::Deserialize)]
#[serde(default)]
pub struct PlayerTuning {
    /// Health on join and after respawn.
    pub max_health: i32,

    /// Seconds a defeated player waits before respawning.
    pub respawn_seconds: f64,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            max_health: 100,
            respawn_seconds: 3.0,
        }
    }
}
