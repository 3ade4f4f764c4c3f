/// Throttling of durable position writes.
///
/// Live movement is always broadcast; these only gate what reaches the player store.
#[derive(Debug, Clone, Copy, serde::Deserialize)]
#[serde(default)]
pub struct SyncTuning {
    /// A write needs strictly more than this many seconds since the last write.
    pub min_interval_secs: f64,

    /// A write needs strictly more than this distance from the last written position.
    pub min_distance: f64,
}

impl Default for SyncTuning {
    fn default() -> Self {
        Self {
            min_interval_secs: 2.0,
            min_distance: 20.0,
        }
    }
}
