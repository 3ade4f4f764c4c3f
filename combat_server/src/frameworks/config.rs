use std::{env, fmt, path::Path, time::Duration};

use crate::domain::tuning::{GameTuning, InvalidTuning};

// Runtime/server constants (not gameplay tuning).

pub fn http_port() -> u16 {
    env::var("COMBAT_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(5001)
}

pub fn auth_service_url() -> String {
    env::var("AUTH_SERVICE_URL").unwrap_or_else(|_| "http://127.0.0.1:3002".to_string())
}

pub fn auth_verify_timeout() -> Duration {
    let millis = env::var("AUTH_VERIFY_TIMEOUT_MS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(1500);
    Duration::from_millis(millis)
}

// Unset means the in-memory player store.
pub fn database_url() -> Option<String> {
    non_empty_var("DATABASE_URL")
}

pub fn relay_url() -> Option<String> {
    non_empty_var("RELAY_URL")
}

pub fn relay_secret() -> String {
    env::var("RELAY_SHARED_SECRET").unwrap_or_default()
}

pub fn tuning_path() -> Option<String> {
    non_empty_var("COMBAT_TUNING_PATH")
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

pub const INPUT_CHANNEL_CAPACITY: usize = 1024;
pub const OUTBOUND_BROADCAST_CAPACITY: usize = 256;

pub const TICK_INTERVAL: Duration = Duration::from_millis(50);
pub const RELAY_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug)]
pub enum TuningError {
    Read(std::io::Error),
    Parse(toml::de::Error),
    Invalid(InvalidTuning),
}

impl fmt::Display for TuningError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TuningError::Read(e) => write!(f, "failed to read tuning file: {e}"),
            TuningError::Parse(e) => write!(f, "failed to parse tuning file: {e}"),
            TuningError::Invalid(e) => write!(f, "invalid tuning file: {e}"),
        }
    }
}

impl std::error::Error for TuningError {}

// Gameplay tuning from an optional TOML file; missing sections keep their defaults.
pub fn load_tuning(path: Option<&Path>) -> Result<GameTuning, TuningError> {
    let Some(path) = path else {
        return Ok(GameTuning::default());
    };
    let raw = std::fs::read_to_string(path).map_err(TuningError::Read)?;
    let tuning: GameTuning = toml::from_str(&raw).map_err(TuningError::Parse)?;
    tuning.validate().map_err(TuningError::Invalid)?;
    Ok(tuning)
}
