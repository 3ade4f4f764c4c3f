// Durable position throttling and profile input validation.

use std::collections::HashMap;

use crate::domain::errors::ValidationError;
use crate::domain::kinematics;
use crate::domain::state::{Color, PlayerId};
use crate::domain::tuning::sync::SyncTuning;
use crate::domain::Vec3;

pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 50;
pub const MESSAGE_MAX_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncRecord {
    pub position: Vec3,
    pub written_at: f64,
}

/// Decides which live movements also reach the player store.
pub struct PositionSync {
    tuning: SyncTuning,
    records: HashMap<PlayerId, SyncRecord>,
}

impl PositionSync {
    pub fn new(tuning: SyncTuning) -> Self {
        Self {
            tuning,
            records: HashMap::new(),
        }
    }

    /// Returns true (and records the write) when enough time has passed AND the player
    /// moved far enough since the last durable write. The first write always passes.
    pub fn should_persist(&mut self, player_id: &str, position: Vec3, now: f64) -> bool {
        if let Some(last) = self.records.get(player_id) {
            let waited = now - last.written_at > self.tuning.min_interval_secs;
            let moved = kinematics::distance(last.position, position) > self.tuning.min_distance;
            if !(waited && moved) {
                return false;
            }
        }

        self.records.insert(
            player_id.to_string(),
            SyncRecord {
                position,
                written_at: now,
            },
        );
        true
    }

    pub fn last_written(&self, player_id: &str) -> Option<SyncRecord> {
        self.records.get(player_id).copied()
    }

    /// Drops the sync record if it still belongs to the write made at `written_at`,
    /// so the next qualifying move retries.
    pub fn forget_if_written_at(&mut self, player_id: &str, written_at: f64) -> bool {
        let matches = self
            .records
            .get(player_id)
            .is_some_and(|r| r.written_at == written_at);
        if matches {
            self.records.remove(player_id);
        }
        matches
    }
}

/// Strips markup and quoting characters from a display name.
pub fn sanitize_name(raw: &str) -> Result<String, ValidationError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        match c {
            '<' => {
                // Drop the whole tag; an unclosed '<' swallows the rest.
                for t in chars.by_ref() {
                    if t == '>' {
                        break;
                    }
                }
            }
            '&' => {
                let entity: String = chars
                    .clone()
                    .take_while(|t| t.is_ascii_alphanumeric() || *t == '#')
                    .collect();
                let mut after = chars.clone().skip(entity.len());
                if !entity.is_empty() && after.next() == Some(';') {
                    for _ in 0..=entity.len() {
                        chars.next();
                    }
                } else {
                    out.push(c);
                }
            }
            '\\' | '/' | '"' | '\'' => {}
            _ => out.push(c),
        }
    }

    let trimmed = out.trim();
    if trimmed.chars().count() < NAME_MIN_CHARS {
        return Err(ValidationError::InvalidName);
    }
    Ok(trimmed.chars().take(NAME_MAX_CHARS).collect::<String>().trim_end().to_string())
}

/// Accepts finite components and clamps them into 0..=1.
pub fn validate_color(color: Color) -> Result<Color, ValidationError> {
    let parts = [color.r, color.g, color.b];
    if parts.iter().any(|c| !c.is_finite()) {
        return Err(ValidationError::InvalidColor);
    }
    Ok(Color {
        r: color.r.clamp(0.0, 1.0),
        g: color.g.clamp(0.0, 1.0),
        b: color.b.clamp(0.0, 1.0),
    })
}

pub fn validate_message(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    let len = trimmed.chars().count();
    if len == 0 || len > MESSAGE_MAX_CHARS {
        return Err(ValidationError::InvalidMessage);
    }
    Ok(trimmed.to_string())
}
