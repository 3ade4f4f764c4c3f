// Use-case level inputs for the world task.

use crate::domain::state::{Color, PlayerId, PlayerRecord, ProjectileKind};
use crate::domain::Vec3;

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerAction {
    FishCaught,
    MonsterKilled,
    MoneyEarned { amount: i64 },
}

impl PlayerAction {
    /// Achievement name announced to every session.
    pub fn achievement(&self) -> &'static str {
        match self {
            PlayerAction::FishCaught => "fish_caught",
            PlayerAction::MonsterKilled => "monster_killed",
            PlayerAction::MoneyEarned { .. } => "money_earned",
        }
    }
}

/// Everything that mutates world state goes through the world task as one of these.
#[derive(Debug, Clone)]
pub enum GameEvent {
    Join {
        record: PlayerRecord,
    },
    Leave {
        player_id: PlayerId,
    },
    Fire {
        kind: ProjectileKind,
        player_id: PlayerId,
        position: Vec3,
        direction: Vec3,
    },
    UpdatePosition {
        player_id: PlayerId,
        position: Vec3,
        rotation: Option<f64>,
        mode: Option<String>,
    },
    UpdateColor {
        player_id: PlayerId,
        color: Color,
    },
    UpdateName {
        player_id: PlayerId,
        name: String,
    },
    Action {
        player_id: PlayerId,
        action: PlayerAction,
    },
    SendMessage {
        player_id: PlayerId,
        content: String,
    },

    // Internal events posted by timers and background writes.
    Tick,
    Respawn {
        player_id: PlayerId,
        death: u64,
    },
    PositionWriteFailed {
        player_id: PlayerId,
        written_at: f64,
    },
}
