// Wire protocol DTOs and conversions for the public websocket.

use crate::domain::errors::ValidationError;
use crate::domain::events::ServerEvent;
use crate::domain::state::{
    Color, HitEffect, PlayerSnapshot, PlayerStats, ProjectileKind, StatusKind,
};
use crate::domain::Vec3;
use crate::use_cases::join::JoinRequest;
use crate::use_cases::{GameEvent, PlayerAction};
use serde::{Deserialize, Serialize};

/// Messages the server sends to connected clients over the WebSocket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    // Assigned identity for the connection after Join is accepted.
    Identity {
        player_id: String,
    },
    PlayerJoined(PlayerDto),
    AllPlayers {
        players: Vec<PlayerDto>,
    },
    PlayerDisconnected {
        player_id: String,
    },
    PlayerMoved {
        player_id: String,
        position: Vec3,
        #[serde(skip_serializing_if = "Option::is_none")]
        rotation: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        mode: Option<String>,
    },
    PlayerUpdated {
        player_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        color: Option<Color>,
    },
    WeaponFired {
        weapon: ProjectileKind,
        projectile_id: String,
        owner_id: String,
        position: Vec3,
        direction: Vec3,
        speed: f64,
    },
    ProjectileHit {
        weapon: ProjectileKind,
        projectile_id: String,
        owner_id: String,
        victim_id: String,
        effect: HitEffectDto,
        hit_position: Vec3,
    },
    PlayerDefeated {
        victim_id: String,
        killer_id: Option<String>,
    },
    PlayerRespawned {
        player_id: String,
        health: i32,
    },
    PlayerAchievement {
        player_id: String,
        name: String,
        achievement: String,
        stats: PlayerStats,
    },
    NewMessage {
        player_id: String,
        sender_name: String,
        content: String,
        timestamp: f64,
    },
    CooldownActive {
        weapon: ProjectileKind,
        remaining: f64,
    },
}

/// Broadcastable player view.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerDto {
    pub id: String,
    pub name: String,
    pub color: Color,
    pub position: Option<Vec3>,
    pub rotation: f64,
    pub mode: String,
    pub health: i32,
    #[serde(flatten)]
    pub stats: PlayerStats,
    pub active: bool,
}

impl From<PlayerSnapshot> for PlayerDto {
    fn from(p: PlayerSnapshot) -> Self {
        Self {
            id: p.id,
            name: p.name,
            color: p.color,
            position: p.position,
            rotation: p.rotation,
            mode: p.mode,
            health: p.health,
            stats: p.stats,
            active: p.active,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HitEffectDto {
    Damage { amount: i32 },
    Status { status: StatusKind, duration: f64 },
}

impl From<HitEffect> for HitEffectDto {
    fn from(effect: HitEffect) -> Self {
        match effect {
            HitEffect::Damage { amount } => HitEffectDto::Damage { amount },
            HitEffect::Status { kind, duration } => HitEffectDto::Status {
                status: kind,
                duration,
            },
        }
    }
}

impl From<ServerEvent> for ServerMessage {
    fn from(event: ServerEvent) -> Self {
        match event {
            ServerEvent::PlayerJoined { player } => ServerMessage::PlayerJoined(player.into()),
            ServerEvent::AllPlayers { players } => ServerMessage::AllPlayers {
                players: players.into_iter().map(PlayerDto::from).collect(),
            },
            ServerEvent::PlayerDisconnected { player_id } => {
                ServerMessage::PlayerDisconnected { player_id }
            }
            ServerEvent::PlayerMoved {
                player_id,
                position,
                rotation,
                mode,
            } => ServerMessage::PlayerMoved {
                player_id,
                position,
                rotation,
                mode,
            },
            ServerEvent::PlayerUpdated {
                player_id,
                name,
                color,
            } => ServerMessage::PlayerUpdated {
                player_id,
                name,
                color,
            },
            ServerEvent::WeaponFired {
                kind,
                projectile_id,
                owner_id,
                position,
                direction,
                speed,
            } => ServerMessage::WeaponFired {
                weapon: kind,
                projectile_id,
                owner_id,
                position,
                direction,
                speed,
            },
            ServerEvent::ProjectileHit {
                kind,
                projectile_id,
                owner_id,
                victim_id,
                effect,
                hit_position,
            } => ServerMessage::ProjectileHit {
                weapon: kind,
                projectile_id,
                owner_id,
                victim_id,
                effect: effect.into(),
                hit_position,
            },
            ServerEvent::PlayerDefeated {
                victim_id,
                killer_id,
            } => ServerMessage::PlayerDefeated {
                victim_id,
                killer_id,
            },
            ServerEvent::PlayerRespawned { player_id, health } => {
                ServerMessage::PlayerRespawned { player_id, health }
            }
            ServerEvent::PlayerAchievement {
                player_id,
                name,
                achievement,
                stats,
            } => ServerMessage::PlayerAchievement {
                player_id,
                name,
                achievement,
                stats,
            },
            ServerEvent::NewMessage {
                player_id,
                sender_name,
                content,
                timestamp,
            } => ServerMessage::NewMessage {
                player_id,
                sender_name,
                content,
                timestamp,
            },
            ServerEvent::CooldownActive { kind, remaining } => ServerMessage::CooldownActive {
                weapon: kind,
                remaining,
            },
        }
    }
}

/// Messages the client sends to the server over the WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    // Initial handshake message carrying the session credential.
    Join(JoinPayload),
    FireCannon(FirePayload),
    FireHarpoon(FirePayload),
    UpdatePosition(PositionPayload),
    UpdatePlayerColor(ColorPayload),
    UpdatePlayerName(NamePayload),
    PlayerAction(ActionPayload),
    SendMessage(ChatPayload),
}

#[derive(Debug, Clone, Deserialize)]
pub struct JoinPayload {
    pub token: String,
    #[serde(default)]
    pub player_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub position: Option<PositionDto>,
}

impl From<JoinPayload> for JoinRequest {
    fn from(payload: JoinPayload) -> Self {
        Self {
            credential: payload.token,
            claimed_id: payload.player_id,
            name: payload.name,
            position: payload.position.map(Vec3::from),
        }
    }
}

/// Position with an optional height; boats sit at y = 0 unless told otherwise.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PositionDto {
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    pub z: f64,
}

impl From<PositionDto> for Vec3 {
    fn from(p: PositionDto) -> Self {
        Vec3::new(p.x, p.y, p.z)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FirePayload {
    #[serde(default)]
    pub player_id: Option<String>,
    pub position: PositionDto,
    pub direction: Vec3,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PositionPayload {
    #[serde(default)]
    pub player_id: Option<String>,
    // Coordinates arrive flat: {x, y, z, rotation?, mode?}.
    #[serde(flatten)]
    pub position: PositionDto,
    #[serde(default)]
    pub rotation: Option<f64>,
    #[serde(default)]
    pub mode: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ColorPayload {
    #[serde(default)]
    pub player_id: Option<String>,
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamePayload {
    #[serde(default)]
    pub player_id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    FishCaught,
    MonsterKilled,
    MoneyEarned,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActionPayload {
    #[serde(default)]
    pub player_id: Option<String>,
    pub action: ActionKind,
    #[serde(default)]
    pub amount: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatPayload {
    #[serde(default)]
    pub player_id: Option<String>,
    pub content: String,
}

// The session's verified id is authoritative; a differing payload id is rejected.
fn check_claim(session_player_id: &str, claimed: Option<&str>) -> Result<String, ValidationError> {
    match claimed {
        Some(claimed) if claimed != session_player_id => Err(ValidationError::PlayerMismatch),
        _ => Ok(session_player_id.to_string()),
    }
}

impl ClientMessage {
    /// Converts a post-join message into a world event for the session's player.
    /// `Join` has no world event and yields `Ok(None)`.
    pub fn into_game_event(
        self,
        session_player_id: &str,
    ) -> Result<Option<GameEvent>, ValidationError> {
        let event = match self {
            ClientMessage::Join(_) => return Ok(None),
            ClientMessage::FireCannon(p) => GameEvent::Fire {
                kind: ProjectileKind::Cannon,
                player_id: check_claim(session_player_id, p.player_id.as_deref())?,
                position: p.position.into(),
                direction: p.direction,
            },
            ClientMessage::FireHarpoon(p) => GameEvent::Fire {
                kind: ProjectileKind::Harpoon,
                player_id: check_claim(session_player_id, p.player_id.as_deref())?,
                position: p.position.into(),
                direction: p.direction,
            },
            ClientMessage::UpdatePosition(p) => GameEvent::UpdatePosition {
                player_id: check_claim(session_player_id, p.player_id.as_deref())?,
                position: p.position.into(),
                rotation: p.rotation,
                mode: p.mode,
            },
            ClientMessage::UpdatePlayerColor(p) => GameEvent::UpdateColor {
                player_id: check_claim(session_player_id, p.player_id.as_deref())?,
                color: Color {
                    r: p.r,
                    g: p.g,
                    b: p.b,
                },
            },
            ClientMessage::UpdatePlayerName(p) => GameEvent::UpdateName {
                player_id: check_claim(session_player_id, p.player_id.as_deref())?,
                name: p.name,
            },
            ClientMessage::PlayerAction(p) => {
                let action = match p.action {
                    ActionKind::FishCaught => PlayerAction::FishCaught,
                    ActionKind::MonsterKilled => PlayerAction::MonsterKilled,
                    ActionKind::MoneyEarned => PlayerAction::MoneyEarned {
                        amount: p.amount.ok_or(ValidationError::InvalidAmount)?,
                    },
                };
                GameEvent::Action {
                    player_id: check_claim(session_player_id, p.player_id.as_deref())?,
                    action,
                }
            }
            ClientMessage::SendMessage(p) => GameEvent::SendMessage {
                player_id: check_claim(session_player_id, p.player_id.as_deref())?,
                content: p.content,
            },
        };
        Ok(Some(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn parse(value: Value) -> ClientMessage {
        serde_json::from_value(value).expect("client message should parse")
    }

    #[test]
    fn when_fire_message_omits_player_id_then_session_id_is_used() {
        let msg = parse(json!({
            "type": "fire_cannon",
            "data": {"position": {"x": 1.0, "z": 2.0}, "direction": {"x": 0.0, "y": 0.0, "z": 1.0}}
        }));

        let event = msg.into_game_event("p1").expect("valid").expect("event");

        match event {
            GameEvent::Fire {
                kind,
                player_id,
                position,
                ..
            } => {
                assert_eq!(kind, ProjectileKind::Cannon);
                assert_eq!(player_id, "p1");
                assert_eq!(position, Vec3::new(1.0, 0.0, 2.0));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn when_payload_names_another_player_then_message_is_rejected() {
        let msg = parse(json!({
            "type": "update_position",
            "data": {"player_id": "p2", "x": 1.0, "y": 0.0, "z": 2.0}
        }));

        assert_eq!(
            msg.into_game_event("p1").err(),
            Some(ValidationError::PlayerMismatch)
        );
    }

    #[test]
    fn when_money_earned_lacks_amount_then_it_is_invalid() {
        let msg = parse(json!({
            "type": "player_action",
            "data": {"action": "money_earned"}
        }));

        assert_eq!(
            msg.into_game_event("p1").err(),
            Some(ValidationError::InvalidAmount)
        );
    }

    #[test]
    fn when_position_update_has_flat_coordinates_then_it_maps_to_event() {
        let msg = parse(json!({
            "type": "update_position",
            "data": {"player_id": "p1", "x": 1.0, "y": 0.0, "z": 2.0, "rotation": 0.5}
        }));

        match msg.into_game_event("p1").expect("valid") {
            Some(GameEvent::UpdatePosition {
                player_id,
                position,
                rotation,
                mode,
            }) => {
                assert_eq!(player_id, "p1");
                assert_eq!(position, Vec3::new(1.0, 0.0, 2.0));
                assert_eq!(rotation, Some(0.5));
                assert_eq!(mode, None);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn when_position_update_omits_y_then_it_defaults_to_sea_level() {
        let msg = parse(json!({
            "type": "update_position",
            "data": {"x": -3.0, "z": 4.0, "mode": "boat"}
        }));

        match msg.into_game_event("p1").expect("valid") {
            Some(GameEvent::UpdatePosition { position, mode, .. }) => {
                assert_eq!(position, Vec3::new(-3.0, 0.0, 4.0));
                assert_eq!(mode.as_deref(), Some("boat"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn when_position_lacks_x_then_parse_fails() {
        let parsed = serde_json::from_value::<ClientMessage>(json!({
            "type": "update_position",
            "data": {"z": 2.0}
        }));

        assert!(parsed.is_err());
    }

    #[test]
    fn when_hit_is_serialized_then_it_uses_snake_case_envelope() {
        let msg = ServerMessage::from(ServerEvent::ProjectileHit {
            kind: ProjectileKind::Harpoon,
            projectile_id: "harpoon_p1_1.0000_1".to_string(),
            owner_id: "p1".to_string(),
            victim_id: "p2".to_string(),
            effect: HitEffect::Status {
                kind: StatusKind::Harpooned,
                duration: 2.0,
            },
            hit_position: Vec3::new(1.0, 0.0, 0.0),
        });

        let value = serde_json::to_value(&msg).expect("serialize");

        assert_eq!(value["type"], "projectile_hit");
        assert_eq!(value["data"]["weapon"], "harpoon");
        assert_eq!(
            value["data"]["effect"],
            json!({"kind": "status", "status": "harpooned", "duration": 2.0})
        );
    }

    #[test]
    fn when_player_is_serialized_then_stats_are_flattened() {
        let record = crate::domain::PlayerRecord::new_default("abcd", 100, 0.0);
        let player = crate::domain::Player::from(record);
        let msg = ServerMessage::PlayerJoined(PlayerSnapshot::from(&player).into());

        let value = serde_json::to_value(&msg).expect("serialize");

        assert_eq!(value["type"], "player_joined");
        assert_eq!(value["data"]["name"], "Sailor abcd");
        assert_eq!(value["data"]["kills"], 0);
        assert_eq!(value["data"]["mode"], "boat");
    }
}
