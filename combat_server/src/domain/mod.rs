// Domain layer: core combat rules, state, and collaborator ports.

pub mod errors;
pub mod events;
pub mod kinematics;
pub mod ports;
pub mod roster;
pub mod state;
pub mod tuning;

pub use kinematics::Vec3;
pub use roster::Roster;
pub use state::{
    ActiveStatus, Color, HitEffect, LifeState, Player, PlayerId, PlayerPatch, PlayerRecord,
    PlayerSnapshot, PlayerStats, Projectile, ProjectileId, ProjectileKind, ProjectilePayload,
    StatusKind,
};
