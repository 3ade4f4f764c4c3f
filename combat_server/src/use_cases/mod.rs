// Use cases layer: the world task and the combat/presence workflows it runs.

pub mod combat;
pub mod join;
pub mod outbox;
pub mod presence;
pub mod projectiles;
pub mod types;
pub mod weapons;
pub mod world;

#[cfg(test)]
pub(crate) mod test_support;

pub use join::{load_initial_players, JoinRequest, JoinUseCase};
pub use types::{GameEvent, PlayerAction};
pub use world::{spawn_world, WorldHandle, WorldPorts, WorldSettings};
