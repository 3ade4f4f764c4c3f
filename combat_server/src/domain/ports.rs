use async_trait::async_trait;
use std::time::Duration;

use crate::domain::errors::{RelayError, StoreError, VerifyTokenError};
use crate::domain::events::{RelayEvent, ServerEvent, Target};
use crate::domain::state::{PlayerId, PlayerPatch, PlayerRecord};

// Port for the durable player store.
#[async_trait]
pub trait PlayerStore: Send + Sync {
    async fn get_player(&self, id: &str) -> Result<Option<PlayerRecord>, StoreError>;
    async fn create_player(&self, record: PlayerRecord) -> Result<PlayerRecord, StoreError>;
    async fn update_player(&self, id: &str, patch: PlayerPatch) -> Result<(), StoreError>;
    async fn list_players(&self) -> Result<Vec<PlayerRecord>, StoreError>;
}

// Identity returned by the identity service for a valid credential.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedIdentity {
    pub user_id: PlayerId,
    pub display_name: Option<String>,
}

// Port for turning an opaque credential into a stable user id.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, credential: &str) -> Result<VerifiedIdentity, VerifyTokenError>;
}

// Port for delivering events to connected sessions. Must not block.
pub trait Transport: Send + Sync {
    fn emit(&self, target: Target, event: ServerEvent);
}

// Port for the optional external relay.
#[async_trait]
pub trait RelayNotifier: Send + Sync {
    async fn notify(&self, event: RelayEvent) -> Result<(), RelayError>;
}

// Port for retrieving the current time as fractional epoch seconds.
pub trait Clock: Send + Sync {
    fn now_secs(&self) -> f64;
}

// Port for one-shot respawn timers. `death` identifies which defeat the timer belongs to.
pub trait RespawnScheduler: Send + Sync {
    fn schedule(&self, player_id: PlayerId, death: u64, delay: Duration);
}
