use std::sync::Arc;

use tracing::{info, warn};

use super::presence::sanitize_name;
use crate::domain::errors::{JoinError, StoreError};
use crate::domain::ports::{Clock, IdentityVerifier, PlayerStore};
use crate::domain::state::{PlayerPatch, PlayerRecord};
use crate::domain::Vec3;

pub const MAX_CREDENTIAL_BYTES: usize = 4096;

#[derive(Debug, Clone, Default)]
pub struct JoinRequest {
    pub credential: String,
    pub claimed_id: Option<String>,
    pub name: Option<String>,
    pub position: Option<Vec3>,
}

// Join use case: verifies the credential, then reactivates or creates the durable player.
pub struct JoinUseCase {
    pub identity: Arc<dyn IdentityVerifier>,
    pub store: Arc<dyn PlayerStore>,
    pub clock: Arc<dyn Clock>,
    pub max_health: i32,
}

impl JoinUseCase {
    pub async fn execute(&self, request: JoinRequest) -> Result<PlayerRecord, JoinError> {
        let credential = request.credential.trim();
        if credential.is_empty() || credential.len() > MAX_CREDENTIAL_BYTES {
            return Err(JoinError::InvalidCredential);
        }

        let identity = self
            .identity
            .verify(credential)
            .await
            .map_err(JoinError::Verify)?;
        if request
            .claimed_id
            .as_deref()
            .is_some_and(|claimed| claimed != identity.user_id)
        {
            return Err(JoinError::IdentityMismatch);
        }

        let now = self.clock.now_secs();
        let existing = self
            .store
            .get_player(&identity.user_id)
            .await
            .map_err(JoinError::Storage)?;

        match existing {
            Some(mut record) => {
                let mut patch = PlayerPatch::at(now);
                patch.active = Some(true);
                patch.health = Some(self.max_health);
                self.store
                    .update_player(&record.id, patch.clone())
                    .await
                    .map_err(JoinError::Storage)?;
                patch.apply(&mut record);

                info!(player_id = %record.id, "player reactivated");
                Ok(record)
            }
            None => {
                let mut record =
                    PlayerRecord::new_default(identity.user_id.clone(), self.max_health, now);
                let requested = request.name.as_deref().or(identity.display_name.as_deref());
                if let Some(name) = requested.and_then(|n| sanitize_name(n).ok()) {
                    record.name = name;
                }
                if let Some(position) = request.position.filter(|p| p.is_finite()) {
                    record.position = Some(position);
                }

                let record = self
                    .store
                    .create_player(record)
                    .await
                    .map_err(JoinError::Storage)?;
                info!(player_id = %record.id, name = %record.name, "player created");
                Ok(record)
            }
        }
    }
}

/// Loads every durable player for the roster. Players left active by a previous run are
/// marked inactive; a failed write is logged and the load continues.
pub async fn load_initial_players(
    store: &dyn PlayerStore,
    now: f64,
) -> Result<Vec<PlayerRecord>, StoreError> {
    let mut records = store.list_players().await?;

    for record in records.iter_mut().filter(|r| r.active) {
        let mut patch = PlayerPatch::at(now);
        patch.active = Some(false);
        if let Err(err) = store.update_player(&record.id, patch.clone()).await {
            warn!(player_id = %record.id, error = %err, "failed to mark player inactive");
        }
        patch.apply(record);
    }

    info!(count = records.len(), "loaded players");
    Ok(records)
}
