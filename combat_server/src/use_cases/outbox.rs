// Fire-and-forget durable writes and relay notifications spawned off the world task.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::types::GameEvent;
use crate::domain::events::RelayEvent;
use crate::domain::ports::{PlayerStore, RelayNotifier};
use crate::domain::state::{PlayerId, PlayerPatch};

#[derive(Clone)]
pub struct DurableWriter {
    store: Arc<dyn PlayerStore>,
    feedback_tx: mpsc::Sender<GameEvent>,
}

impl DurableWriter {
    pub fn new(store: Arc<dyn PlayerStore>, feedback_tx: mpsc::Sender<GameEvent>) -> Self {
        Self { store, feedback_tx }
    }

    /// Writes a patch in the background. Failures are logged only.
    pub fn write(&self, player_id: PlayerId, patch: PlayerPatch) {
        let store = self.store.clone();
        tokio::spawn(async move {
            if let Err(err) = store.update_player(&player_id, patch).await {
                warn!(%player_id, error = %err, "durable player write failed");
            }
        });
    }

    /// Writes a throttled position. A failure is reported back to the world so the
    /// sync record can be dropped and the next qualifying move retried.
    pub fn write_position(&self, player_id: PlayerId, patch: PlayerPatch) {
        let store = self.store.clone();
        let feedback_tx = self.feedback_tx.clone();
        let written_at = patch.last_update;
        tokio::spawn(async move {
            if let Err(err) = store.update_player(&player_id, patch).await {
                warn!(%player_id, error = %err, "durable position write failed");
                let event = GameEvent::PositionWriteFailed {
                    player_id,
                    written_at,
                };
                if feedback_tx.send(event).await.is_err() {
                    debug!("world input closed; write failure dropped");
                }
            }
        });
    }
}

#[derive(Clone)]
pub struct RelayDispatch {
    relay: Arc<dyn RelayNotifier>,
}

impl RelayDispatch {
    pub fn new(relay: Arc<dyn RelayNotifier>) -> Self {
        Self { relay }
    }

    pub fn send(&self, event: RelayEvent) {
        let relay = self.relay.clone();
        tokio::spawn(async move {
            if let Err(err) = relay.notify(event).await {
                warn!(error = %err, "relay notification failed");
            }
        });
    }
}
