use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::errors::StoreError;
use crate::domain::ports::PlayerStore;
use crate::domain::state::{PlayerId, PlayerPatch, PlayerRecord};

// In-memory player store used when no database is configured.
#[derive(Clone, Default)]
pub struct InMemoryPlayerStore {
    pub players: Arc<Mutex<HashMap<PlayerId, PlayerRecord>>>,
}

impl InMemoryPlayerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PlayerStore for InMemoryPlayerStore {
    async fn get_player(&self, id: &str) -> Result<Option<PlayerRecord>, StoreError> {
        let players = self.players.lock().await;
        Ok(players.get(id).cloned())
    }

    async fn create_player(&self, record: PlayerRecord) -> Result<PlayerRecord, StoreError> {
        let mut players = self.players.lock().await;
        players.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn update_player(&self, id: &str, patch: PlayerPatch) -> Result<(), StoreError> {
        let mut players = self.players.lock().await;
        let record = players.get_mut(id).ok_or(StoreError::NotFound)?;
        patch.apply(record);
        Ok(())
    }

    async fn list_players(&self) -> Result<Vec<PlayerRecord>, StoreError> {
        let players = self.players.lock().await;
        let mut records: Vec<PlayerRecord> = players.values().cloned().collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn when_patch_is_applied_then_only_set_fields_change() {
        let store = InMemoryPlayerStore::new();
        store
            .create_player(PlayerRecord::new_default("p1", 100, 1.0))
            .await
            .expect("create");

        let mut patch = PlayerPatch::at(5.0);
        patch.name = Some("Flask".to_string());
        store.update_player("p1", patch).await.expect("update");

        let record = store.get_player("p1").await.expect("get").expect("present");
        assert_eq!(record.name, "Flask");
        assert_eq!(record.health, 100);
        assert_eq!(record.last_update, 5.0);
    }

    #[tokio::test]
    async fn when_updating_unknown_player_then_not_found() {
        let store = InMemoryPlayerStore::new();

        let result = store.update_player("ghost", PlayerPatch::at(1.0)).await;

        assert_eq!(result, Err(StoreError::NotFound));
    }
}
