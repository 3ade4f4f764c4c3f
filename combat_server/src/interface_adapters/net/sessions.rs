// Connection ownership per player: a newer connection replaces the older one.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::{Mutex, Notify};

use crate::domain::state::PlayerId;

struct Slot {
    token: u64,
    shutdown: Arc<Notify>,
}

pub struct SessionRegistry {
    slots: Mutex<HashMap<PlayerId, Slot>>,
    next_token: AtomicU64,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        // Seeded from the clock so ids from a restarted process do not repeat in logs.
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;
        Self {
            slots: Mutex::new(HashMap::new()),
            next_token: AtomicU64::new(seed),
        }
    }

    /// Process-unique id for a connection; doubles as its slot ownership token.
    pub fn next_token(&self) -> u64 {
        self.next_token.fetch_add(1, Ordering::Relaxed)
    }

    /// Claims the player's slot for `token`, signalling any previous owner to close.
    /// Returns the notifier this connection should watch for its own replacement.
    pub async fn register_or_replace(&self, player_id: &str, token: u64) -> Arc<Notify> {
        let shutdown = Arc::new(Notify::new());
        let previous = self.slots.lock().await.insert(
            player_id.to_string(),
            Slot {
                token,
                shutdown: shutdown.clone(),
            },
        );
        if let Some(previous) = previous {
            previous.shutdown.notify_one();
        }
        shutdown
    }

    /// Frees the slot if `token` still owns it. Returns whether it did.
    pub async fn release_if_owner(&self, player_id: &str, token: u64) -> bool {
        let mut slots = self.slots.lock().await;
        if slots.get(player_id).is_some_and(|slot| slot.token == token) {
            slots.remove(player_id);
            true
        } else {
            false
        }
    }
}
