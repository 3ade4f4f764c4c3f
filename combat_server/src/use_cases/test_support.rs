use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::errors::{RelayError, StoreError, VerifyTokenError};
use crate::domain::events::{RelayEvent, ServerEvent, Target};
use crate::domain::ports::{
    Clock, IdentityVerifier, PlayerStore, RelayNotifier, RespawnScheduler, Transport,
    VerifiedIdentity,
};
use crate::domain::state::{Player, PlayerId, PlayerPatch, PlayerRecord};
use crate::domain::Vec3;

// Shared fixed time source for deterministic use-case tests.
pub(crate) struct FixedClock(pub(crate) f64);

impl Clock for FixedClock {
    fn now_secs(&self) -> f64 {
        self.0
    }
}

// Time source the test can move forward between events.
#[derive(Default)]
pub(crate) struct ManualClock(Mutex<f64>);

impl ManualClock {
    pub(crate) fn starting_at(now: f64) -> Arc<Self> {
        Arc::new(Self(Mutex::new(now)))
    }

    pub(crate) fn set(&self, now: f64) {
        *self.0.lock().expect("clock mutex poisoned") = now;
    }
}

impl Clock for ManualClock {
    fn now_secs(&self) -> f64 {
        *self.0.lock().expect("clock mutex poisoned")
    }
}

#[derive(Clone, Default)]
pub(crate) struct RecordingTransport {
    events: Arc<Mutex<Vec<(Target, ServerEvent)>>>,
}

impl RecordingTransport {
    pub(crate) fn events(&self) -> Vec<(Target, ServerEvent)> {
        self.events.lock().expect("events mutex poisoned").clone()
    }

    pub(crate) fn count(&self, pred: impl Fn(&ServerEvent) -> bool) -> usize {
        self.events
            .lock()
            .expect("events mutex poisoned")
            .iter()
            .filter(|(_, e)| pred(e))
            .count()
    }

    pub(crate) fn clear(&self) {
        self.events.lock().expect("events mutex poisoned").clear();
    }
}

impl Transport for RecordingTransport {
    fn emit(&self, target: Target, event: ServerEvent) {
        self.events
            .lock()
            .expect("events mutex poisoned")
            .push((target, event));
    }
}

#[derive(Clone, Copy, Default)]
pub(crate) struct FailureFlags {
    pub get: bool,
    pub create: bool,
    pub update: bool,
    pub list: bool,
}

#[derive(Clone, Default)]
pub(crate) struct RecordingStore {
    players: Arc<Mutex<HashMap<PlayerId, PlayerRecord>>>,
    updates: Arc<Mutex<Vec<(PlayerId, PlayerPatch)>>>,
    failures: Arc<Mutex<FailureFlags>>,
}

impl RecordingStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_failures(self, failures: FailureFlags) -> Self {
        self.set_failures(failures);
        self
    }

    pub(crate) fn set_failures(&self, failures: FailureFlags) {
        *self.failures.lock().expect("failures mutex poisoned") = failures;
    }

    pub(crate) fn insert_test_player(&self, record: PlayerRecord) {
        let mut guard = self.players.lock().expect("players mutex poisoned");
        guard.insert(record.id.clone(), record);
    }

    pub(crate) fn get_test_player(&self, id: &str) -> Option<PlayerRecord> {
        let guard = self.players.lock().expect("players mutex poisoned");
        guard.get(id).cloned()
    }

    pub(crate) fn updates(&self) -> Vec<(PlayerId, PlayerPatch)> {
        self.updates.lock().expect("updates mutex poisoned").clone()
    }

    fn failures(&self) -> FailureFlags {
        *self.failures.lock().expect("failures mutex poisoned")
    }
}

#[async_trait]
impl PlayerStore for RecordingStore {
    async fn get_player(&self, id: &str) -> Result<Option<PlayerRecord>, StoreError> {
        if self.failures().get {
            return Err(StoreError::Unavailable("get failed".to_string()));
        }
        Ok(self.get_test_player(id))
    }

    async fn create_player(&self, record: PlayerRecord) -> Result<PlayerRecord, StoreError> {
        if self.failures().create {
            return Err(StoreError::Unavailable("create failed".to_string()));
        }
        self.insert_test_player(record.clone());
        Ok(record)
    }

    async fn update_player(&self, id: &str, patch: PlayerPatch) -> Result<(), StoreError> {
        if self.failures().update {
            return Err(StoreError::Unavailable("update failed".to_string()));
        }
        self.updates
            .lock()
            .expect("updates mutex poisoned")
            .push((id.to_string(), patch.clone()));

        let mut guard = self.players.lock().expect("players mutex poisoned");
        let record = guard.get_mut(id).ok_or(StoreError::NotFound)?;
        patch.apply(record);
        Ok(())
    }

    async fn list_players(&self) -> Result<Vec<PlayerRecord>, StoreError> {
        if self.failures().list {
            return Err(StoreError::Unavailable("list failed".to_string()));
        }
        let guard = self.players.lock().expect("players mutex poisoned");
        let mut records: Vec<PlayerRecord> = guard.values().cloned().collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records)
    }
}

#[derive(Clone, Default)]
pub(crate) struct RecordingRelay {
    events: Arc<Mutex<Vec<RelayEvent>>>,
}

impl RecordingRelay {
    pub(crate) fn events(&self) -> Vec<RelayEvent> {
        self.events.lock().expect("relay mutex poisoned").clone()
    }
}

#[async_trait]
impl RelayNotifier for RecordingRelay {
    async fn notify(&self, event: RelayEvent) -> Result<(), RelayError> {
        self.events.lock().expect("relay mutex poisoned").push(event);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub(crate) struct RecordingScheduler {
    scheduled: Arc<Mutex<Vec<(PlayerId, u64, Duration)>>>,
}

impl RecordingScheduler {
    pub(crate) fn scheduled(&self) -> Vec<(PlayerId, u64, Duration)> {
        self.scheduled.lock().expect("scheduler mutex poisoned").clone()
    }
}

impl RespawnScheduler for RecordingScheduler {
    fn schedule(&self, player_id: PlayerId, death: u64, delay: Duration) {
        self.scheduled
            .lock()
            .expect("scheduler mutex poisoned")
            .push((player_id, death, delay));
    }
}

// Identity stub that accepts credentials of the form "token-<user id>".
pub(crate) struct StubIdentity {
    pub(crate) failure: Option<VerifyTokenError>,
}

#[async_trait]
impl IdentityVerifier for StubIdentity {
    async fn verify(&self, credential: &str) -> Result<VerifiedIdentity, VerifyTokenError> {
        if let Some(err) = self.failure {
            return Err(err);
        }
        let user_id = credential
            .strip_prefix("token-")
            .ok_or(VerifyTokenError::InvalidToken)?;
        Ok(VerifiedIdentity {
            user_id: user_id.to_string(),
            display_name: None,
        })
    }
}

pub(crate) fn test_player(id: &str, position: Vec3) -> Player {
    let mut record = PlayerRecord::new_default(id, 100, 0.0);
    record.position = Some(position);
    Player::from(record)
}

// Lets spawned write/relay tasks run on the current-thread test runtime.
pub(crate) async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}
