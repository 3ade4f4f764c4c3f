use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::broadcast;

use crate::domain::ports::Clock;
use crate::interface_adapters::net::sessions::SessionRegistry;
use crate::interface_adapters::transport::OutboundFrame;
use crate::use_cases::{JoinUseCase, WorldHandle};

#[derive(Clone)]
pub struct AppState {
    // Inputs flowing from the network into the world task.
    pub world: WorldHandle,
    // Credential verification and durable player lookup for the handshake.
    pub join: Arc<JoinUseCase>,
    // Serialized outbound events, shared across all connections.
    pub frames_tx: broadcast::Sender<OutboundFrame>,
    // Which connection currently owns each player id.
    pub sessions: Arc<SessionRegistry>,
}

// System clock adapter: epoch seconds with sub-second precision.
#[derive(Clone)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64()
    }
}
