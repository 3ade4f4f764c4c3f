// Outbound pipeline: world events -> serialized frames -> per-connection filtering.

use axum::extract::ws::Utf8Bytes;
use tokio::sync::broadcast;
use tracing::{debug, error, warn};

use crate::domain::events::{ServerEvent, Target};
use crate::domain::ports::Transport;
use crate::interface_adapters::protocol::ServerMessage;

/// One serialized event plus who should receive it.
#[derive(Debug, Clone)]
pub struct OutboundFrame {
    pub target: Target,
    pub bytes: Utf8Bytes,
}

/// `Transport` adapter used by the world task. Never blocks.
#[derive(Clone)]
pub struct BroadcastTransport {
    events_tx: broadcast::Sender<(Target, ServerEvent)>,
}

impl BroadcastTransport {
    pub fn new(events_tx: broadcast::Sender<(Target, ServerEvent)>) -> Self {
        Self { events_tx }
    }
}

impl Transport for BroadcastTransport {
    fn emit(&self, target: Target, event: ServerEvent) {
        if self.events_tx.send((target, event)).is_err() {
            debug!("no outbound subscribers; event dropped");
        }
    }
}

pub async fn event_serializer(
    mut events_rx: broadcast::Receiver<(Target, ServerEvent)>,
    frames_tx: broadcast::Sender<OutboundFrame>,
) {
    // Serialize each event once and broadcast the shared bytes.
    loop {
        match events_rx.recv().await {
            Ok((target, event)) => {
                let msg = ServerMessage::from(event);
                let txt = match serde_json::to_string(&msg) {
                    Ok(txt) => txt,
                    Err(e) => {
                        error!(error = ?e, "failed to serialize server event");
                        continue;
                    }
                };
                let _ = frames_tx.send(OutboundFrame {
                    target,
                    bytes: Utf8Bytes::from(txt),
                });
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(missed = n, "event serializer lagged; events dropped");
            }
            Err(broadcast::error::RecvError::Closed) => {
                warn!("server events channel closed; serializer exiting");
                break;
            }
        }
    }
}

/// Wires a transport to a frame channel and spawns the serializer between them.
pub fn spawn_outbound(capacity: usize) -> (BroadcastTransport, broadcast::Sender<OutboundFrame>) {
    let (events_tx, events_rx) = broadcast::channel(capacity);
    let (frames_tx, _frames_rx) = broadcast::channel(capacity);
    tokio::spawn(event_serializer(events_rx, frames_tx.clone()));
    (BroadcastTransport::new(events_tx), frames_tx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn when_event_is_emitted_then_frame_carries_target_and_json() {
        let (transport, frames_tx) = spawn_outbound(16);
        let mut frames_rx = frames_tx.subscribe();

        transport.emit(
            Target::AllExcept("p1".to_string()),
            ServerEvent::PlayerDisconnected {
                player_id: "p1".to_string(),
            },
        );

        let frame = frames_rx.recv().await.expect("frame");
        assert_eq!(frame.target, Target::AllExcept("p1".to_string()));
        let value: serde_json::Value =
            serde_json::from_str(frame.bytes.as_str()).expect("json frame");
        assert_eq!(value["type"], "player_disconnected");
        assert_eq!(value["data"]["player_id"], "p1");
    }
}
