use crate::domain::errors::{JoinError, VerifyTokenError};
use crate::domain::state::{PlayerId, PlayerRecord};
use crate::interface_adapters::net::sessions::SessionRegistry;
use crate::interface_adapters::protocol::{ClientMessage, ServerMessage};
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::transport::OutboundFrame;
use crate::use_cases::{GameEvent, JoinUseCase};

use axum::{
    Error,
    extract::{
        State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    response::IntoResponse,
};
use futures::SinkExt;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Notify, broadcast, mpsc};
use tokio::time::timeout;
use tracing::{Instrument, Span, debug, info, info_span, warn};

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
    InputClosed,
    FramesClosed,
    JoinRequired,
    JoinTimeout,
    JoinRejected(JoinError),
    ClosedBeforeJoin,
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const MAX_INVALID_JSON: u32 = 10;
const JOIN_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    // Separate connection id for correlating logs before/after a player_id exists.
    let conn_id = state.sessions.next_token();
    let span = info_span!("conn", conn_id, player_id = tracing::field::Empty);
    serve_connection(socket, state, conn_id)
        .instrument(span)
        .await;
}

async fn serve_connection(mut socket: WebSocket, state: Arc<AppState>, conn_id: u64) {
    let mut ctx = match bootstrap_connection(&mut socket, &state, conn_id).await {
        Ok(ctx) => ctx,
        Err(NetError::ClosedBeforeJoin) => {
            info!("client disconnected before join handshake");
            return;
        }
        Err(NetError::JoinRejected(err)) => {
            // The close frame with the reason was already sent by the handshake.
            info!(error = %err, "join rejected");
            return;
        }
        Err(e) => {
            warn!(error = ?e, "failed to bootstrap connection");
            let _ = socket.close().await;
            return;
        }
    };

    Span::current().record("player_id", ctx.player_id.as_str());
    info!(player_id = %ctx.player_id, name = %ctx.name, "client connected");

    // Main Client Loop
    if let Err(e) = run_client_loop(&mut socket, &mut ctx).await {
        warn!(error = ?e, "client loop exited with error");
    }
}

async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<usize, NetError> {
    let txt = serde_json::to_string(msg).map_err(NetError::Serialization)?;
    let bytes = txt.len();
    socket
        .send(Message::Text(txt.into()))
        .await
        .map_err(NetError::Ws)?;
    Ok(bytes)
}

struct ConnCtx {
    pub player_id: PlayerId,
    pub name: String,
    // Token used to verify ownership of the player connection slot.
    pub conn_token: u64,
    pub sessions: Arc<SessionRegistry>,
    // Shutdown signal used to replace stale connections.
    pub conn_shutdown: Arc<Notify>,
    pub input_tx: mpsc::Sender<GameEvent>,
    pub frames_rx: broadcast::Receiver<OutboundFrame>,

    pub msgs_in: u64,
    pub msgs_out: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub frames_skipped: u64,

    pub invalid_json: u32,

    pub last_input_full_log: Instant,
    pub last_frames_lag_log: Instant,
    pub last_invalid_input_log: Instant,

    pub close_frame: Option<CloseFrame>,
}

struct JoinHandshake {
    record: PlayerRecord,
    bytes_in: u64,
    msgs_in: u64,
}

async fn bootstrap_connection(
    socket: &mut WebSocket,
    state: &AppState,
    conn_token: u64,
) -> Result<ConnCtx, NetError> {
    // Subscribe to frames *before* doing anything else (awaits) so the joiner's own
    // roster snapshot is not missed.
    let frames_rx = state.frames_tx.subscribe();

    // Authenticate the very first meaningful client message before assigning player ownership.
    let join = match timeout(
        JOIN_HANDSHAKE_TIMEOUT,
        read_join_handshake(socket, state.join.as_ref()),
    )
    .await
    {
        Ok(result) => result?,
        Err(_) => {
            let _ = send_close_with_reason(socket, close_code::POLICY, "join timeout").await;
            return Err(NetError::JoinTimeout);
        }
    };
    let player_id = join.record.id.clone();
    let name = join.record.name.clone();

    // Track this connection with a unique token so newer connections can replace it.
    let conn_shutdown = state
        .sessions
        .register_or_replace(&player_id, conn_token)
        .await;

    // Tell the client "This is who you are".
    let identity_msg = ServerMessage::Identity {
        player_id: player_id.clone(),
    };
    let bytes_out = match send_message(socket, &identity_msg).await {
        Ok(bytes) => bytes as u64,
        Err(err) => {
            // Ensure the player slot is freed if we fail the handshake early.
            state.sessions.release_if_owner(&player_id, conn_token).await;
            return Err(err);
        }
    };

    let input_tx = state.world.input();
    if input_tx
        .send(GameEvent::Join {
            record: join.record,
        })
        .await
        .is_err()
    {
        state.sessions.release_if_owner(&player_id, conn_token).await;
        return Err(NetError::InputClosed);
    }

    let now = Instant::now() - LOG_THROTTLE;
    Ok(ConnCtx {
        player_id,
        name,
        conn_token,
        sessions: state.sessions.clone(),
        conn_shutdown,
        input_tx,
        frames_rx,

        msgs_in: join.msgs_in,
        msgs_out: 1,
        bytes_in: join.bytes_in,
        bytes_out,
        frames_skipped: 0,

        invalid_json: 0,

        last_input_full_log: now,
        last_frames_lag_log: now,
        last_invalid_input_log: now,

        close_frame: None,
    })
}

enum LoopControl {
    Continue,
    Disconnect,
}

async fn send_close_with_reason(
    socket: &mut WebSocket,
    code: u16,
    reason: &'static str,
) -> Result<(), NetError> {
    socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await
        .map_err(NetError::Ws)?;
    socket.close().await.map_err(NetError::Ws)
}

fn join_close_reason(err: &JoinError) -> (u16, &'static str) {
    match err {
        JoinError::InvalidCredential | JoinError::Verify(VerifyTokenError::InvalidToken) => {
            (close_code::POLICY, "invalid session token")
        }
        JoinError::Verify(VerifyTokenError::SessionExpired) => {
            (close_code::POLICY, "session expired")
        }
        JoinError::IdentityMismatch => (close_code::POLICY, "player id mismatch"),
        JoinError::Verify(VerifyTokenError::UpstreamUnavailable) => {
            (close_code::ERROR, "auth unavailable")
        }
        JoinError::Storage(_) => (close_code::ERROR, "player store unavailable"),
    }
}

async fn read_join_handshake(
    socket: &mut WebSocket,
    join: &JoinUseCase,
) -> Result<JoinHandshake, NetError> {
    loop {
        let Some(incoming) = socket.recv().await else {
            return Err(NetError::ClosedBeforeJoin);
        };

        let message = incoming.map_err(NetError::Ws)?;
        match message {
            Message::Text(text) => {
                let bytes_in = text.len() as u64;
                let payload = match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Join(payload)) => payload,
                    Ok(_) => {
                        let _ = send_close_with_reason(socket, close_code::POLICY, "join required")
                            .await;
                        return Err(NetError::JoinRequired);
                    }
                    Err(_) => {
                        let _ = send_close_with_reason(
                            socket,
                            close_code::POLICY,
                            "invalid join payload",
                        )
                        .await;
                        return Err(NetError::JoinRequired);
                    }
                };

                let record = match join.execute(payload.into()).await {
                    Ok(record) => record,
                    Err(err) => {
                        let (code, reason) = join_close_reason(&err);
                        let _ = send_close_with_reason(socket, code, reason).await;
                        return Err(NetError::JoinRejected(err));
                    }
                };

                return Ok(JoinHandshake {
                    record,
                    bytes_in,
                    msgs_in: 1,
                });
            }
            Message::Binary(_) => {
                let _ = send_close_with_reason(
                    socket,
                    close_code::UNSUPPORTED,
                    "binary messages not supported",
                )
                .await;
                return Err(NetError::JoinRequired);
            }
            Message::Ping(_) | Message::Pong(_) => {}
            Message::Close(_) => return Err(NetError::ClosedBeforeJoin),
        }
    }
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

fn forward_to_world(
    player_id: &str,
    input_tx: &mpsc::Sender<GameEvent>,
    event: GameEvent,
    last_input_full_log: &mut Instant,
) -> Result<LoopControl, NetError> {
    match input_tx.try_send(event) {
        Ok(()) => Ok(LoopControl::Continue),
        Err(TrySendError::Full(_evt)) => {
            if should_log(last_input_full_log) {
                warn!(%player_id, "input channel full; dropping message");
            }
            Ok(LoopControl::Continue)
        }
        Err(TrySendError::Closed(_evt)) => Err(NetError::InputClosed),
    }
}

async fn run_client_loop(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<(), NetError> {
    // Split borrows so `tokio::select!` can hold them concurrently.
    let ConnCtx {
        player_id,
        conn_shutdown,
        input_tx,
        frames_rx,
        msgs_in,
        msgs_out,
        bytes_in,
        bytes_out,
        frames_skipped,
        invalid_json,
        last_input_full_log,
        last_frames_lag_log,
        last_invalid_input_log,
        close_frame,
        ..
    } = ctx;

    let mut fatal: Option<NetError> = None;

    loop {
        // disconnect becomes true on error
        let disconnect: bool = tokio::select! {
            // Incoming Message from Client
            incoming = socket.recv() => {
                match handle_incoming_ws(
                    incoming,
                    player_id,
                    input_tx,
                    msgs_in,
                    bytes_in,
                    invalid_json,
                    last_input_full_log,
                    last_invalid_input_log,
                    close_frame,
                ) {
                    Ok(LoopControl::Continue) => false,
                    Ok(LoopControl::Disconnect) => true,
                    Err(e) => {
                        fatal = Some(e);
                        true
                    }
                }
            }

            // Outgoing events addressed to this player
            frame = frames_rx.recv() => {
                match frame {
                    Ok(frame) if frame.target.includes(player_id) => {
                        match forward_frame(frame, socket, msgs_out, bytes_out).await {
                            LoopControl::Continue => false,
                            LoopControl::Disconnect => true,
                        }
                    }
                    Ok(_) => false,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        *frames_skipped += n;
                        if should_log(last_frames_lag_log) {
                            warn!(missed = n, "outbound events lagged; frames skipped");
                        }
                        false
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        fatal = Some(NetError::FramesClosed);
                        true
                    }
                }
            }

            // Connection replacement signal for duplicate player ids.
            _ = conn_shutdown.notified() => {
                // Ask the client to close; a newer connection took ownership.
                *close_frame = Some(CloseFrame {
                    code: close_code::POLICY,
                    reason: "connection replaced".into(),
                });
                info!(%player_id, "connection replaced by newer session");
                true
            }
        };

        if disconnect {
            if let Some(frame) = close_frame.take() {
                let _ = socket.send(Message::Close(Some(frame))).await;
            }
            if let Err(err) = socket.close().await.map_err(NetError::Ws) {
                debug!(error = ?err, "socket close error");
            }
            break;
        }
    }

    if let Err(e) = disconnect_cleanup(ctx).await {
        warn!(error = ?e, "error during disconnect cleanup");
        if fatal.is_none() {
            fatal = Some(e);
        }
    }

    if let Some(err) = fatal {
        Err(err)
    } else {
        Ok(())
    }
}

#[allow(clippy::too_many_arguments)]
fn handle_incoming_ws(
    incoming: Option<Result<Message, Error>>,
    player_id: &str,
    input_tx: &mpsc::Sender<GameEvent>,
    msgs_in: &mut u64,
    bytes_in: &mut u64,
    invalid_json: &mut u32,
    last_input_full_log: &mut Instant,
    last_invalid_input_log: &mut Instant,
    close_frame: &mut Option<CloseFrame>,
) -> Result<LoopControl, NetError> {
    match incoming {
        Some(Ok(msg)) => match msg {
            Message::Text(text) => {
                *msgs_in += 1;
                *bytes_in += text.len() as u64;

                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Join(_)) => {
                        // Ignore repeated Join packets after bootstrap to keep the session stable.
                        if should_log(last_invalid_input_log) {
                            warn!(%player_id, "duplicate join ignored");
                        }
                        Ok(LoopControl::Continue)
                    }
                    Ok(message) => match message.into_game_event(player_id) {
                        Ok(Some(event)) => {
                            forward_to_world(player_id, input_tx, event, last_input_full_log)
                        }
                        Ok(None) => Ok(LoopControl::Continue),
                        Err(err) => {
                            if should_log(last_invalid_input_log) {
                                warn!(%player_id, error = %err, "invalid client message; dropping");
                            }
                            Ok(LoopControl::Continue)
                        }
                    },
                    Err(parse_err) => {
                        *invalid_json += 1;
                        if should_log(last_invalid_input_log) {
                            warn!(
                                %player_id,
                                bytes = text.len(),
                                error = %parse_err,
                                "failed to parse client message"
                            );
                        }

                        if *invalid_json > MAX_INVALID_JSON {
                            *close_frame = Some(CloseFrame {
                                code: close_code::POLICY,
                                reason: "too many invalid messages".into(),
                            });
                            return Ok(LoopControl::Disconnect);
                        }

                        Ok(LoopControl::Continue)
                    }
                }
            }
            Message::Binary(_) => {
                *close_frame = Some(CloseFrame {
                    code: close_code::UNSUPPORTED,
                    reason: "binary messages not supported".into(),
                });
                Ok(LoopControl::Disconnect)
            }
            Message::Ping(_) | Message::Pong(_) => Ok(LoopControl::Continue),
            Message::Close(_) => Ok(LoopControl::Disconnect),
        },
        Some(Err(e)) => {
            warn!(%player_id, error = %e, "websocket recv error");
            Ok(LoopControl::Disconnect)
        }
        None => {
            info!(%player_id, "websocket closed");
            Ok(LoopControl::Disconnect)
        }
    }
}

async fn forward_frame(
    frame: OutboundFrame,
    socket: &mut WebSocket,
    msgs_out: &mut u64,
    bytes_out: &mut u64,
) -> LoopControl {
    let bytes_len = frame.bytes.len();
    match socket
        .send(Message::Text(frame.bytes))
        .await
        .map_err(NetError::Ws)
    {
        Ok(()) => {
            *msgs_out += 1;
            *bytes_out += bytes_len as u64;
            LoopControl::Continue
        }
        Err(err) => {
            // Log unexpected send failures; disconnect will follow immediately.
            warn!(error = ?err, "failed to send event frame");
            LoopControl::Disconnect
        }
    }
}

async fn disconnect_cleanup(ctx: &ConnCtx) -> Result<(), NetError> {
    // Only the connection that still owns the slot takes the player out of the world;
    // a replaced connection leaves the newer session alone.
    if ctx
        .sessions
        .release_if_owner(&ctx.player_id, ctx.conn_token)
        .await
    {
        ctx.input_tx
            .send(GameEvent::Leave {
                player_id: ctx.player_id.clone(),
            })
            .await
            .map_err(|_| NetError::InputClosed)?;
    }

    debug!(
        player_id = %ctx.player_id,
        msgs_in = ctx.msgs_in,
        msgs_out = ctx.msgs_out,
        bytes_in = ctx.bytes_in,
        bytes_out = ctx.bytes_out,
        invalid_json = ctx.invalid_json,
        frames_skipped = ctx.frames_skipped,
        "connection stats"
    );
    info!(player_id = %ctx.player_id, "client disconnected");
    Ok(())
}
