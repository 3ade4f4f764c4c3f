mod support;

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn connect() -> Client {
    let url = support::ensure_server();
    let (socket, _) = connect_async(url).await.expect("websocket should connect");
    socket
}

async fn send(client: &mut Client, message: Value) {
    client
        .send(Message::Text(message.to_string().into()))
        .await
        .expect("send should succeed");
}

// Reads frames until one matches, failing after a few seconds.
async fn expect_message(client: &mut Client, pred: impl Fn(&Value) -> bool) -> Value {
    let wait = async {
        while let Some(frame) = client.next().await {
            let frame = frame.expect("websocket frame");
            let Ok(text) = frame.to_text() else {
                continue;
            };
            let Ok(value) = serde_json::from_str::<Value>(text) else {
                continue;
            };
            if pred(&value) {
                return value;
            }
        }
        panic!("connection closed before expected message");
    };
    tokio::time::timeout(Duration::from_secs(5), wait)
        .await
        .expect("expected message in time")
}

async fn join(client: &mut Client, user_id: u64, x: f64) -> Value {
    send(
        client,
        json!({
            "type": "join",
            "data": { "token": format!("token-{user_id}"), "position": { "x": x, "z": 0.0 } }
        }),
    )
    .await;
    expect_message(client, |m| m["type"] == "identity").await
}

fn is_type(message: &Value, kind: &str) -> bool {
    message["type"] == kind
}

#[tokio::test]
async fn when_cannon_is_fired_at_a_nearby_player_then_both_see_the_hit() {
    let mut gunner = connect().await;
    let identity = join(&mut gunner, 101, 1000.0).await;
    assert_eq!(identity["data"]["player_id"], "101");

    let mut target = connect().await;
    join(&mut target, 102, 1020.0).await;
    let roster = expect_message(&mut target, |m| is_type(m, "all_players")).await;
    let players = roster["data"]["players"].as_array().expect("players array");
    assert!(players.iter().any(|p| p["id"] == "101"));

    expect_message(&mut gunner, |m| {
        is_type(m, "player_joined") && m["data"]["id"] == "102"
    })
    .await;

    let shot = json!({
        "type": "fire_cannon",
        "data": {
            "position": { "x": 1000.0, "y": 0.0, "z": 0.0 },
            "direction": { "x": 1.0, "y": 0.0, "z": 0.0 }
        }
    });
    send(&mut gunner, shot.clone()).await;
    // Immediate second shot is still cooling down.
    send(&mut gunner, shot).await;
    let cooldown = expect_message(&mut gunner, |m| is_type(m, "cooldown_active")).await;
    assert_eq!(cooldown["data"]["weapon"], "cannon");

    let fired = expect_message(&mut target, |m| is_type(m, "weapon_fired")).await;
    assert_eq!(fired["data"]["weapon"], "cannon");
    assert_eq!(fired["data"]["owner_id"], "101");

    let hit = expect_message(&mut target, |m| is_type(m, "projectile_hit")).await;
    assert_eq!(hit["data"]["victim_id"], "102");
    assert_eq!(hit["data"]["effect"]["kind"], "damage");
    assert_eq!(hit["data"]["effect"]["amount"], 10);

    let seen_by_gunner = expect_message(&mut gunner, |m| is_type(m, "projectile_hit")).await;
    assert_eq!(seen_by_gunner["data"]["projectile_id"], hit["data"]["projectile_id"]);
}

#[tokio::test]
async fn when_player_moves_then_others_receive_player_moved() {
    let mut watcher = connect().await;
    join(&mut watcher, 201, -500.0).await;

    let mut mover = connect().await;
    join(&mut mover, 202, -520.0).await;

    send(
        &mut mover,
        json!({
            "type": "update_position",
            "data": { "x": -510.0, "z": 4.0, "rotation": 1.5 }
        }),
    )
    .await;

    let moved = expect_message(&mut watcher, |m| {
        is_type(m, "player_moved") && m["data"]["player_id"] == "202"
    })
    .await;
    assert_eq!(moved["data"]["position"]["x"], -510.0);
    assert_eq!(moved["data"]["rotation"], 1.5);
}

// Waits for the server's close frame and returns its reason.
async fn close_reason(client: &mut Client) -> Option<String> {
    tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(frame) = client.next().await {
            match frame {
                Ok(Message::Close(frame)) => return frame.map(|f| f.reason.to_string()),
                Ok(_) => continue,
                Err(_) => return None,
            }
        }
        None
    })
    .await
    .expect("close in time")
}

#[tokio::test]
async fn when_first_message_is_not_join_then_connection_is_closed() {
    let mut client = connect().await;
    send(
        &mut client,
        json!({ "type": "send_message", "data": { "content": "hello" } }),
    )
    .await;

    assert_eq!(close_reason(&mut client).await.as_deref(), Some("join required"));
}

#[tokio::test]
async fn when_join_token_is_rejected_then_connection_is_closed_with_reason() {
    let mut client = connect().await;
    send(
        &mut client,
        json!({ "type": "join", "data": { "token": "forged" } }),
    )
    .await;

    assert_eq!(
        close_reason(&mut client).await.as_deref(),
        Some("invalid session token")
    );
}

#[tokio::test]
async fn when_player_leaves_then_others_see_disconnect() {
    let mut stayer = connect().await;
    join(&mut stayer, 301, 3000.0).await;

    let mut leaver = connect().await;
    join(&mut leaver, 302, 3050.0).await;
    expect_message(&mut stayer, |m| {
        is_type(m, "player_joined") && m["data"]["id"] == "302"
    })
    .await;

    leaver.close(None).await.expect("close should succeed");

    let gone = expect_message(&mut stayer, |m| is_type(m, "player_disconnected")).await;
    assert_eq!(gone["data"]["player_id"], "302");
}
