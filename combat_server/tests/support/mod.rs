// Shared primitives for one-time server bootstrapping across integration tests.
use std::{
    // `Arc` shares data between threads; `OnceLock` writes a value only once.
    sync::{Arc, OnceLock},
    // Sleep durations are used in readiness polling loops.
    time::Duration,
};

use axum::{Json, Router, http::StatusCode, routing::post};
use combat_server::ServerSettings;
use combat_server::domain::tuning::GameTuning;
use serde_json::{Value, json};

// Global websocket URL used by all tests after the server publishes its bound address.
static SERVER_URL: OnceLock<String> = OnceLock::new();
// One-time guard that ensures the server bootstrap path runs only once.
static SERVER_READY: OnceLock<()> = OnceLock::new();

// Stub auth service: "token-<n>" verifies as user n, anything else is rejected.
async fn stub_verify(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let token = body["token"].as_str().unwrap_or_default();
    match token.strip_prefix("token-").and_then(|id| id.parse::<u64>().ok()) {
        Some(user_id) => (
            StatusCode::OK,
            Json(json!({ "user_id": user_id, "display_name": format!("Sailor {user_id}") })),
        ),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "invalid session token" })),
        ),
    }
}

// Ensure the test server is running and return the shared websocket URL.
pub fn ensure_server() -> &'static str {
    // Run initialization exactly once even if multiple tests call this function.
    SERVER_READY.get_or_init(|| {
        // Local one-time slot where the server thread publishes its selected address.
        let published_addr = Arc::new(OnceLock::<String>::new());
        let published_addr_thread = Arc::clone(&published_addr);
        // Spawn an OS thread so the server outlives individual `#[tokio::test]` runtimes.
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("test runtime");
            runtime.block_on(async move {
                // Auth stub first, so the combat server can point at its address.
                let auth_listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind auth stub port");
                let auth_addr = auth_listener.local_addr().expect("auth stub addr");
                let auth_app = Router::new().route("/auth/verify-token", post(stub_verify));
                tokio::spawn(async move {
                    let _ = axum::serve(auth_listener, auth_app).await;
                });

                // Bind to an ephemeral port to avoid collisions with local services.
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind ephemeral test port");
                let addr = listener.local_addr().expect("get local addr");
                let _ = published_addr_thread.set(addr.to_string());

                let settings = ServerSettings {
                    auth_service_url: format!("http://{auth_addr}"),
                    auth_verify_timeout: Duration::from_millis(1500),
                    database_url: None,
                    relay_url: None,
                    relay_secret: String::new(),
                    tuning: GameTuning::default(),
                    tick_interval: Duration::from_millis(50),
                };
                // Start serving requests until the test process exits.
                combat_server::run(listener, settings)
                    .await
                    .expect("server failed");
            });
        });
        // Block until the address is published and the bound port starts accepting connections.
        wait_for_server_readiness(published_addr);
    });

    SERVER_URL
        .get()
        .expect("server url should be initialized")
        .as_str()
}

// Wait for address publication and then for the server socket to accept TCP connections.
fn wait_for_server_readiness(published_addr: Arc<OnceLock<String>>) {
    let addr = loop {
        if let Some(addr) = published_addr.get() {
            break addr.clone();
        }
        // Avoid a tight loop while waiting for the background thread.
        std::thread::sleep(Duration::from_millis(10));
    };

    let _ = SERVER_URL.set(format!("ws://{addr}/ws"));

    // Retry for a short period to avoid racing server bind/accept.
    for _ in 0..100 {
        if std::net::TcpStream::connect(&addr).is_ok() {
            return;
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    // Fail fast if startup never reached an accepting state.
    panic!("server did not become ready in time");
}
