// Framework bootstrap for the combat server runtime.

use crate::domain::ports::{Clock, IdentityVerifier, PlayerStore, RelayNotifier};
use crate::domain::tuning::GameTuning;
use crate::frameworks::{config, db};
use crate::interface_adapters::clients::auth::AuthClient;
use crate::interface_adapters::clients::relay::{HttpRelayClient, NoopRelay};
use crate::interface_adapters::net::sessions::SessionRegistry;
use crate::interface_adapters::net::ws_handler;
use crate::interface_adapters::state::{AppState, SystemClock};
use crate::interface_adapters::stores::{InMemoryPlayerStore, PostgresPlayerStore};
use crate::interface_adapters::transport::spawn_outbound;
use crate::use_cases::{
    JoinUseCase, WorldPorts, WorldSettings, load_initial_players, spawn_world,
};

use axum::{Router, routing::get};
use std::net::SocketAddr;
use std::path::Path;
use std::{io::Result, sync::Arc, time::Duration};

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

// Everything `run` needs to wire the server; `from_env` reads the process config.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub auth_service_url: String,
    pub auth_verify_timeout: Duration,
    pub database_url: Option<String>,
    pub relay_url: Option<String>,
    pub relay_secret: String,
    pub tuning: GameTuning,
    pub tick_interval: Duration,
}

impl ServerSettings {
    pub fn from_env() -> Result<Self> {
        let tuning_path = config::tuning_path();
        let tuning = config::load_tuning(tuning_path.as_deref().map(Path::new))
            .map_err(std::io::Error::other)?;

        Ok(Self {
            auth_service_url: config::auth_service_url(),
            auth_verify_timeout: config::auth_verify_timeout(),
            database_url: config::database_url(),
            relay_url: config::relay_url(),
            relay_secret: config::relay_secret(),
            tuning,
            tick_interval: config::TICK_INTERVAL,
        })
    }
}

pub async fn run(listener: tokio::net::TcpListener, settings: ServerSettings) -> Result<()> {
    let address = listener.local_addr()?;
    // build state
    let state = build_state(settings).await?;
    // Start the Web Server
    let app = Router::new()
        .route("/ws", get(ws_handler))
        .with_state(state);

    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking
    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let settings = ServerSettings::from_env().inspect_err(|e| {
        tracing::error!(error = %e, "invalid configuration");
    })?;
    let address = SocketAddr::from(([127, 0, 0, 1], config::http_port()));

    // Bind TCP listener with error handling
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener, settings).await
}

async fn build_store(database_url: Option<&str>) -> Result<Arc<dyn PlayerStore>> {
    let Some(database_url) = database_url else {
        tracing::warn!("DATABASE_URL not set; players are kept in memory only");
        return Ok(Arc::new(InMemoryPlayerStore::new()));
    };

    let db = db::connect_pool(database_url)
        .await
        .map_err(|e| std::io::Error::other(format!("failed to connect database: {e}")))?;
    db::run_migrations(&db)
        .await
        .map_err(|e| std::io::Error::other(format!("failed to run migrations: {e}")))?;
    tracing::debug!("player store connected");

    Ok(Arc::new(PostgresPlayerStore { db }))
}

fn build_relay(settings: &ServerSettings) -> Result<Arc<dyn RelayNotifier>> {
    let Some(relay_url) = settings.relay_url.as_deref() else {
        return Ok(Arc::new(NoopRelay));
    };

    let relay = HttpRelayClient::new(relay_url, settings.relay_secret.clone(), config::RELAY_TIMEOUT)
        .map_err(|e| std::io::Error::other(format!("failed to initialize relay client: {e}")))?;
    tracing::debug!(relay_url = %relay_url, "relay client configured");
    Ok(Arc::new(relay))
}

async fn build_state(settings: ServerSettings) -> Result<Arc<AppState>> {
    let auth_client = AuthClient::new(
        settings.auth_service_url.clone(),
        settings.auth_verify_timeout,
    )
    .map_err(|e| std::io::Error::other(format!("failed to initialize auth client: {e}")))?;
    tracing::debug!(
        auth_base_url = %settings.auth_service_url,
        auth_verify_timeout_ms = settings.auth_verify_timeout.as_millis(),
        "auth client configured"
    );
    let identity: Arc<dyn IdentityVerifier> = Arc::new(auth_client);

    let store = build_store(settings.database_url.as_deref()).await?;
    let relay = build_relay(&settings)?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // Seed the roster from durable storage; stale active flags are cleared here.
    let initial_players = load_initial_players(store.as_ref(), clock.now_secs())
        .await
        .map_err(|e| std::io::Error::other(format!("failed to load players: {e}")))?;

    // Events are serialized once and fanned out to every connection.
    let (transport, frames_tx) = spawn_outbound(config::OUTBOUND_BROADCAST_CAPACITY);

    let world = spawn_world(
        WorldSettings {
            tuning: settings.tuning,
            input_capacity: config::INPUT_CHANNEL_CAPACITY,
            tick_interval: settings.tick_interval,
        },
        WorldPorts {
            transport: Arc::new(transport),
            store: store.clone(),
            relay,
            clock: clock.clone(),
        },
        initial_players,
    );
    world.start_ticking();

    let join = Arc::new(JoinUseCase {
        identity,
        store,
        clock,
        max_health: settings.tuning.player.max_health,
    });

    Ok(Arc::new(AppState {
        world,
        join,
        frames_tx,
        sessions: Arc::new(SessionRegistry::new()),
    }))
}
