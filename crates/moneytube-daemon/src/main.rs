//! moneytube-daemon: the MoneyTube coin-economy daemon.
//!
//! Single OS process running a Tokio async runtime. The web front end talks
//! to the daemon via JSON-RPC over a Unix socket.

mod commands;
mod config;
mod events;
mod notify;
mod password;
mod rpc;
mod session;
mod storage;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{error, info, warn};

use moneytube_economy::ads::AdSessions;
use moneytube_types::now_secs;

use crate::config::DaemonConfig;
use crate::events::EventBus;
use crate::notify::Notifier;
use crate::rpc::RpcServer;
use crate::session::SessionStore;
use crate::storage::LocalObjectStore;

/// How often idle sessions and stale ad tickets are swept.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Daemon-wide shared state.
pub struct DaemonState {
    /// Database connection.
    pub db: Arc<tokio::sync::Mutex<rusqlite::Connection>>,
    /// Configuration.
    pub config: DaemonConfig,
    /// Event bus for pushing events to subscribers.
    pub event_bus: EventBus,
    /// Live session tokens.
    pub sessions: tokio::sync::Mutex<SessionStore>,
    /// Running ad countdowns.
    pub ad_sessions: tokio::sync::Mutex<AdSessions>,
    /// Video and thumbnail objects.
    pub store: LocalObjectStore,
    /// Withdrawal notifications.
    pub notifier: Notifier,
    /// Shutdown signal sender.
    pub shutdown_tx: broadcast::Sender<()>,
}

impl DaemonState {
    pub fn new(conn: rusqlite::Connection, config: DaemonConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            db: Arc::new(tokio::sync::Mutex::new(conn)),
            sessions: tokio::sync::Mutex::new(SessionStore::new(config.session_timeout_secs())),
            ad_sessions: tokio::sync::Mutex::new(AdSessions::new()),
            store: LocalObjectStore::new(config.media_dir(), &config.storage.public_base_url),
            notifier: Notifier::from_config(&config),
            event_bus: EventBus::new(1000),
            config,
            shutdown_tx,
        }
    }
}

fn init_tracing(config: &DaemonConfig) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("moneytube={}", config.advanced.log_level).parse()?);

    if config.advanced.log_file.is_empty() {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    } else {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.advanced.log_file)?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load config
    let config = DaemonConfig::load()?;
    init_tracing(&config)?;

    info!("MoneyTube daemon starting");

    let data_dir = config.data_dir();
    std::fs::create_dir_all(&data_dir)?;
    std::fs::create_dir_all(config.media_dir())?;

    // 2. Open database
    let db_path = data_dir.join("moneytube.db");
    let conn = moneytube_db::open(&db_path)?;

    // 3. Build daemon state
    let state = Arc::new(DaemonState::new(conn, config));

    // 4. Make sure the admin account exists
    if let Err(e) = commands::auth::bootstrap_admin(&state).await {
        warn!("admin bootstrap failed: {:?}", e);
    }

    // 5. Sweep expired sessions and ad tickets in the background
    let sweeper = {
        let state = state.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SWEEP_INTERVAL);
            loop {
                interval.tick().await;
                let now = now_secs();
                let sessions = state.sessions.lock().await.purge_expired(now);
                let tickets = state.ad_sessions.lock().await.purge_expired(now);
                if sessions + tickets > 0 {
                    tracing::debug!(sessions, tickets, "swept expired entries");
                }
            }
        })
    };

    // 6. Start IPC server
    let socket_path = data_dir.join("daemon.sock");
    let rpc_server = RpcServer::new(state.clone(), socket_path.clone());

    info!("Starting JSON-RPC server on {:?}", socket_path);

    // 7. Emit DaemonStarted event
    state.event_bus.emit(events::Event::new(
        "DaemonStarted",
        now_secs(),
        serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
        }),
    ));

    // 8. Run the RPC server until shutdown
    let mut shutdown_rx = state.shutdown_tx.subscribe();
    tokio::select! {
        result = rpc_server.run() => {
            if let Err(e) = result {
                error!("RPC server error: {}", e);
            }
        }
        _ = shutdown_rx.recv() => {
            info!("Shutdown signal received");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
        }
    }

    // Graceful shutdown
    info!("Daemon shutting down gracefully");
    sweeper.abort();

    // Clean up socket file
    let _ = std::fs::remove_file(&socket_path);

    info!("Daemon stopped");
    Ok(())
}

/// Fresh state over an in-memory database with media and outbox under a
/// temporary directory.
#[cfg(test)]
pub(crate) fn test_state() -> (Arc<DaemonState>, tempfile::TempDir) {
    test_state_with(|_| {})
}

#[cfg(test)]
pub(crate) fn test_state_with(
    tweak: impl FnOnce(&mut DaemonConfig),
) -> (Arc<DaemonState>, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = DaemonConfig::default();
    config.storage.data_dir = dir.path().to_string_lossy().into_owned();
    config.admin.password = "admin-pass".to_string();
    tweak(&mut config);
    let conn = moneytube_db::open_memory().expect("open db");
    (Arc::new(DaemonState::new(conn, config)), dir)
}
