//! Diagnostics command handlers.

use std::sync::Arc;

use serde_json::Value;

use crate::rpc::RpcError;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

/// Daemon version, live counters and the active economy rules.
pub async fn get_daemon_info(state: &Arc<DaemonState>) -> Result {
    let sessions = state.sessions.lock().await.len();
    let ad_sessions = state.ad_sessions.lock().await.len();

    Ok(serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "schema_version": moneytube_db::SCHEMA_VERSION,
        "event_sequence": state.event_bus.sequence(),
        "active_sessions": sessions,
        "active_ads": ad_sessions,
        "media_root": state.store.root().display().to_string(),
        "notifications_enabled": state.config.notifications.enabled,
        "economy": state.config.economy,
    }))
}
