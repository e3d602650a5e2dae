//! Admin command handlers. Every call requires an admin session.

use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use moneytube_economy::admin;
use moneytube_types::now_secs;

use crate::events::Event;
use crate::rpc::RpcError;
use crate::session;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

/// All withdrawal requests, split into pending and confirmed.
pub async fn list_withdrawals(state: &Arc<DaemonState>, params: &Value) -> Result {
    session::require_admin(state, params).await?;
    let db = state.db.lock().await;
    let queue = admin::list_requests(&db)?;
    serde_json::to_value(&queue).map_err(|e| RpcError::internal_error(&e.to_string()))
}

/// Confirm a pending request and debit the requester.
pub async fn confirm_withdrawal(state: &Arc<DaemonState>, params: &Value) -> Result {
    let admin_session = session::require_admin(state, params).await?;
    let request_id = params
        .get("request_id")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| RpcError::invalid_params("request_id required"))?;

    let confirmation = {
        let mut db = state.db.lock().await;
        admin::confirm(&mut db, &state.config.economy, request_id, now_secs())?
    };

    info!(
        admin_id = %admin_session.user_id,
        request_id,
        user_id = %confirmation.request.user_id,
        "withdrawal confirmed by admin"
    );
    state.event_bus.emit(Event::new(
        "WithdrawalConfirmed",
        now_secs(),
        serde_json::json!({
            "user_id": confirmation.request.user_id,
            "request_id": request_id,
            "coins": confirmation.request.coins,
            "balance": confirmation.balance,
        }),
    ));

    serde_json::to_value(&confirmation).map_err(|e| RpcError::internal_error(&e.to_string()))
}
