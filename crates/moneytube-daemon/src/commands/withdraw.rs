//! Withdrawal command handlers.

use std::sync::Arc;

use serde_json::Value;

use moneytube_economy::withdraw;
use moneytube_types::now_secs;
use moneytube_types::withdraw::WithdrawMethod;

use super::str_param;
use crate::events::Event;
use crate::notify::WithdrawalNotice;
use crate::rpc::RpcError;
use crate::session;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

/// Whether the caller currently meets the withdrawal thresholds.
pub async fn get_withdraw_eligibility(state: &Arc<DaemonState>, params: &Value) -> Result {
    let session = session::require(state, params).await?;
    let db = state.db.lock().await;
    let eligibility = withdraw::evaluate(&db, &state.config.economy, &session.user_id)?;
    serde_json::to_value(&eligibility).map_err(|e| RpcError::internal_error(&e.to_string()))
}

/// Submit a withdrawal request. The balance is not debited until an admin
/// confirms it.
///
/// Params: `method` (`paytm` or `bank`), `number`, `coins`.
pub async fn request_withdrawal(state: &Arc<DaemonState>, params: &Value) -> Result {
    let session = session::require(state, params).await?;
    let method: WithdrawMethod = str_param(params, "method")?
        .parse()
        .map_err(|e: moneytube_types::ParseEnumError| RpcError::invalid_params(&e.to_string()))?;
    let number = str_param(params, "number")?;
    let coins = params
        .get("coins")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| RpcError::invalid_params("coins required"))?;

    let request = {
        let mut db = state.db.lock().await;
        withdraw::submit(
            &mut db,
            &state.config.economy,
            &session.user_id,
            method,
            number,
            coins,
            now_secs(),
        )?
    };

    state.event_bus.emit(Event::new(
        "WithdrawalRequested",
        now_secs(),
        serde_json::json!({
            "user_id": request.user_id,
            "request_id": request.id,
            "coins": request.coins,
        }),
    ));
    state
        .notifier
        .spawn_send(WithdrawalNotice::from_request(&request, &session.email));

    Ok(serde_json::json!({
        "request": request,
        "payout": request.payout().to_string(),
    }))
}

/// The caller's requests, newest first.
pub async fn my_withdrawals(state: &Arc<DaemonState>, params: &Value) -> Result {
    let session = session::require(state, params).await?;
    let db = state.db.lock().await;
    let requests = withdraw::list_mine(&db, &session.user_id)?;
    serde_json::to_value(&requests).map_err(|e| RpcError::internal_error(&e.to_string()))
}
