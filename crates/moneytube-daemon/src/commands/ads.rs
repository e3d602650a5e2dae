//! Ad countdown command handlers.
//!
//! `start_ad` issues a ticket, `complete_ad` redeems it once the countdown
//! has elapsed and `cancel_ad` drops it. Nothing is written to the database
//! until a completion is accepted.

use std::sync::Arc;

use serde_json::Value;

use moneytube_db::queries::videos;
use moneytube_economy::ads::AdTarget;
use moneytube_economy::{rewards, uploads};
use moneytube_types::now_secs;

use super::str_param;
use crate::events::Event;
use crate::rpc::RpcError;
use crate::session;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

fn emit_coins_earned(
    state: &Arc<DaemonState>,
    user_id: &str,
    coins: i64,
    balance: i64,
    source: &str,
) {
    state.event_bus.emit(Event::new(
        "CoinsEarned",
        now_secs(),
        serde_json::json!({
            "user_id": user_id,
            "coins": coins,
            "balance": balance,
            "source": source,
        }),
    ));
}

/// Start an ad countdown.
///
/// `target` is `{"kind": "video_unlock", "video_id": ...}`,
/// `{"kind": "bonus"}` or `{"kind": "upload"}`.
pub async fn start_ad(state: &Arc<DaemonState>, params: &Value) -> Result {
    let session = session::require(state, params).await?;
    let target: AdTarget = params
        .get("target")
        .cloned()
        .ok_or_else(|| RpcError::invalid_params("target required"))
        .and_then(|t| {
            serde_json::from_value(t)
                .map_err(|e| RpcError::invalid_params(&format!("invalid target: {e}")))
        })?;

    match &target {
        AdTarget::VideoUnlock { video_id } => {
            let db = state.db.lock().await;
            let video = videos::get(&db, video_id)?;
            if video.user_id == session.user_id {
                return Err(RpcError::forbidden("owners do not need to unlock their own videos"));
            }
        }
        // A full day stops the upload flow here, before any bytes are sent.
        AdTarget::Upload => {
            let db = state.db.lock().await;
            uploads::check_quota(&db, &state.config.economy, &session.user_id, now_secs())?;
        }
        AdTarget::Bonus => {}
    }

    let ticket = state.ad_sessions.lock().await.start(
        &mut rand::thread_rng(),
        &state.config.economy,
        &session.user_id,
        target,
        now_secs(),
    );
    serde_json::to_value(&ticket).map_err(|e| RpcError::internal_error(&e.to_string()))
}

/// Complete an ad whose countdown has elapsed and apply its effect.
pub async fn complete_ad(state: &Arc<DaemonState>, params: &Value) -> Result {
    let session = session::require(state, params).await?;
    let ticket = str_param(params, "ticket")?;
    let now = now_secs();

    let target = state
        .ad_sessions
        .lock()
        .await
        .complete(ticket, &session.user_id, now)?;

    match target {
        AdTarget::VideoUnlock { video_id } => {
            let outcome = {
                let mut db = state.db.lock().await;
                rewards::complete_video_ad(
                    &mut db,
                    &state.config.economy,
                    &session.user_id,
                    &video_id,
                    now,
                )?
            };
            if outcome.granted > 0 {
                emit_coins_earned(
                    state,
                    &session.user_id,
                    outcome.granted,
                    outcome.balance,
                    "video_ad",
                );
            }
            Ok(serde_json::json!({
                "kind": "video_unlock",
                "video_id": video_id,
                "granted": outcome.granted,
                "balance": outcome.balance,
                "access": outcome.access,
            }))
        }
        AdTarget::Bonus => {
            let balance = {
                let mut db = state.db.lock().await;
                rewards::claim_bonus_ad(&mut db, &state.config.economy, &session.user_id, now)?
            };
            let granted = state.config.economy.bonus_ad_reward;
            emit_coins_earned(state, &session.user_id, granted, balance, "bonus_ad");
            Ok(serde_json::json!({
                "kind": "bonus",
                "granted": granted,
                "balance": balance,
            }))
        }
        AdTarget::Upload => Ok(serde_json::json!({
            "kind": "upload",
            "upload_ticket": ticket,
        })),
    }
}

/// Abandon an ad. Writes nothing.
pub async fn cancel_ad(state: &Arc<DaemonState>, params: &Value) -> Result {
    let session = session::require(state, params).await?;
    let ticket = str_param(params, "ticket")?;
    let cancelled = state
        .ad_sessions
        .lock()
        .await
        .cancel(ticket, &session.user_id);
    Ok(serde_json::json!({"cancelled": cancelled}))
}
