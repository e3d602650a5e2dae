//! Milestone and reward-history command handlers.

use std::sync::Arc;

use serde_json::Value;

use moneytube_economy::{milestones, rewards};
use moneytube_types::now_secs;

use super::{opt_u64_param, str_param};
use crate::events::Event;
use crate::rpc::RpcError;
use crate::session;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

const DEFAULT_HISTORY: u64 = 50;
const MAX_HISTORY: u64 = 500;

/// Claim view milestones on one of the caller's videos.
///
/// Without `threshold` every reached, unclaimed milestone is paid.
pub async fn claim_milestones(state: &Arc<DaemonState>, params: &Value) -> Result {
    let session = session::require(state, params).await?;
    let video_id = str_param(params, "video_id")?;
    let threshold = opt_u64_param(params, "threshold")?;

    let claim = {
        let mut db = state.db.lock().await;
        milestones::claim(
            &mut db,
            &state.config.economy,
            &session.user_id,
            video_id,
            threshold,
            now_secs(),
        )?
    };

    if !claim.claimed.is_empty() {
        state.event_bus.emit(Event::new(
            "MilestoneClaimed",
            now_secs(),
            serde_json::json!({
                "user_id": session.user_id,
                "video_id": claim.video_id,
                "thresholds": claim.claimed.iter().map(|m| m.views).collect::<Vec<_>>(),
                "coins": claim.coins,
                "balance": claim.balance,
            }),
        ));
    }

    serde_json::to_value(&claim).map_err(|e| RpcError::internal_error(&e.to_string()))
}

/// The caller's reward log, newest first.
pub async fn get_reward_history(state: &Arc<DaemonState>, params: &Value) -> Result {
    let session = session::require(state, params).await?;
    let limit = opt_u64_param(params, "limit")?
        .unwrap_or(DEFAULT_HISTORY)
        .clamp(1, MAX_HISTORY) as u32;

    let db = state.db.lock().await;
    let records = rewards::history(&db, &session.user_id, limit)?;
    serde_json::to_value(&records).map_err(|e| RpcError::internal_error(&e.to_string()))
}
