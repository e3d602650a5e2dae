//! Referral command handlers.

use std::sync::Arc;

use serde_json::Value;

use moneytube_db::queries::referrals;
use moneytube_economy::referral;
use moneytube_types::now_secs;
use moneytube_types::referral::{ReferralOutcome, ReferralPhase};

use super::str_param;
use crate::events::Event;
use crate::rpc::RpcError;
use crate::session;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

pub(crate) fn emit_redeemed(state: &Arc<DaemonState>, outcome: &ReferralOutcome) {
    let now = now_secs();
    for (user_id, coins) in [
        (&outcome.referred_id, outcome.referred_coins),
        (&outcome.referrer_id, outcome.referrer_coins),
    ] {
        if coins == 0 {
            continue;
        }
        state.event_bus.emit(Event::new(
            "ReferralRedeemed",
            now,
            serde_json::json!({
                "user_id": user_id,
                "referrer_id": outcome.referrer_id,
                "referred_id": outcome.referred_id,
                "coins": coins,
            }),
        ));
    }
}

/// Get (creating on first use) the caller's referral code, with the number
/// of users who redeemed it.
pub async fn get_referral_code(state: &Arc<DaemonState>, params: &Value) -> Result {
    let session = session::require(state, params).await?;
    let db = state.db.lock().await;
    let code = referral::get_or_create_code(
        &db,
        &mut rand::thread_rng(),
        &state.config.economy,
        &session.user_id,
        now_secs(),
    )?;
    let referred = referrals::count_referred(&db, &session.user_id)?;
    let redeemed = referrals::usage_of(&db, &session.user_id)?.is_some();

    Ok(serde_json::json!({
        "code": code,
        "referred_count": referred,
        "has_redeemed": redeemed,
    }))
}

/// Redeem someone else's code from the referral page.
pub async fn redeem_referral(state: &Arc<DaemonState>, params: &Value) -> Result {
    let session = session::require(state, params).await?;
    let code = str_param(params, "code")?;

    let outcome = {
        let mut db = state.db.lock().await;
        referral::redeem(
            &mut db,
            &state.config.economy,
            &session.user_id,
            code,
            ReferralPhase::Later,
            now_secs(),
        )?
    };
    emit_redeemed(state, &outcome);

    serde_json::to_value(&outcome).map_err(|e| RpcError::internal_error(&e.to_string()))
}
