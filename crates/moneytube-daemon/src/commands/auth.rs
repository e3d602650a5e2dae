//! Account and session command handlers.

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use moneytube_db::queries::{accounts, profiles};
use moneytube_db::DbError;
use moneytube_economy::referral;
use moneytube_types::now_secs;
use moneytube_types::referral::ReferralPhase;

use super::{new_id, opt_str_param, str_param};
use crate::events::Event;
use crate::password;
use crate::rpc::RpcError;
use crate::session;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

fn normalize_email(email: &str) -> std::result::Result<String, RpcError> {
    let email = email.trim().to_ascii_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    };
    if !valid {
        return Err(RpcError::validation("invalid email address"));
    }
    Ok(email)
}

/// Create an account and its zero-balance profile. Returns the new user id.
async fn create_account(
    state: &Arc<DaemonState>,
    email: &str,
    password: &str,
    username: Option<&str>,
) -> std::result::Result<String, RpcError> {
    let salt = password::generate_salt();
    let hash = password::hash(password, &salt)
        .map_err(|e| RpcError::external_service(&e.to_string()))?;

    let user_id = new_id();
    let now = now_secs();
    let mut db = state.db.lock().await;
    let tx = db
        .transaction()
        .map_err(|e| RpcError::internal_error(&format!("db error: {e}")))?;
    match accounts::insert(&tx, &user_id, email, &salt, &hash, now) {
        Ok(()) => {}
        Err(DbError::Constraint(m)) => return Err(RpcError::duplicate(&m)),
        Err(e) => return Err(e.into()),
    }
    profiles::insert(&tx, &user_id, email, username, now)?;
    tx.commit()
        .map_err(|e| RpcError::internal_error(&format!("db error: {e}")))?;
    Ok(user_id)
}

/// Register a new account and open a session.
///
/// An optional `referral_code` is redeemed with the sign-up split. A bad
/// code never blocks the sign-up; the reason is returned as
/// `referral_error`.
pub async fn sign_up(state: &Arc<DaemonState>, params: &Value) -> Result {
    let email = normalize_email(str_param(params, "email")?)?;
    let password = str_param(params, "password")?;
    let username = opt_str_param(params, "username")
        .map(str::trim)
        .filter(|u| !u.is_empty());

    if password.chars().count() < state.config.identity.min_password_len {
        return Err(RpcError::validation(&format!(
            "password must be at least {} characters",
            state.config.identity.min_password_len
        )));
    }
    if state.config.is_admin_email(&email) {
        return Err(RpcError::forbidden("this email address is reserved"));
    }

    let user_id = create_account(state, &email, password, username).await?;
    info!(user_id = %user_id, "account created");
    state.event_bus.emit(Event::new(
        "UserSignedUp",
        now_secs(),
        serde_json::json!({"user_id": user_id}),
    ));

    let mut referral_result = Value::Null;
    let mut referral_error = Value::Null;
    if let Some(code) = opt_str_param(params, "referral_code").filter(|c| !c.trim().is_empty()) {
        let outcome = {
            let mut db = state.db.lock().await;
            referral::redeem(
                &mut db,
                &state.config.economy,
                &user_id,
                code,
                ReferralPhase::Signup,
                now_secs(),
            )
        };
        match outcome {
            Ok(outcome) => {
                super::referral::emit_redeemed(state, &outcome);
                referral_result = serde_json::to_value(&outcome)
                    .map_err(|e| RpcError::internal_error(&e.to_string()))?;
            }
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "sign-up referral not applied");
                referral_error = Value::String(e.to_string());
            }
        }
    }

    let session = state
        .sessions
        .lock()
        .await
        .create(&user_id, &email, false, now_secs());

    Ok(serde_json::json!({
        "session": session.token,
        "user_id": user_id,
        "email": email,
        "is_admin": false,
        "referral": referral_result,
        "referral_error": referral_error,
    }))
}

/// Verify credentials and open a session.
pub async fn sign_in(state: &Arc<DaemonState>, params: &Value) -> Result {
    let email = str_param(params, "email")?.trim().to_ascii_lowercase();
    let password = str_param(params, "password")?;

    let account = {
        let db = state.db.lock().await;
        accounts::get_by_email(&db, &email)?
    };
    let Some(account) = account else {
        return Err(RpcError::wrong_credentials());
    };

    let ok = password::verify(password, &account.password_salt, &account.password_hash)
        .map_err(|e| RpcError::external_service(&e.to_string()))?;
    if !ok {
        warn!(user_id = %account.user_id, "failed sign-in");
        return Err(RpcError::wrong_credentials());
    }

    let is_admin = state.config.is_admin_email(&account.email);
    let session = state
        .sessions
        .lock()
        .await
        .create(&account.user_id, &account.email, is_admin, now_secs());
    info!(user_id = %account.user_id, is_admin, "signed in");

    Ok(serde_json::json!({
        "session": session.token,
        "user_id": account.user_id,
        "email": account.email,
        "is_admin": is_admin,
    }))
}

/// End the caller's session.
pub async fn sign_out(state: &Arc<DaemonState>, params: &Value) -> Result {
    let token = session::token_param(params).ok_or_else(RpcError::session_required)?;
    let removed = state.sessions.lock().await.remove(token);
    if !removed {
        return Err(RpcError::session_required());
    }
    Ok(serde_json::json!({"signed_out": true}))
}

/// Describe the caller's session.
pub async fn get_session(state: &Arc<DaemonState>, params: &Value) -> Result {
    let session = session::require(state, params).await?;
    Ok(serde_json::json!({
        "user_id": session.user_id,
        "email": session.email,
        "is_admin": session.is_admin,
    }))
}

/// Create the admin account from config if it does not exist yet.
///
/// Skipped with a warning when no admin password is configured.
pub async fn bootstrap_admin(state: &Arc<DaemonState>) -> std::result::Result<(), RpcError> {
    let admin = &state.config.admin;
    if admin.password.is_empty() {
        warn!("no admin password configured; admin account not bootstrapped");
        return Ok(());
    }
    let email = normalize_email(&admin.email)?;

    let exists = {
        let db = state.db.lock().await;
        accounts::get_by_email(&db, &email)?.is_some()
    };
    if exists {
        return Ok(());
    }

    let user_id = create_account(state, &email, &admin.password, Some("admin")).await?;
    info!(user_id = %user_id, "admin account created");
    Ok(())
}
