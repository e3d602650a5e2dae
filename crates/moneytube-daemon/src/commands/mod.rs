//! IPC command handlers.
//!
//! Each submodule implements the commands for one IPC category.

pub mod ads;
pub mod admin;
pub mod auth;
pub mod comments;
pub mod diagnostics;
pub mod profile;
pub mod referral;
pub mod rewards;
pub mod videos;
pub mod withdraw;

use rand::RngCore;
use serde_json::Value;

use crate::rpc::RpcError;

/// Required string param.
pub(crate) fn str_param<'a>(params: &'a Value, name: &str) -> Result<&'a str, RpcError> {
    params
        .get(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params(&format!("{name} required")))
}

/// Optional string param. `null` counts as absent.
pub(crate) fn opt_str_param<'a>(params: &'a Value, name: &str) -> Option<&'a str> {
    params.get(name).and_then(|v| v.as_str())
}

/// Optional unsigned param; present but non-numeric is an error.
pub(crate) fn opt_u64_param(params: &Value, name: &str) -> Result<Option<u64>, RpcError> {
    match params.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v.as_u64().map(Some).ok_or_else(|| {
            RpcError::invalid_params(&format!("{name} must be a non-negative integer"))
        }),
    }
}

/// Random 128-bit identifier, hex encoded.
pub(crate) fn new_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
pub(crate) mod testutil {
    use std::sync::Arc;

    use serde_json::{json, Value};

    use crate::DaemonState;

    /// Sign up `email` and return `(session token, user id)`.
    pub async fn sign_up(state: &Arc<DaemonState>, email: &str) -> (String, String) {
        let reply = super::auth::sign_up(state, &json!({"email": email, "password": "secret1"}))
            .await
            .expect("sign_up");
        session_of(&reply)
    }

    /// Sign in as the bootstrapped admin.
    pub async fn admin(state: &Arc<DaemonState>) -> String {
        super::auth::bootstrap_admin(state).await.expect("bootstrap");
        let reply = super::auth::sign_in(
            state,
            &json!({"email": state.config.admin.email, "password": state.config.admin.password}),
        )
        .await
        .expect("admin sign_in");
        session_of(&reply).0
    }

    pub fn session_of(reply: &Value) -> (String, String) {
        (
            reply["session"].as_str().expect("session").to_string(),
            reply["user_id"].as_str().expect("user_id").to_string(),
        )
    }

    /// Insert a video directly, bypassing the upload path.
    pub async fn seed_video(state: &Arc<DaemonState>, owner: &str, views: u64) -> String {
        let id = super::new_id();
        let db = state.db.lock().await;
        moneytube_db::queries::videos::insert(
            &db,
            &moneytube_db::queries::videos::NewVideo {
                id: &id,
                user_id: owner,
                title: "seeded",
                description: None,
                video_url: "http://localhost/v.mp4",
                video_key: "seed/v.mp4",
                thumbnail_url: None,
                thumbnail_key: None,
                duration: 30,
                created_at: 1,
            },
        )
        .expect("insert video");
        db.execute(
            "UPDATE videos SET views = ?1 WHERE id = ?2",
            rusqlite::params![views as i64, id],
        )
        .expect("set views");
        id
    }

    pub async fn set_coins(state: &Arc<DaemonState>, user_id: &str, coins: i64) {
        let db = state.db.lock().await;
        db.execute(
            "UPDATE profiles SET coins = ?1 WHERE id = ?2",
            rusqlite::params![coins, user_id],
        )
        .expect("set coins");
    }
}
