//! Profile command handlers.

use std::sync::Arc;

use serde_json::Value;

use moneytube_db::queries::profiles;
use moneytube_economy::withdraw;
use moneytube_types::now_secs;

use super::opt_str_param;
use crate::rpc::RpcError;
use crate::session;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

const MAX_USERNAME_LEN: usize = 50;

/// Get the caller's profile, including the live coin balance.
pub async fn get_profile(state: &Arc<DaemonState>, params: &Value) -> Result {
    let session = session::require(state, params).await?;
    let db = state.db.lock().await;
    let profile = profiles::get(&db, &session.user_id)?;
    serde_json::to_value(&profile).map_err(|e| RpcError::internal_error(&e.to_string()))
}

/// Update the caller's username and/or avatar URL.
pub async fn update_profile(state: &Arc<DaemonState>, params: &Value) -> Result {
    let session = session::require(state, params).await?;
    let username = opt_str_param(params, "username").map(str::trim);
    let avatar_url = opt_str_param(params, "avatar_url").map(str::trim);

    if let Some(name) = username {
        if name.is_empty() || name.chars().count() > MAX_USERNAME_LEN {
            return Err(RpcError::validation(&format!(
                "username must be 1 to {MAX_USERNAME_LEN} characters"
            )));
        }
    }
    if let Some(url) = avatar_url {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(RpcError::validation("avatar_url must be an http(s) URL"));
        }
    }

    let db = state.db.lock().await;
    let profile = profiles::update(&db, &session.user_id, username, avatar_url, now_secs())?;
    serde_json::to_value(&profile).map_err(|e| RpcError::internal_error(&e.to_string()))
}

/// Earnings dashboard: balance, views and progress towards withdrawal.
pub async fn get_creator_stats(state: &Arc<DaemonState>, params: &Value) -> Result {
    let session = session::require(state, params).await?;
    let db = state.db.lock().await;
    let stats = withdraw::creator_stats(&db, &state.config.economy, &session.user_id)?;
    serde_json::to_value(&stats).map_err(|e| RpcError::internal_error(&e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testutil;
    use crate::test_state;
    use serde_json::json;

    #[tokio::test]
    async fn test_new_profile_has_zero_coins() {
        let (state, _dir) = test_state();
        let (token, user_id) = testutil::sign_up(&state, "p@example.com").await;
        let profile = get_profile(&state, &json!({"session": token})).await.expect("profile");
        assert_eq!(profile["id"], user_id.as_str());
        assert_eq!(profile["coins"], 0);
        assert_eq!(profile["email"], "p@example.com");
    }

    #[tokio::test]
    async fn test_update_profile() {
        let (state, _dir) = test_state();
        let (token, _) = testutil::sign_up(&state, "q@example.com").await;

        let updated = update_profile(&state, &json!({"session": token, "username": " quinn "}))
            .await
            .expect("update");
        assert_eq!(updated["username"], "quinn");

        let updated = update_profile(
            &state,
            &json!({"session": token, "avatar_url": "https://cdn.example.com/a.png"}),
        )
        .await
        .expect("update");
        // Username untouched by an avatar-only update.
        assert_eq!(updated["username"], "quinn");
        assert_eq!(updated["avatar_url"], "https://cdn.example.com/a.png");

        let blank = update_profile(&state, &json!({"session": token, "username": "  "})).await;
        assert_eq!(blank.expect_err("blank").code, -32020);
        let params = json!({"session": token, "avatar_url": "ftp://x"});
        let bad_url = update_profile(&state, &params).await;
        assert_eq!(bad_url.expect_err("url").code, -32020);
    }

    #[tokio::test]
    async fn test_creator_stats() {
        let (state, _dir) = test_state();
        let (token, user_id) = testutil::sign_up(&state, "c@example.com").await;
        testutil::seed_video(&state, &user_id, 600).await;
        testutil::seed_video(&state, &user_id, 400).await;
        testutil::set_coins(&state, &user_id, 25).await;

        let stats = get_creator_stats(&state, &json!({"session": token})).await.expect("stats");
        assert_eq!(stats["total_views"], 1000);
        assert_eq!(stats["video_count"], 2);
        assert_eq!(stats["coins_progress_pct"], 50);
        assert_eq!(stats["can_withdraw"], false);
    }
}
