//! Comment command handlers.

use std::sync::Arc;

use rusqlite::TransactionBehavior;
use serde_json::Value;

use moneytube_db::queries::{comments, videos};
use moneytube_db::DbError;
use moneytube_types::now_secs;

use super::str_param;
use crate::events::Event;
use crate::rpc::RpcError;
use crate::session;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

const MAX_COMMENT_LEN: usize = 1000;

fn comment_id_param(params: &Value) -> std::result::Result<i64, RpcError> {
    params
        .get("comment_id")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| RpcError::invalid_params("comment_id required"))
}

/// Comments on a video, newest first. With a session, each comment says
/// whether the caller liked it.
pub async fn list_comments(state: &Arc<DaemonState>, params: &Value) -> Result {
    let viewer = session::optional(state, params).await?;
    let video_id = str_param(params, "video_id")?;

    let db = state.db.lock().await;
    let list = comments::list_by_video(&db, video_id, viewer.as_ref().map(|s| s.user_id.as_str()))?;
    serde_json::to_value(&list).map_err(|e| RpcError::internal_error(&e.to_string()))
}

/// Post a comment.
pub async fn add_comment(state: &Arc<DaemonState>, params: &Value) -> Result {
    let session = session::require(state, params).await?;
    let video_id = str_param(params, "video_id")?;
    let content = str_param(params, "content")?.trim();
    if content.is_empty() || content.chars().count() > MAX_COMMENT_LEN {
        return Err(RpcError::validation(&format!(
            "comment must be 1 to {MAX_COMMENT_LEN} characters"
        )));
    }

    let now = now_secs();
    let id = {
        let db = state.db.lock().await;
        videos::get(&db, video_id)?;
        comments::insert(&db, video_id, &session.user_id, content, now)?
    };

    state.event_bus.emit(Event::new(
        "VideoCommented",
        now,
        serde_json::json!({"user_id": session.user_id, "video_id": video_id, "comment_id": id}),
    ));
    Ok(serde_json::json!({"id": id}))
}

/// Like a comment, or remove the caller's like if present.
///
/// The like row and `likes_count` change in one transaction.
pub async fn toggle_comment_like(state: &Arc<DaemonState>, params: &Value) -> Result {
    let session = session::require(state, params).await?;
    let comment_id = comment_id_param(params)?;
    let now = now_secs();

    let mut db = state.db.lock().await;
    let tx = db
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(DbError::from)?;
    comments::author_of(&tx, comment_id)?;
    let liked = if comments::insert_like(&tx, comment_id, &session.user_id, now)? {
        true
    } else {
        comments::delete_like(&tx, comment_id, &session.user_id)?;
        false
    };
    let likes_count = comments::set_likes_count(&tx, comment_id, now)?;
    tx.commit().map_err(DbError::from)?;

    Ok(serde_json::json!({"liked": liked, "likes_count": likes_count}))
}

/// Delete one of the caller's comments.
pub async fn delete_comment(state: &Arc<DaemonState>, params: &Value) -> Result {
    let session = session::require(state, params).await?;
    let comment_id = comment_id_param(params)?;

    let db = state.db.lock().await;
    if comments::author_of(&db, comment_id)? != session.user_id {
        return Err(RpcError::forbidden("only the author can delete a comment"));
    }
    comments::delete(&db, comment_id)?;
    Ok(serde_json::json!({"deleted": true}))
}
