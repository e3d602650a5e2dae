//! Video catalog, playback and upload command handlers.

use std::path::PathBuf;
use std::sync::Arc;

use base64::Engine;
use serde_json::Value;
use tracing::{info, warn};

use moneytube_db::queries::videos::{self, NewVideo};
use moneytube_economy::{uploads, views};
use moneytube_types::now_secs;

use super::{new_id, opt_str_param, opt_u64_param, str_param};
use crate::events::Event;
use crate::rpc::RpcError;
use crate::session;
use crate::storage::{extension_for, THUMBNAILS_BUCKET, VIDEOS_BUCKET};
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

const DEFAULT_PAGE: u64 = 20;
const MAX_PAGE: u64 = 100;

fn decode_base64(data: &str, what: &str) -> std::result::Result<Vec<u8>, RpcError> {
    base64::engine::general_purpose::STANDARD
        .decode(data)
        .map_err(|e| RpcError::invalid_params(&format!("{what} is not valid base64: {e}")))
}

/// Public feed, newest first, with each owner's display name.
pub async fn list_videos(state: &Arc<DaemonState>, params: &Value) -> Result {
    let limit = opt_u64_param(params, "limit")?
        .unwrap_or(DEFAULT_PAGE)
        .clamp(1, MAX_PAGE) as u32;
    let offset = opt_u64_param(params, "offset")?.unwrap_or(0).min(u32::MAX as u64) as u32;

    let db = state.db.lock().await;
    let feed = videos::list_feed(&db, limit, offset)?;
    serde_json::to_value(&feed).map_err(|e| RpcError::internal_error(&e.to_string()))
}

/// Video metadata. Does not count a view.
pub async fn get_video(state: &Arc<DaemonState>, params: &Value) -> Result {
    let video_id = str_param(params, "video_id")?;
    let db = state.db.lock().await;
    let video = videos::get(&db, video_id)?;
    serde_json::to_value(&video).map_err(|e| RpcError::internal_error(&e.to_string()))
}

/// The caller's uploads, newest first.
pub async fn my_videos(state: &Arc<DaemonState>, params: &Value) -> Result {
    let session = session::require(state, params).await?;
    let db = state.db.lock().await;
    let mine = videos::list_by_owner(&db, &session.user_id)?;
    serde_json::to_value(&mine).map_err(|e| RpcError::internal_error(&e.to_string()))
}

/// Open a video for playback.
///
/// Returns `ad_required` until the caller has completed the unlock ad for
/// this video. Owners always play.
pub async fn open_video(state: &Arc<DaemonState>, params: &Value) -> Result {
    let session = session::require(state, params).await?;
    let video_id = str_param(params, "video_id")?;

    let db = state.db.lock().await;
    let access = views::open_video(
        &db,
        &state.config.economy,
        Some(&session.user_id),
        video_id,
        now_secs(),
    )?;
    serde_json::to_value(&access).map_err(|e| RpcError::internal_error(&e.to_string()))
}

/// Where the video bytes of an upload come from.
enum VideoSource {
    /// Base64 `data` carried in the request.
    Inline(Vec<u8>),
    /// A local file named by `source_path`, copied by the daemon.
    File { path: PathBuf, len: u64 },
}

impl VideoSource {
    fn len(&self) -> u64 {
        match self {
            VideoSource::Inline(bytes) => bytes.len() as u64,
            VideoSource::File { len, .. } => *len,
        }
    }
}

async fn video_source(params: &Value) -> std::result::Result<VideoSource, RpcError> {
    match (
        opt_str_param(params, "data"),
        opt_str_param(params, "source_path"),
    ) {
        (Some(data), None) => Ok(VideoSource::Inline(decode_base64(data, "data")?)),
        (None, Some(path)) => {
            let path = PathBuf::from(path);
            if !path.is_absolute() {
                return Err(RpcError::invalid_params("source_path must be absolute"));
            }
            let meta = tokio::fs::metadata(&path)
                .await
                .map_err(|e| RpcError::invalid_params(&format!("source_path: {e}")))?;
            if !meta.is_file() {
                return Err(RpcError::invalid_params("source_path is not a file"));
            }
            Ok(VideoSource::File {
                path,
                len: meta.len(),
            })
        }
        (Some(_), Some(_)) => Err(RpcError::invalid_params(
            "pass either data or source_path, not both",
        )),
        (None, None) => Err(RpcError::invalid_params("data or source_path required")),
    }
}

/// Upload a video.
///
/// Params: `upload_ticket` (a completed upload ad), `title`, optional
/// `description`, `content_type`, optional `duration`, and an optional
/// `thumbnail` object with `content_type` and base64 `data`. The video itself
/// is either base64 `data` (bounded by the request line cap) or an absolute
/// `source_path` on the daemon's host, checked against `max_upload_bytes`
/// before it is copied.
///
/// The quota is checked before any payload is decoded or copied and
/// enforced again atomically when the row is recorded. Stored objects are
/// removed if the record fails.
pub async fn upload_video(state: &Arc<DaemonState>, params: &Value) -> Result {
    let session = session::require(state, params).await?;
    let ticket = str_param(params, "upload_ticket")?;
    let title = str_param(params, "title")?.trim();
    let description = opt_str_param(params, "description")
        .map(str::trim)
        .filter(|d| !d.is_empty());
    let content_type = str_param(params, "content_type")?;
    let duration = opt_u64_param(params, "duration")?.unwrap_or(0).min(u32::MAX as u64) as u32;

    let rules = &state.config.economy;
    {
        let db = state.db.lock().await;
        uploads::check_quota(&db, rules, &session.user_id, now_secs())?;
    }

    let source = video_source(params).await?;
    let thumbnail = match params.get("thumbnail") {
        None | Some(Value::Null) => None,
        Some(t) => {
            let ty = str_param(t, "content_type")?;
            let data = decode_base64(str_param(t, "data")?, "thumbnail data")?;
            Some((ty, data))
        }
    };

    uploads::validate(
        &uploads::UploadCheck {
            title,
            content_type,
            size_bytes: source.len(),
            thumbnail_type: thumbnail.as_ref().map(|(ty, _)| *ty),
        },
        state.config.storage.max_upload_bytes,
    )?;

    state
        .ad_sessions
        .lock()
        .await
        .take_upload_pass(ticket, &session.user_id)?;

    let video_id = new_id();
    let video_key = format!("{video_id}.{}", extension_for(content_type));
    let video_url = match &source {
        VideoSource::Inline(bytes) => state.store.upload(VIDEOS_BUCKET, &video_key, bytes).await,
        VideoSource::File { path, .. } => {
            state.store.upload_file(VIDEOS_BUCKET, &video_key, path).await
        }
    };
    let video_url = match video_url {
        Ok(url) => url,
        Err(e) => {
            cleanup(state, &video_key, None).await;
            return Err(e.into());
        }
    };

    let mut thumb_key = None;
    let mut thumb_url = None;
    if let Some((ty, data)) = &thumbnail {
        let key = format!("{video_id}.{}", extension_for(ty));
        match state.store.upload(THUMBNAILS_BUCKET, &key, data).await {
            Ok(url) => {
                thumb_url = Some(url);
                thumb_key = Some(key);
            }
            Err(e) => {
                cleanup(state, &video_key, None).await;
                return Err(e.into());
            }
        }
    }

    let recorded = {
        let mut db = state.db.lock().await;
        uploads::record_upload(
            &mut db,
            rules,
            &NewVideo {
                id: &video_id,
                user_id: &session.user_id,
                title,
                description,
                video_url: &video_url,
                video_key: &video_key,
                thumbnail_url: thumb_url.as_deref(),
                thumbnail_key: thumb_key.as_deref(),
                duration,
                created_at: now_secs(),
            },
        )
    };
    let video = match recorded {
        Ok(video) => video,
        Err(e) => {
            cleanup(state, &video_key, thumb_key.as_deref()).await;
            return Err(e.into());
        }
    };

    info!(
        user_id = %session.user_id,
        video_id = %video.id,
        bytes = source.len(),
        "video uploaded"
    );
    state.event_bus.emit(Event::new(
        "VideoUploaded",
        now_secs(),
        serde_json::json!({"user_id": session.user_id, "video_id": video.id}),
    ));

    serde_json::to_value(&video).map_err(|e| RpcError::internal_error(&e.to_string()))
}

async fn cleanup(state: &Arc<DaemonState>, video_key: &str, thumbnail_key: Option<&str>) {
    if let Err(e) = state.store.remove(VIDEOS_BUCKET, &[video_key]).await {
        warn!(key = video_key, error = %e, "orphaned video object");
    }
    if let Some(key) = thumbnail_key {
        if let Err(e) = state.store.remove(THUMBNAILS_BUCKET, &[key]).await {
            warn!(key, error = %e, "orphaned thumbnail object");
        }
    }
}

/// Delete one of the caller's videos and its stored objects.
pub async fn delete_video(state: &Arc<DaemonState>, params: &Value) -> Result {
    let session = session::require(state, params).await?;
    let video_id = str_param(params, "video_id")?;

    let keys = {
        let mut db = state.db.lock().await;
        uploads::delete_video(&mut db, &session.user_id, video_id)?
    };
    cleanup(state, &keys.video_key, keys.thumbnail_key.as_deref()).await;

    info!(user_id = %session.user_id, video_id, "video deleted");
    state.event_bus.emit(Event::new(
        "VideoDeleted",
        now_secs(),
        serde_json::json!({"user_id": session.user_id, "video_id": video_id}),
    ));
    Ok(serde_json::json!({"deleted": true}))
}
