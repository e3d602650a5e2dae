//! Playback gating and view counting.
//!
//! A non-owner needs an ad-watch record before a video plays. Whether an
//! unlocked repeat visit adds a view follows
//! [`ViewCountPolicy`](moneytube_types::rules::ViewCountPolicy). Owners never
//! count views on their own videos.

use rusqlite::Connection;

use moneytube_db::queries::{ad_watches, videos};
use moneytube_types::rules::{EconomyRules, ViewCountPolicy};
use moneytube_types::video::PlaybackAccess;

use crate::Result;

/// Open `video_id` for playback by `viewer` (`None` for a signed-out
/// visitor, who always sees the ad gate).
///
/// # Errors
///
/// - [`crate::EconomyError::NotFound`] if the video does not exist
pub fn open_video(
    conn: &Connection,
    rules: &EconomyRules,
    viewer: Option<&str>,
    video_id: &str,
    now: u64,
) -> Result<PlaybackAccess> {
    let video = videos::get(conn, video_id)?;

    let Some(viewer) = viewer else {
        return Ok(PlaybackAccess::AdRequired);
    };

    if video.user_id == viewer {
        return Ok(PlaybackAccess::Unlocked { views: video.views });
    }

    if !ad_watches::exists(conn, viewer, video_id)? {
        return Ok(PlaybackAccess::AdRequired);
    }

    let views = match rules.view_count_policy {
        ViewCountPolicy::FirstUnlock => video.views,
        ViewCountPolicy::EveryVisit => videos::increment_views(conn, video_id, now)?,
    };
    Ok(PlaybackAccess::Unlocked { views })
}
