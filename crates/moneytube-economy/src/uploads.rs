//! Upload validation, the daily upload quota and video deletion.
//!
//! The quota is keyed by `(user_id, epoch_day)`, so it resets at UTC
//! midnight with no cleanup job. [`check_quota`] runs before any bytes are
//! stored; [`record_upload`] re-checks and increments in the same statement
//! so a race cannot exceed the limit.

use rusqlite::Connection;

use moneytube_db::queries::{uploads, videos};
use moneytube_types::rules::EconomyRules;
use moneytube_types::video::Video;
use moneytube_types::epoch_day;

use crate::{immediate, EconomyError, Result};

/// Client-supplied description of an upload, checked before storage.
#[derive(Debug, Clone, Copy)]
pub struct UploadCheck<'a> {
    pub title: &'a str,
    pub content_type: &'a str,
    pub size_bytes: u64,
    /// Content type of the optional thumbnail.
    pub thumbnail_type: Option<&'a str>,
}

/// Validate upload metadata against `max_bytes`.
///
/// # Errors
///
/// - [`EconomyError::Validation`] for an empty title, a non-video file, an
///   empty or oversized file, or a non-image thumbnail
pub fn validate(check: &UploadCheck<'_>, max_bytes: u64) -> Result<()> {
    if check.title.trim().is_empty() {
        return Err(EconomyError::Validation("title is required".to_string()));
    }
    if !check.content_type.starts_with("video/") {
        return Err(EconomyError::Validation(format!(
            "expected a video file, got {}",
            check.content_type
        )));
    }
    if check.size_bytes == 0 {
        return Err(EconomyError::Validation("video file is empty".to_string()));
    }
    if check.size_bytes > max_bytes {
        return Err(EconomyError::Validation(format!(
            "video is {} bytes, limit is {max_bytes}",
            check.size_bytes
        )));
    }
    if let Some(t) = check.thumbnail_type {
        if !t.starts_with("image/") {
            return Err(EconomyError::Validation(format!(
                "expected an image thumbnail, got {t}"
            )));
        }
    }
    Ok(())
}

/// Uploads left today for `user_id`.
///
/// # Errors
///
/// - [`EconomyError::QuotaExceeded`] if none are left
pub fn check_quota(
    conn: &Connection,
    rules: &EconomyRules,
    user_id: &str,
    now: u64,
) -> Result<u32> {
    let used = uploads::count(conn, user_id, epoch_day(now))?;
    if used >= rules.upload_quota_per_day {
        return Err(EconomyError::QuotaExceeded(format!(
            "daily upload limit of {} reached",
            rules.upload_quota_per_day
        )));
    }
    Ok(rules.upload_quota_per_day - used)
}

/// Take one quota slot and insert the video row in one transaction.
///
/// # Errors
///
/// - [`EconomyError::QuotaExceeded`] if the quota filled up since
///   [`check_quota`]; nothing is written
pub fn record_upload(
    conn: &mut Connection,
    rules: &EconomyRules,
    video: &videos::NewVideo<'_>,
) -> Result<Video> {
    let tx = immediate(conn)?;

    let day = epoch_day(video.created_at);
    let count = uploads::increment_guarded(&tx, video.user_id, day, rules.upload_quota_per_day)?
        .ok_or_else(|| {
            EconomyError::QuotaExceeded(format!(
                "daily upload limit of {} reached",
                rules.upload_quota_per_day
            ))
        })?;
    videos::insert(&tx, video)?;
    let stored = videos::get(&tx, video.id)?;

    tx.commit()?;

    tracing::info!(
        user_id = video.user_id,
        video_id = video.id,
        uploads_today = count,
        "video uploaded"
    );
    Ok(stored)
}

/// Delete `video_id` on behalf of its owner and return its storage keys so
/// the caller can remove the objects.
///
/// # Errors
///
/// - [`EconomyError::NotFound`] if the video does not exist
/// - [`EconomyError::Authorization`] if `owner` does not own it
pub fn delete_video(
    conn: &mut Connection,
    owner: &str,
    video_id: &str,
) -> Result<videos::StoredKeys> {
    let tx = immediate(conn)?;
    let video = videos::get(&tx, video_id)?;
    if video.user_id != owner {
        return Err(EconomyError::Authorization(
            "only the owner can delete a video".to_string(),
        ));
    }
    let keys = videos::delete(&tx, video_id)?;
    tx.commit()?;

    tracing::info!(user_id = owner, video_id, "video deleted");
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{seed_user, seed_video, test_db};
    use moneytube_types::DAY_SECS;

    const NOW: u64 = 20_000 * DAY_SECS + 100;

    fn new_video(id: &str) -> videos::NewVideo<'_> {
        videos::NewVideo {
            id,
            user_id: "u1",
            title: "Clip",
            description: Some("desc"),
            video_url: "http://media/videos/x.mp4",
            video_key: "x.mp4",
            thumbnail_url: None,
            thumbnail_key: None,
            duration: 12,
            created_at: NOW,
        }
    }

    fn check<'a>(title: &'a str, content_type: &'a str, size_bytes: u64) -> UploadCheck<'a> {
        UploadCheck {
            title,
            content_type,
            size_bytes,
            thumbnail_type: None,
        }
    }

    #[test]
    fn test_validate() {
        validate(&check("Clip", "video/mp4", 10), 100).expect("valid");
        assert!(validate(&check("  ", "video/mp4", 10), 100).is_err());
        assert!(validate(&check("Clip", "image/png", 10), 100).is_err());
        assert!(validate(&check("Clip", "video/mp4", 0), 100).is_err());
        assert!(validate(&check("Clip", "video/mp4", 101), 100).is_err());

        let mut c = check("Clip", "video/mp4", 10);
        c.thumbnail_type = Some("text/plain");
        assert!(matches!(validate(&c, 100), Err(EconomyError::Validation(_))));
        c.thumbnail_type = Some("image/jpeg");
        validate(&c, 100).expect("valid thumbnail");
    }

    #[test]
    fn test_quota_enforced() {
        let mut conn = test_db();
        seed_user(&conn, "u1");
        let rules = EconomyRules::default();

        let ids: Vec<String> = (0..11).map(|i| format!("v{i}")).collect();
        for id in &ids[..10] {
            check_quota(&conn, &rules, "u1", NOW).expect("quota");
            record_upload(&mut conn, &rules, &new_video(id)).expect("upload");
        }

        assert!(matches!(
            check_quota(&conn, &rules, "u1", NOW),
            Err(EconomyError::QuotaExceeded(_))
        ));
        assert!(matches!(
            record_upload(&mut conn, &rules, &new_video(&ids[10])),
            Err(EconomyError::QuotaExceeded(_))
        ));
        assert_eq!(uploads::count(&conn, "u1", epoch_day(NOW)).expect("count"), 10);
        assert!(matches!(
            videos::get(&conn, &ids[10]),
            Err(moneytube_db::DbError::NotFound(_))
        ));

        // Next day the quota is fresh.
        assert_eq!(check_quota(&conn, &rules, "u1", NOW + DAY_SECS).expect("quota"), 10);
    }

    #[test]
    fn test_delete_owner_only() {
        let mut conn = test_db();
        seed_user(&conn, "u1");
        seed_user(&conn, "u2");
        seed_video(&conn, "v1", "u1");

        assert!(matches!(
            delete_video(&mut conn, "u2", "v1"),
            Err(EconomyError::Authorization(_))
        ));
        let keys = delete_video(&mut conn, "u1", "v1").expect("delete");
        assert_eq!(keys.video_key, "k.mp4");
        assert!(matches!(
            delete_video(&mut conn, "u1", "v1"),
            Err(EconomyError::NotFound(_))
        ));
    }
}
