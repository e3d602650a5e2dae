//! Video catalog, view counter and milestone claims.

use std::collections::BTreeMap;

use rusqlite::{Connection, OptionalExtension};

use moneytube_types::video::{FeedVideo, Video};

use crate::{DbError, Result};

/// Columns for a new video row.
#[derive(Debug, Clone)]
pub struct NewVideo<'a> {
    pub id: &'a str,
    pub user_id: &'a str,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub video_url: &'a str,
    pub video_key: &'a str,
    pub thumbnail_url: Option<&'a str>,
    pub thumbnail_key: Option<&'a str>,
    pub duration: u32,
    pub created_at: u64,
}

/// Object-store keys of a deleted video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredKeys {
    pub video_key: String,
    pub thumbnail_key: Option<String>,
}

const VIDEO_COLUMNS: &str = "v.id, v.user_id, v.title, v.description, v.video_url, \
     v.thumbnail_url, v.views, v.duration, v.created_at, v.updated_at";

fn map_video(row: &rusqlite::Row<'_>) -> rusqlite::Result<Video> {
    Ok(Video {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        video_url: row.get(4)?,
        thumbnail_url: row.get(5)?,
        views: row.get::<_, i64>(6)? as u64,
        duration: row.get::<_, i64>(7)? as u32,
        milestone_rewards_claimed: BTreeMap::new(),
        created_at: row.get::<_, i64>(8)? as u64,
        updated_at: row.get::<_, i64>(9)? as u64,
    })
}

fn with_milestones(conn: &Connection, mut video: Video) -> Result<Video> {
    video.milestone_rewards_claimed = claimed_milestones(conn, &video.id)?;
    Ok(video)
}

/// Insert a new video with zero views.
pub fn insert(conn: &Connection, v: &NewVideo<'_>) -> Result<()> {
    conn.execute(
        "INSERT INTO videos (id, user_id, title, description, video_url, video_key,
                             thumbnail_url, thumbnail_key, views, duration,
                             created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, ?9, ?10, ?10)",
        rusqlite::params![
            v.id,
            v.user_id,
            v.title,
            v.description,
            v.video_url,
            v.video_key,
            v.thumbnail_url,
            v.thumbnail_key,
            v.duration as i64,
            v.created_at as i64,
        ],
    )?;
    Ok(())
}

/// Get a video by id, with its claimed milestones.
pub fn get(conn: &Connection, id: &str) -> Result<Video> {
    let video = conn
        .query_row(
            &format!("SELECT {VIDEO_COLUMNS} FROM videos v WHERE v.id = ?1"),
            [id],
            map_video,
        )
        .optional()?
        .ok_or_else(|| DbError::NotFound(format!("video {id}")))?;
    with_milestones(conn, video)
}

/// Public feed, newest first, with owner display fields.
pub fn list_feed(conn: &Connection, limit: u32, offset: u32) -> Result<Vec<FeedVideo>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {VIDEO_COLUMNS}, p.username, p.avatar_url
         FROM videos v JOIN profiles p ON p.id = v.user_id
         ORDER BY v.created_at DESC, v.id DESC
         LIMIT ?1 OFFSET ?2"
    ))?;

    let rows = stmt
        .query_map(rusqlite::params![limit as i64, offset as i64], |row| {
            Ok((map_video(row)?, row.get(10)?, row.get(11)?))
        })?
        .collect::<std::result::Result<Vec<(Video, Option<String>, Option<String>)>, _>>()?;

    rows.into_iter()
        .map(|(video, owner_username, owner_avatar_url)| {
            Ok(FeedVideo {
                video: with_milestones(conn, video)?,
                owner_username,
                owner_avatar_url,
            })
        })
        .collect()
}

/// All videos owned by `user_id`, newest first.
pub fn list_by_owner(conn: &Connection, user_id: &str) -> Result<Vec<Video>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {VIDEO_COLUMNS} FROM videos v WHERE v.user_id = ?1
         ORDER BY v.created_at DESC, v.id DESC"
    ))?;

    let rows = stmt
        .query_map([user_id], map_video)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|video| with_milestones(conn, video))
        .collect()
}

/// Sum of views and number of videos owned by `user_id`.
pub fn owner_totals(conn: &Connection, user_id: &str) -> Result<(u64, u32)> {
    let (views, count): (i64, i64) = conn.query_row(
        "SELECT COALESCE(SUM(views), 0), COUNT(*) FROM videos WHERE user_id = ?1",
        [user_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok((views as u64, count as u32))
}

/// Increment the view counter in a single statement and return the new
/// count.
///
/// This is the only write path for `videos.views`.
pub fn increment_views(conn: &Connection, id: &str, now: u64) -> Result<u64> {
    let views: i64 = conn
        .query_row(
            "UPDATE videos SET views = views + 1, updated_at = ?1
             WHERE id = ?2 RETURNING views",
            rusqlite::params![now as i64, id],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| DbError::NotFound(format!("video {id}")))?;
    Ok(views as u64)
}

/// Delete a video. Ad unlocks, milestone claims and comments go with it.
pub fn delete(conn: &Connection, id: &str) -> Result<StoredKeys> {
    conn.query_row(
        "DELETE FROM videos WHERE id = ?1 RETURNING video_key, thumbnail_key",
        [id],
        |row| {
            Ok(StoredKeys {
                video_key: row.get(0)?,
                thumbnail_key: row.get(1)?,
            })
        },
    )
    .optional()?
    .ok_or_else(|| DbError::NotFound(format!("video {id}")))
}

/// Claimed milestone thresholds of a video.
pub fn claimed_milestones(conn: &Connection, video_id: &str) -> Result<BTreeMap<u64, bool>> {
    let mut stmt = conn.prepare(
        "SELECT threshold FROM milestone_claims WHERE video_id = ?1 ORDER BY threshold",
    )?;
    let rows = stmt
        .query_map([video_id], |row| row.get::<_, i64>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows.into_iter().map(|t| (t as u64, true)).collect())
}

/// Record a milestone claim. Returns `false` if it was already claimed.
pub fn insert_milestone_claim(
    conn: &Connection,
    video_id: &str,
    threshold: u64,
    now: u64,
) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO milestone_claims (video_id, threshold, claimed_at)
         VALUES (?1, ?2, ?3)",
        rusqlite::params![video_id, threshold as i64, now as i64],
    )?;
    Ok(inserted == 1)
}
