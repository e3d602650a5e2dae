//! Per-(user, video) ad unlock records.

use rusqlite::Connection;

use crate::Result;

/// Record that `user_id` watched the unlock ad for `video_id`.
///
/// Returns `true` only for the first watch; later calls leave the existing
/// row untouched.
pub fn insert_if_absent(
    conn: &Connection,
    user_id: &str,
    video_id: &str,
    reward_given: bool,
    now: u64,
) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO ad_watches (user_id, video_id, reward_given, watched_at)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![user_id, video_id, reward_given, now as i64],
    )?;
    Ok(inserted == 1)
}

/// Whether `user_id` has unlocked `video_id`.
pub fn exists(conn: &Connection, user_id: &str, video_id: &str) -> Result<bool> {
    let found: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM ad_watches WHERE user_id = ?1 AND video_id = ?2)",
        [user_id, video_id],
        |row| row.get(0),
    )?;
    Ok(found)
}
