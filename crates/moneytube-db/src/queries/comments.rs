//! Comments and comment likes.

use rusqlite::{Connection, OptionalExtension};

use moneytube_types::video::Comment;

use crate::{DbError, Result};

/// Insert a comment. Returns its id.
pub fn insert(
    conn: &Connection,
    video_id: &str,
    user_id: &str,
    content: &str,
    now: u64,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO comments (video_id, user_id, content, likes_count, created_at, updated_at)
         VALUES (?1, ?2, ?3, 0, ?4, ?4)",
        rusqlite::params![video_id, user_id, content, now as i64],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Author of a comment.
pub fn author_of(conn: &Connection, id: i64) -> Result<String> {
    conn.query_row("SELECT user_id FROM comments WHERE id = ?1", [id], |row| {
        row.get(0)
    })
    .optional()?
    .ok_or_else(|| DbError::NotFound(format!("comment {id}")))
}

/// Comments on a video, newest first. `viewer` drives `user_has_liked`.
pub fn list_by_video(
    conn: &Connection,
    video_id: &str,
    viewer: Option<&str>,
) -> Result<Vec<Comment>> {
    let mut stmt = conn.prepare(
        "SELECT c.id, c.video_id, c.user_id, c.content, c.likes_count,
                p.username, p.avatar_url,
                EXISTS(SELECT 1 FROM comment_likes l
                       WHERE l.comment_id = c.id AND l.user_id = ?2),
                c.created_at
         FROM comments c JOIN profiles p ON p.id = c.user_id
         WHERE c.video_id = ?1
         ORDER BY c.created_at DESC, c.id DESC",
    )?;

    let rows = stmt
        .query_map(rusqlite::params![video_id, viewer], |row| {
            Ok(Comment {
                id: row.get(0)?,
                video_id: row.get(1)?,
                user_id: row.get(2)?,
                content: row.get(3)?,
                likes_count: row.get::<_, i64>(4)? as u32,
                username: row.get(5)?,
                avatar_url: row.get(6)?,
                user_has_liked: row.get(7)?,
                created_at: row.get::<_, i64>(8)? as u64,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Delete a comment. Its likes go with it.
pub fn delete(conn: &Connection, id: i64) -> Result<()> {
    let changed = conn.execute("DELETE FROM comments WHERE id = ?1", [id])?;
    if changed == 0 {
        return Err(DbError::NotFound(format!("comment {id}")));
    }
    Ok(())
}

/// Add a like by `user_id`. Returns `false` if it was already liked.
///
/// Callers run this with [`set_likes_count`] inside one transaction.
pub fn insert_like(conn: &Connection, comment_id: i64, user_id: &str, now: u64) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO comment_likes (comment_id, user_id, created_at)
         VALUES (?1, ?2, ?3)",
        rusqlite::params![comment_id, user_id, now as i64],
    )?;
    Ok(inserted == 1)
}

/// Remove a like by `user_id`. Returns `false` if there was none.
pub fn delete_like(conn: &Connection, comment_id: i64, user_id: &str) -> Result<bool> {
    let removed = conn.execute(
        "DELETE FROM comment_likes WHERE comment_id = ?1 AND user_id = ?2",
        rusqlite::params![comment_id, user_id],
    )?;
    Ok(removed == 1)
}

/// Recount the likes of a comment into `likes_count`. Returns the count.
pub fn set_likes_count(conn: &Connection, comment_id: i64, now: u64) -> Result<u32> {
    let n: i64 = conn
        .query_row(
            "UPDATE comments SET
                likes_count = (SELECT COUNT(*) FROM comment_likes WHERE comment_id = ?1),
                updated_at = ?2
             WHERE id = ?1 RETURNING likes_count",
            rusqlite::params![comment_id, now as i64],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| DbError::NotFound(format!("comment {comment_id}")))?;
    Ok(n as u32)
}
