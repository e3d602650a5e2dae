//! Per-user daily upload counters.

use rusqlite::{Connection, OptionalExtension};

use crate::Result;

/// Uploads recorded for `user_id` on `day` (epoch day).
pub fn count(conn: &Connection, user_id: &str, day: u64) -> Result<u32> {
    let n: Option<i64> = conn
        .query_row(
            "SELECT upload_count FROM daily_uploads WHERE user_id = ?1 AND upload_date = ?2",
            rusqlite::params![user_id, day as i64],
            |row| row.get(0),
        )
        .optional()?;
    Ok(n.unwrap_or(0) as u32)
}

/// Increment the counter for `(user_id, day)` unless it already reached
/// `limit`.
///
/// Returns the new count, or `None` when the limit was hit. The check and
/// the increment are one statement, so concurrent uploads cannot both take
/// the last slot.
pub fn increment_guarded(
    conn: &Connection,
    user_id: &str,
    day: u64,
    limit: u32,
) -> Result<Option<u32>> {
    if limit == 0 {
        return Ok(None);
    }
    let n: Option<i64> = conn
        .query_row(
            "INSERT INTO daily_uploads (user_id, upload_date, upload_count)
             VALUES (?1, ?2, 1)
             ON CONFLICT (user_id, upload_date) DO UPDATE
                SET upload_count = upload_count + 1
                WHERE upload_count < ?3
             RETURNING upload_count",
            rusqlite::params![user_id, day as i64, limit as i64],
            |row| row.get(0),
        )
        .optional()?;
    Ok(n.map(|n| n as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::seed_user;

    fn test_db() -> Connection {
        let conn = crate::open_memory().expect("open test db");
        seed_user(&conn, "u1");
        conn
    }

    #[test]
    fn test_guarded_increment_stops_at_limit() {
        let conn = test_db();
        assert_eq!(count(&conn, "u1", 20_000).expect("count"), 0);
        for expected in 1..=3 {
            assert_eq!(
                increment_guarded(&conn, "u1", 20_000, 3).expect("inc"),
                Some(expected)
            );
        }
        assert_eq!(increment_guarded(&conn, "u1", 20_000, 3).expect("inc"), None);
        assert_eq!(count(&conn, "u1", 20_000).expect("count"), 3);
    }

    #[test]
    fn test_new_day_resets() {
        let conn = test_db();
        increment_guarded(&conn, "u1", 20_000, 1).expect("inc");
        assert_eq!(increment_guarded(&conn, "u1", 20_000, 1).expect("inc"), None);
        assert_eq!(increment_guarded(&conn, "u1", 20_001, 1).expect("inc"), Some(1));
    }

    #[test]
    fn test_zero_limit() {
        let conn = test_db();
        assert_eq!(increment_guarded(&conn, "u1", 20_000, 0).expect("inc"), None);
    }
}
