//! Reward audit log.

use rusqlite::Connection;

use moneytube_types::reward::{RewardRecord, RewardType};

use crate::{DbError, Result};

/// Append one audit row. Returns its id.
pub fn insert(
    conn: &Connection,
    user_id: &str,
    video_id: Option<&str>,
    reward_type: RewardType,
    coins_earned: i64,
    now: u64,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO user_rewards (user_id, video_id, reward_type, coins_earned, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![user_id, video_id, reward_type.as_str(), coins_earned, now as i64],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Reward history of a user, newest first.
pub fn list_by_user(conn: &Connection, user_id: &str, limit: u32) -> Result<Vec<RewardRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, video_id, reward_type, coins_earned, created_at
         FROM user_rewards WHERE user_id = ?1
         ORDER BY created_at DESC, id DESC
         LIMIT ?2",
    )?;

    let rows = stmt
        .query_map(rusqlite::params![user_id, limit as i64], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, i64>(5)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(id, user_id, video_id, reward_type, coins_earned, created_at)| {
            let reward_type = reward_type
                .parse::<RewardType>()
                .map_err(|e| DbError::Serialization(e.to_string()))?;
            Ok(RewardRecord {
                id,
                user_id,
                video_id,
                reward_type,
                coins_earned,
                created_at: created_at as u64,
            })
        })
        .collect()
}

/// Sum of all coins granted to a user.
pub fn total_earned(conn: &Connection, user_id: &str) -> Result<i64> {
    let total: i64 = conn.query_row(
        "SELECT COALESCE(SUM(coins_earned), 0) FROM user_rewards WHERE user_id = ?1",
        [user_id],
        |row| row.get(0),
    )?;
    Ok(total)
}
