//! Profile queries and the atomic balance primitive.

use rusqlite::{Connection, OptionalExtension};

use moneytube_types::profile::Profile;

use crate::{DbError, Result};

const PROFILE_COLUMNS: &str = "id, username, email, avatar_url, coins, created_at, updated_at";

fn map_profile(row: &rusqlite::Row<'_>) -> rusqlite::Result<Profile> {
    Ok(Profile {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        avatar_url: row.get(3)?,
        coins: row.get(4)?,
        created_at: row.get::<_, i64>(5)? as u64,
        updated_at: row.get::<_, i64>(6)? as u64,
    })
}

/// Create a profile with a zero balance.
pub fn insert(
    conn: &Connection,
    id: &str,
    email: &str,
    username: Option<&str>,
    now: u64,
) -> Result<()> {
    conn.execute(
        "INSERT INTO profiles (id, username, email, coins, created_at, updated_at)
         VALUES (?1, ?2, ?3, 0, ?4, ?4)",
        rusqlite::params![id, username, email, now as i64],
    )?;
    Ok(())
}

/// Get a profile by user id.
pub fn get(conn: &Connection, id: &str) -> Result<Profile> {
    conn.query_row(
        &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = ?1"),
        [id],
        map_profile,
    )
    .optional()?
    .ok_or_else(|| DbError::NotFound(format!("profile {id}")))
}

/// Current balance.
pub fn balance(conn: &Connection, id: &str) -> Result<i64> {
    conn.query_row("SELECT coins FROM profiles WHERE id = ?1", [id], |row| {
        row.get(0)
    })
    .optional()?
    .ok_or_else(|| DbError::NotFound(format!("profile {id}")))
}

/// Add `delta` (possibly negative) to a balance in a single statement and
/// return the new balance.
///
/// This is the only write path for `profiles.coins`.
pub fn increment_coins(conn: &Connection, id: &str, delta: i64, now: u64) -> Result<i64> {
    conn.query_row(
        "UPDATE profiles SET coins = coins + ?1, updated_at = ?2
         WHERE id = ?3 RETURNING coins",
        rusqlite::params![delta, now as i64, id],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| DbError::NotFound(format!("profile {id}")))
}

/// Update the editable display fields. `None` leaves a field unchanged.
pub fn update(
    conn: &Connection,
    id: &str,
    username: Option<&str>,
    avatar_url: Option<&str>,
    now: u64,
) -> Result<Profile> {
    let changed = conn.execute(
        "UPDATE profiles SET
            username = COALESCE(?1, username),
            avatar_url = COALESCE(?2, avatar_url),
            updated_at = ?3
         WHERE id = ?4",
        rusqlite::params![username, avatar_url, now as i64, id],
    )?;
    if changed == 0 {
        return Err(DbError::NotFound(format!("profile {id}")));
    }
    get(conn, id)
}
