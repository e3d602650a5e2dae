//! Referral codes and their one-time usage.

use rusqlite::{Connection, OptionalExtension};

use moneytube_types::reward::RewardType;

use crate::{constraint, DbError, Result};

/// A recorded redemption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageRow {
    pub id: i64,
    pub referrer_id: String,
    pub referred_id: String,
    pub reward_type: RewardType,
    pub created_at: u64,
}

/// The code owned by `user_id`, if one was issued.
pub fn code_of(conn: &Connection, user_id: &str) -> Result<Option<String>> {
    let code = conn
        .query_row(
            "SELECT code FROM referral_codes WHERE user_id = ?1",
            [user_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(code)
}

/// Store a code for `user_id`. Fails with [`DbError::Constraint`] when the
/// code is taken or the user already has one.
pub fn insert_code(conn: &Connection, user_id: &str, code: &str, now: u64) -> Result<()> {
    conn.execute(
        "INSERT INTO referral_codes (user_id, code, created_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![user_id, code, now as i64],
    )
    .map_err(|e| constraint(e, "referral code"))?;
    Ok(())
}

/// Owner of a code. Codes are matched exactly; callers normalize case.
pub fn owner_of(conn: &Connection, code: &str) -> Result<Option<String>> {
    let owner = conn
        .query_row(
            "SELECT user_id FROM referral_codes WHERE code = ?1",
            [code],
            |row| row.get(0),
        )
        .optional()?;
    Ok(owner)
}

/// The redemption made by `referred_id`, if any.
pub fn usage_of(conn: &Connection, referred_id: &str) -> Result<Option<UsageRow>> {
    let row = conn
        .query_row(
            "SELECT id, referrer_id, referred_id, reward_type, created_at
             FROM referral_usage WHERE referred_id = ?1",
            [referred_id],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            },
        )
        .optional()?;

    row.map(|(id, referrer_id, referred_id, reward_type, created_at)| {
        let reward_type = reward_type
            .parse::<RewardType>()
            .map_err(|e| DbError::Serialization(e.to_string()))?;
        Ok(UsageRow {
            id,
            referrer_id,
            referred_id,
            reward_type,
            created_at: created_at as u64,
        })
    })
    .transpose()
}

/// Record a redemption. A second redemption by the same user fails with
/// [`DbError::Constraint`].
pub fn insert_usage(
    conn: &Connection,
    referrer_id: &str,
    referred_id: &str,
    reward_type: RewardType,
    now: u64,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO referral_usage (referrer_id, referred_id, reward_type, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![referrer_id, referred_id, reward_type.as_str(), now as i64],
    )
    .map_err(|e| constraint(e, "referral already used"))?;
    Ok(conn.last_insert_rowid())
}

/// Number of users who redeemed `referrer_id`'s code.
pub fn count_referred(conn: &Connection, referrer_id: &str) -> Result<u32> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM referral_usage WHERE referrer_id = ?1",
        [referrer_id],
        |row| row.get(0),
    )?;
    Ok(n as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::seed_user;

    fn test_db() -> Connection {
        let conn = crate::open_memory().expect("open test db");
        seed_user(&conn, "alice");
        seed_user(&conn, "bob");
        seed_user(&conn, "carol");
        conn
    }

    #[test]
    fn test_code_lookup() {
        let conn = test_db();
        assert_eq!(code_of(&conn, "alice").expect("code"), None);
        insert_code(&conn, "alice", "ABCD1234", 1).expect("insert");
        assert_eq!(code_of(&conn, "alice").expect("code").as_deref(), Some("ABCD1234"));
        assert_eq!(owner_of(&conn, "ABCD1234").expect("owner").as_deref(), Some("alice"));
        assert_eq!(owner_of(&conn, "abcd1234").expect("owner"), None);
    }

    #[test]
    fn test_code_collision() {
        let conn = test_db();
        insert_code(&conn, "alice", "ABCD1234", 1).expect("insert");
        assert!(matches!(
            insert_code(&conn, "bob", "ABCD1234", 1),
            Err(DbError::Constraint(_))
        ));
        assert!(matches!(
            insert_code(&conn, "alice", "ZZZZ9999", 1),
            Err(DbError::Constraint(_))
        ));
    }

    #[test]
    fn test_usage_once_per_referred() {
        let conn = test_db();
        insert_usage(&conn, "alice", "bob", RewardType::Signup, 5).expect("usage");
        assert!(matches!(
            insert_usage(&conn, "carol", "bob", RewardType::ReferralPage, 6),
            Err(DbError::Constraint(_))
        ));

        let usage = usage_of(&conn, "bob").expect("usage").expect("present");
        assert_eq!(usage.referrer_id, "alice");
        assert_eq!(usage.reward_type, RewardType::Signup);
        assert_eq!(usage_of(&conn, "carol").expect("usage"), None);

        insert_usage(&conn, "alice", "carol", RewardType::ReferralPage, 7).expect("usage");
        assert_eq!(count_referred(&conn, "alice").expect("count"), 2);
    }
}
