//! # moneytube-economy
//!
//! The MoneyTube coin economy: rewards, quotas, referrals and withdrawals.
//!
//! Every check-and-grant sequence runs as one `BEGIN IMMEDIATE` transaction,
//! and each exactly-once rule is backed by a unique constraint in
//! `moneytube-db`. A racing duplicate is rejected at write time and its
//! transaction rolls back with no coins moved.
//!
//! ## Modules
//!
//! - [`ledger`]: balance adjustments
//! - [`rewards`]: reward grants, the video-unlock ad and the bonus ad
//! - [`milestones`]: view-milestone payouts for video owners
//! - [`ads`]: server-side ad countdown sessions
//! - [`views`]: playback gating and view counting
//! - [`uploads`]: upload validation, daily quota and deletion
//! - [`referral`]: referral codes and one-time redemption
//! - [`withdraw`]: eligibility, creator stats and withdrawal requests
//! - [`admin`]: withdrawal review and confirmation

pub mod admin;
pub mod ads;
pub mod ledger;
pub mod milestones;
pub mod referral;
pub mod rewards;
pub mod uploads;
pub mod views;
pub mod withdraw;

use moneytube_db::DbError;
use rusqlite::{Connection, Transaction, TransactionBehavior};

/// Error types for economy operations.
#[derive(Debug, thiserror::Error)]
pub enum EconomyError {
    /// Malformed or out-of-range input.
    #[error("{0}")]
    Validation(String),

    /// The caller may not perform this action on this resource.
    #[error("{0}")]
    Authorization(String),

    /// A quota or threshold was not met.
    #[error("{0}")]
    QuotaExceeded(String),

    /// An exactly-once action was attempted a second time.
    #[error("{0}")]
    Duplicate(String),

    /// Unknown user, video, code or request.
    #[error("not found: {0}")]
    NotFound(String),

    /// Underlying store failure. The enclosing transaction is rolled back.
    #[error("storage error: {0}")]
    Storage(DbError),
}

impl From<DbError> for EconomyError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound(what) => EconomyError::NotFound(what),
            other => EconomyError::Storage(other),
        }
    }
}

impl From<rusqlite::Error> for EconomyError {
    fn from(e: rusqlite::Error) -> Self {
        EconomyError::Storage(DbError::Sqlite(e))
    }
}

/// Convenience result type for economy operations.
pub type Result<T> = std::result::Result<T, EconomyError>;

/// Begin a write transaction that takes the database write lock up front.
pub(crate) fn immediate(conn: &mut Connection) -> Result<Transaction<'_>> {
    Ok(conn.transaction_with_behavior(TransactionBehavior::Immediate)?)
}

/// Shared fixtures for the module tests.
#[cfg(test)]
pub(crate) mod testutil {
    use moneytube_db::queries::{accounts, profiles, videos};
    use rusqlite::Connection;

    pub fn test_db() -> Connection {
        moneytube_db::open_memory().expect("open test db")
    }

    pub fn seed_user(conn: &Connection, user_id: &str) {
        let email = format!("{user_id}@example.com");
        accounts::insert(conn, user_id, &email, &[0u8; 16], &[0u8; 32], 1)
            .expect("insert account");
        profiles::insert(conn, user_id, &email, Some(user_id), 1).expect("insert profile");
    }

    pub fn seed_video(conn: &Connection, video_id: &str, owner: &str) {
        videos::insert(
            conn,
            &videos::NewVideo {
                id: video_id,
                user_id: owner,
                title: "Clip",
                description: None,
                video_url: "http://media/videos/k.mp4",
                video_key: "k.mp4",
                thumbnail_url: None,
                thumbnail_key: None,
                duration: 30,
                created_at: 1,
            },
        )
        .expect("insert video");
    }

    /// Set a video's view counter directly.
    pub fn set_views(conn: &Connection, video_id: &str, views: u64) {
        conn.execute(
            "UPDATE videos SET views = ?1 WHERE id = ?2",
            rusqlite::params![views as i64, video_id],
        )
        .expect("set views");
    }

    /// Set a balance directly.
    pub fn set_coins(conn: &Connection, user_id: &str, coins: i64) {
        conn.execute(
            "UPDATE profiles SET coins = ?1 WHERE id = ?2",
            rusqlite::params![coins, user_id],
        )
        .expect("set coins");
    }
}
