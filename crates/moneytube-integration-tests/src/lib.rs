//! Shared fixtures for the MoneyTube end-to-end scenarios.
//!
//! The scenarios under `tests/` drive the economy workflows across
//! `moneytube-db` and `moneytube-economy` the way the daemon does, with
//! explicit timestamps instead of the wall clock.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p moneytube-integration-tests
//! ```

use std::path::Path;

use rusqlite::Connection;

use moneytube_db::queries::{accounts, profiles, rewards, videos, withdrawals};
use moneytube_types::video::Video;

/// Base timestamp for test scenarios (2023-11-14T22:13:20Z).
pub const BASE_TIME: u64 = 1_700_000_000;

/// Open a fresh in-memory database.
pub fn memory_db() -> Connection {
    moneytube_db::open_memory().expect("open in-memory db")
}

/// Open (or create) a file database. Used by scenarios that need several
/// connections to one store.
pub fn file_db(path: &Path) -> Connection {
    moneytube_db::open(path).expect("open file db")
}

/// Create an account and a zero-balance profile for `user_id`.
pub fn create_user(conn: &Connection, user_id: &str) {
    let email = format!("{user_id}@example.com");
    accounts::insert(conn, user_id, &email, &[0u8; 16], &[0u8; 32], BASE_TIME)
        .expect("insert account");
    profiles::insert(conn, user_id, &email, Some(user_id), BASE_TIME).expect("insert profile");
}

/// Row for a video owned by `owner`, created at `created_at`.
pub fn new_video<'a>(id: &'a str, owner: &'a str, created_at: u64) -> videos::NewVideo<'a> {
    videos::NewVideo {
        id,
        user_id: owner,
        title: "Scenario video",
        description: Some("uploaded by an integration test"),
        video_url: "http://localhost:8080/media/videos/v.mp4",
        video_key: "v.mp4",
        thumbnail_url: None,
        thumbnail_key: None,
        duration: 60,
        created_at,
    }
}

/// Current state of a video.
pub fn video(conn: &Connection, id: &str) -> Video {
    videos::get(conn, id).expect("get video")
}

/// Balance implied by the audit trail: every reward earned minus every
/// confirmed withdrawal.
pub fn audited_balance(conn: &Connection, user_id: &str) -> i64 {
    let earned = rewards::total_earned(conn, user_id).expect("total earned");
    let withdrawn: i64 = withdrawals::list_by_user(conn, user_id)
        .expect("list withdrawals")
        .iter()
        .filter(|r| r.is_confirmed)
        .map(|r| r.coins)
        .sum();
    earned - withdrawn
}

/// Live balance from the profile row.
pub fn balance(conn: &Connection, user_id: &str) -> i64 {
    profiles::balance(conn, user_id).expect("balance")
}
