//! # moneytube-db
//!
//! Database access layer for the MoneyTube daemon.
//! Manages the single SQLite database at `$MONEYTUBE_DATA_DIR/moneytube.db`.
//!
//! ## Schema
//!
//! - WAL mode mandatory
//! - Foreign keys enforced
//! - All timestamps are Unix epoch seconds (u64)
//! - Schema version stored in `PRAGMA user_version`
//! - Every exactly-once rule of the economy has a backing unique constraint
//!
//! Balances and view counters are only ever changed through
//! [`queries::profiles::increment_coins`] and
//! [`queries::videos::increment_views`], both single-statement increments.

pub mod migrations;
pub mod queries;
pub mod schema;

use rusqlite::Connection;
use std::path::Path;

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Database error types.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Open or create the MoneyTube database at the given path.
///
/// Every connection the daemon or a test opens goes through [`prepare`], so
/// racing writers all share the same busy timeout and foreign-key rules.
pub fn open(path: &Path) -> Result<Connection> {
    prepare(Connection::open(path)?)
}

/// Open an in-memory database (for testing).
pub fn open_memory() -> Result<Connection> {
    prepare(Connection::open_in_memory()?)
}

fn prepare(conn: Connection) -> Result<Connection> {
    // A writer waiting on another's BEGIN IMMEDIATE retries for up to
    // busy_timeout ms before surfacing SQLITE_BUSY.
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = NORMAL;",
    )?;
    migrations::run(&conn)?;
    Ok(conn)
}

/// Map a constraint failure to [`DbError::Constraint`], leaving other errors
/// as [`DbError::Sqlite`].
pub(crate) fn constraint(e: rusqlite::Error, what: &str) -> DbError {
    if e.sqlite_error_code() == Some(rusqlite::ErrorCode::ConstraintViolation) {
        DbError::Constraint(what.to_string())
    } else {
        DbError::Sqlite(e)
    }
}
