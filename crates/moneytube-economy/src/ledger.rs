//! Balance ledger.
//!
//! A balance only moves through [`adjust`], which is a single
//! `UPDATE ... SET coins = coins + ?` returning the new value.

use rusqlite::Connection;

use moneytube_db::queries::profiles;

use crate::Result;

/// Apply `delta` to `user_id`'s balance and return the new balance.
///
/// # Errors
///
/// - [`crate::EconomyError::NotFound`] if the profile does not exist
pub fn adjust(conn: &Connection, user_id: &str, delta: i64, now: u64) -> Result<i64> {
    let balance = profiles::increment_coins(conn, user_id, delta, now)?;
    tracing::debug!(user_id, delta, balance, "ledger adjusted");
    Ok(balance)
}

/// Current balance of `user_id`.
pub fn balance(conn: &Connection, user_id: &str) -> Result<i64> {
    Ok(profiles::balance(conn, user_id)?)
}
