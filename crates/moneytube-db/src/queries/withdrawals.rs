//! Withdrawal requests.

use rusqlite::{Connection, OptionalExtension};

use moneytube_types::withdraw::{WithdrawMethod, WithdrawRequest};

use crate::{DbError, Result};

const REQUEST_COLUMNS: &str =
    "id, user_id, method, number, coins, payout_paise, is_confirmed, created_at, confirmed_at";

type RawRequest = (i64, String, String, String, i64, i64, bool, i64, Option<i64>);

fn read_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRequest> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
    ))
}

fn decode(raw: RawRequest) -> Result<WithdrawRequest> {
    let (id, user_id, method, number, coins, payout_paise, is_confirmed, created_at, confirmed_at) =
        raw;
    let method = method
        .parse::<WithdrawMethod>()
        .map_err(|e| DbError::Serialization(e.to_string()))?;
    Ok(WithdrawRequest {
        id,
        user_id,
        method,
        number,
        coins,
        payout_paise,
        is_confirmed,
        created_at: created_at as u64,
        confirmed_at: confirmed_at.map(|t| t as u64),
    })
}

fn query_list(
    conn: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::ToSql],
) -> Result<Vec<WithdrawRequest>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, read_raw)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    rows.into_iter().map(decode).collect()
}

/// Insert a pending request. Returns its id.
pub fn insert(
    conn: &Connection,
    user_id: &str,
    method: WithdrawMethod,
    number: &str,
    coins: i64,
    payout_paise: i64,
    now: u64,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO withdraw_requests
            (user_id, method, number, coins, payout_paise, is_confirmed, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
        rusqlite::params![user_id, method.as_str(), number, coins, payout_paise, now as i64],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Get a request by id.
pub fn get(conn: &Connection, id: i64) -> Result<WithdrawRequest> {
    let raw = conn
        .query_row(
            &format!("SELECT {REQUEST_COLUMNS} FROM withdraw_requests WHERE id = ?1"),
            [id],
            read_raw,
        )
        .optional()?
        .ok_or_else(|| DbError::NotFound(format!("withdraw request {id}")))?;
    decode(raw)
}

/// All requests, newest first.
pub fn list_all(conn: &Connection) -> Result<Vec<WithdrawRequest>> {
    query_list(
        conn,
        &format!(
            "SELECT {REQUEST_COLUMNS} FROM withdraw_requests ORDER BY created_at DESC, id DESC"
        ),
        &[],
    )
}

/// Requests made by one user, newest first.
pub fn list_by_user(conn: &Connection, user_id: &str) -> Result<Vec<WithdrawRequest>> {
    query_list(
        conn,
        &format!(
            "SELECT {REQUEST_COLUMNS} FROM withdraw_requests WHERE user_id = ?1
             ORDER BY created_at DESC, id DESC"
        ),
        &[&user_id],
    )
}

/// Flip a pending request to confirmed.
///
/// Returns `false` when the request is missing or already confirmed; the
/// flag can only change once.
pub fn mark_confirmed(conn: &Connection, id: i64, now: u64) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE withdraw_requests SET is_confirmed = 1, confirmed_at = ?1
         WHERE id = ?2 AND is_confirmed = 0",
        rusqlite::params![now as i64, id],
    )?;
    Ok(changed == 1)
}
