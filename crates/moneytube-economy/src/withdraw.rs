//! Withdrawal eligibility, creator stats and requests.
//!
//! Submitting a request moves no coins. The recorded amount is debited when
//! an admin confirms it (see [`crate::admin`]).

use rusqlite::Connection;

use moneytube_db::queries::{profiles, videos, withdrawals};
use moneytube_types::profile::{progress_pct, CreatorStats};
use moneytube_types::rules::EconomyRules;
use moneytube_types::withdraw::{Eligibility, Payout, WithdrawMethod, WithdrawRequest};

use crate::{immediate, EconomyError, Result};

/// Eligibility of `user_id`: enough coins and enough total views across
/// their videos.
pub fn evaluate(conn: &Connection, rules: &EconomyRules, user_id: &str) -> Result<Eligibility> {
    let coins = profiles::balance(conn, user_id)?;
    let (total_views, _) = videos::owner_totals(conn, user_id)?;
    Ok(Eligibility {
        eligible: coins >= rules.min_withdraw_coins && total_views >= rules.min_withdraw_views,
        coins,
        total_views,
        min_coins: rules.min_withdraw_coins,
        min_views: rules.min_withdraw_views,
    })
}

/// Dashboard numbers for a creator.
pub fn creator_stats(
    conn: &Connection,
    rules: &EconomyRules,
    user_id: &str,
) -> Result<CreatorStats> {
    let coins = profiles::balance(conn, user_id)?;
    let (total_views, video_count) = videos::owner_totals(conn, user_id)?;
    Ok(CreatorStats {
        coins,
        total_views,
        video_count,
        coins_progress_pct: progress_pct(
            coins.max(0) as u64,
            rules.min_withdraw_coins.max(0) as u64,
        ),
        views_progress_pct: progress_pct(total_views, rules.min_withdraw_views),
        can_withdraw: coins >= rules.min_withdraw_coins
            && total_views >= rules.min_withdraw_views,
    })
}

/// Check a requested amount against the withdrawal unit and `balance`.
///
/// # Errors
///
/// - [`EconomyError::Validation`] if the amount is not a positive multiple of
///   the unit or exceeds the balance
pub fn validate_amount(rules: &EconomyRules, coins: i64, balance: i64) -> Result<()> {
    let unit = rules.withdraw_unit_coins.max(1);
    if coins <= 0 || coins % unit != 0 {
        return Err(EconomyError::Validation(format!(
            "amount must be a positive multiple of {unit} coins"
        )));
    }
    if coins > balance {
        return Err(EconomyError::Validation(format!(
            "amount {coins} exceeds balance {balance}"
        )));
    }
    Ok(())
}

/// Submit a withdrawal request.
///
/// # Errors
///
/// - [`EconomyError::QuotaExceeded`] if the user is not eligible
/// - [`EconomyError::Validation`] for a bad amount or an empty number
pub fn submit(
    conn: &mut Connection,
    rules: &EconomyRules,
    user_id: &str,
    method: WithdrawMethod,
    number: &str,
    coins: i64,
    now: u64,
) -> Result<WithdrawRequest> {
    let number = number.trim();
    if number.is_empty() {
        return Err(EconomyError::Validation(format!(
            "a {method} number is required"
        )));
    }

    let tx = immediate(conn)?;

    let eligibility = evaluate(&tx, rules, user_id)?;
    if !eligibility.eligible {
        return Err(EconomyError::QuotaExceeded(format!(
            "withdrawals need at least {} coins and {} total views (you have {} coins, {} views)",
            rules.min_withdraw_coins,
            rules.min_withdraw_views,
            eligibility.coins,
            eligibility.total_views
        )));
    }
    validate_amount(rules, coins, eligibility.coins)?;

    let payout = Payout::from_coins(coins, rules.coins_per_paisa);
    let id = withdrawals::insert(&tx, user_id, method, number, coins, payout.paise(), now)?;
    let request = withdrawals::get(&tx, id)?;

    tx.commit()?;

    tracing::info!(
        user_id,
        request_id = id,
        coins,
        payout = %payout,
        method = %method,
        "withdrawal requested"
    );
    Ok(request)
}

/// The user's own requests, newest first.
pub fn list_mine(conn: &Connection, user_id: &str) -> Result<Vec<WithdrawRequest>> {
    Ok(withdrawals::list_by_user(conn, user_id)?)
}
