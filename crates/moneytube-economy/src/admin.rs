//! Withdrawal review and confirmation.

use rusqlite::Connection;
use serde::Serialize;

use moneytube_db::queries::withdrawals;
use moneytube_types::rules::{ConfirmPolicy, EconomyRules};
use moneytube_types::withdraw::{WithdrawRequest, WithdrawalQueue};
use moneytube_types::RequestId;

use crate::{immediate, ledger, EconomyError, Result};

/// Result of a confirmation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Confirmation {
    pub request: WithdrawRequest,
    /// Requester's balance after the debit.
    pub balance: i64,
}

/// All requests split into pending and confirmed, each newest first.
pub fn list_requests(conn: &Connection) -> Result<WithdrawalQueue> {
    let (confirmed, pending): (Vec<_>, Vec<_>) = withdrawals::list_all(conn)?
        .into_iter()
        .partition(|r| r.is_confirmed);
    Ok(WithdrawalQueue { pending, confirmed })
}

/// Confirm a pending request and debit the amount recorded on it.
///
/// The debit follows `rules.confirm_policy`: with
/// [`ConfirmPolicy::LockedAmount`] the recorded amount is taken even if the
/// balance has since dropped below it; with [`ConfirmPolicy::LiveBalance`]
/// such a request is refused and stays pending.
///
/// # Errors
///
/// - [`EconomyError::NotFound`] if the request does not exist
/// - [`EconomyError::Duplicate`] if it is already confirmed
/// - [`EconomyError::QuotaExceeded`] under the live-balance policy when the
///   balance no longer covers the request
pub fn confirm(
    conn: &mut Connection,
    rules: &EconomyRules,
    request_id: RequestId,
    now: u64,
) -> Result<Confirmation> {
    let tx = immediate(conn)?;

    let pending = withdrawals::get(&tx, request_id)?;
    if pending.is_confirmed {
        return Err(EconomyError::Duplicate(format!(
            "request {request_id} is already confirmed"
        )));
    }

    if rules.confirm_policy == ConfirmPolicy::LiveBalance {
        let live = ledger::balance(&tx, &pending.user_id)?;
        if live < pending.coins {
            return Err(EconomyError::QuotaExceeded(format!(
                "balance {live} no longer covers {} coins",
                pending.coins
            )));
        }
    }

    if !withdrawals::mark_confirmed(&tx, request_id, now)? {
        return Err(EconomyError::Duplicate(format!(
            "request {request_id} is already confirmed"
        )));
    }
    let balance = ledger::adjust(&tx, &pending.user_id, -pending.coins, now)?;
    let request = withdrawals::get(&tx, request_id)?;

    tx.commit()?;

    if balance < 0 {
        tracing::warn!(
            user_id = %request.user_id,
            request_id,
            coins = request.coins,
            balance,
            "confirmation left a negative balance"
        );
    }
    tracing::info!(
        user_id = %request.user_id,
        request_id,
        coins = request.coins,
        balance,
        "withdrawal confirmed"
    );

    Ok(Confirmation { request, balance })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{seed_user, seed_video, set_coins, set_views, test_db};
    use crate::withdraw::submit;
    use moneytube_types::withdraw::WithdrawMethod;

    fn setup() -> (Connection, RequestId) {
        let mut conn = test_db();
        seed_user(&conn, "u1");
        seed_video(&conn, "v1", "u1");
        set_views(&conn, "v1", 1000);
        set_coins(&conn, "u1", 200);
        let req = submit(
            &mut conn,
            &EconomyRules::default(),
            "u1",
            WithdrawMethod::Paytm,
            "98765",
            100,
            10,
        )
        .expect("submit");
        (conn, req.id)
    }

    #[test]
    fn test_confirm_debits_once() {
        let (mut conn, id) = setup();
        let rules = EconomyRules::default();

        let c = confirm(&mut conn, &rules, id, 20).expect("confirm");
        assert_eq!(c.balance, 100);
        assert!(c.request.is_confirmed);
        assert_eq!(c.request.confirmed_at, Some(20));

        assert!(matches!(
            confirm(&mut conn, &rules, id, 21),
            Err(EconomyError::Duplicate(_))
        ));
        assert_eq!(ledger::balance(&conn, "u1").expect("balance"), 100);
    }

    #[test]
    fn test_confirm_unknown() {
        let (mut conn, id) = setup();
        assert!(matches!(
            confirm(&mut conn, &EconomyRules::default(), id + 1, 20),
            Err(EconomyError::NotFound(_))
        ));
    }

    #[test]
    fn test_locked_amount_may_go_negative() {
        let (mut conn, id) = setup();
        set_coins(&conn, "u1", 30);
        let c = confirm(&mut conn, &EconomyRules::default(), id, 20).expect("confirm");
        assert_eq!(c.balance, -70);
    }

    #[test]
    fn test_live_balance_refuses() {
        let (mut conn, id) = setup();
        set_coins(&conn, "u1", 30);
        let rules = EconomyRules {
            confirm_policy: ConfirmPolicy::LiveBalance,
            ..EconomyRules::default()
        };
        assert!(matches!(
            confirm(&mut conn, &rules, id, 20),
            Err(EconomyError::QuotaExceeded(_))
        ));
        assert!(!withdrawals::get(&conn, id).expect("get").is_confirmed);
        assert_eq!(ledger::balance(&conn, "u1").expect("balance"), 30);
    }

    #[test]
    fn test_list_partitions() {
        let (mut conn, first) = setup();
        let rules = EconomyRules::default();
        let second = submit(&mut conn, &rules, "u1", WithdrawMethod::Bank, "0042", 50, 30)
            .expect("submit")
            .id;
        confirm(&mut conn, &rules, first, 40).expect("confirm");

        let queue = list_requests(&conn).expect("list");
        assert_eq!(queue.pending.iter().map(|r| r.id).collect::<Vec<_>>(), vec![second]);
        assert_eq!(queue.confirmed.iter().map(|r| r.id).collect::<Vec<_>>(), vec![first]);
    }
}
