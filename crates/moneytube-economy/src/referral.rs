//! Referral codes and redemption.
//!
//! Each user owns one code, generated on first request. Redeeming a code
//! pays the configured split for the phase (signup or later) and records a
//! usage row; the unique `referred_id` makes redemption once per user.

use rand::Rng;
use rusqlite::Connection;

use moneytube_db::queries::referrals;
use moneytube_db::DbError;
use moneytube_types::referral::{ReferralOutcome, ReferralPhase};
use moneytube_types::reward::Reward;
use moneytube_types::rules::{EconomyRules, ReferralSplit};

use crate::{immediate, ledger, rewards, EconomyError, Result};

/// Alphabet for generated codes.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Collision retries before giving up on code generation.
const MAX_CODE_ATTEMPTS: usize = 16;

/// Generate a random code of `len` characters from [`CODE_ALPHABET`].
pub fn generate_code<R: Rng>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Normalize user input for lookup: trimmed and upper-cased.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Return `user_id`'s code, creating one on first use.
pub fn get_or_create_code<R: Rng>(
    conn: &Connection,
    rng: &mut R,
    rules: &EconomyRules,
    user_id: &str,
    now: u64,
) -> Result<String> {
    if let Some(code) = referrals::code_of(conn, user_id)? {
        return Ok(code);
    }

    for _ in 0..MAX_CODE_ATTEMPTS {
        let code = generate_code(rng, rules.referral_code_length);
        match referrals::insert_code(conn, user_id, &code, now) {
            Ok(()) => {
                tracing::info!(user_id, code = %code, "referral code issued");
                return Ok(code);
            }
            Err(DbError::Constraint(_)) => {
                // Either the code collided or a concurrent call issued one.
                if let Some(existing) = referrals::code_of(conn, user_id)? {
                    return Ok(existing);
                }
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(EconomyError::Storage(DbError::Constraint(
        "could not allocate a unique referral code".to_string(),
    )))
}

fn split_for(rules: &EconomyRules, phase: ReferralPhase) -> ReferralSplit {
    match phase {
        ReferralPhase::Signup => rules.signup_referral,
        ReferralPhase::Later => rules.later_referral,
    }
}

fn reward_for(phase: ReferralPhase, coins: i64) -> Reward {
    match phase {
        ReferralPhase::Signup => Reward::Signup { coins },
        ReferralPhase::Later => Reward::ReferralPage { coins },
    }
}

/// Redeem `code` for `user_id`.
///
/// # Errors
///
/// - [`EconomyError::Validation`] for an empty code
/// - [`EconomyError::Duplicate`] if `user_id` already used a code
/// - [`EconomyError::NotFound`] if no user owns the code
/// - [`EconomyError::Authorization`] for the user's own code
pub fn redeem(
    conn: &mut Connection,
    rules: &EconomyRules,
    user_id: &str,
    code: &str,
    phase: ReferralPhase,
    now: u64,
) -> Result<ReferralOutcome> {
    let code = normalize_code(code);
    if code.is_empty() {
        return Err(EconomyError::Validation("referral code is required".to_string()));
    }

    let tx = immediate(conn)?;

    if referrals::usage_of(&tx, user_id)?.is_some() {
        return Err(EconomyError::Duplicate(
            "you have already used a referral code".to_string(),
        ));
    }
    let referrer_id = referrals::owner_of(&tx, &code)?
        .ok_or_else(|| EconomyError::NotFound(format!("referral code {code}")))?;
    if referrer_id == user_id {
        return Err(EconomyError::Authorization(
            "you cannot use your own referral code".to_string(),
        ));
    }

    referrals::insert_usage(&tx, &referrer_id, user_id, phase.reward_type(), now).map_err(
        |e| match e {
            DbError::Constraint(_) => {
                EconomyError::Duplicate("you have already used a referral code".to_string())
            }
            other => other.into(),
        },
    )?;

    let split = split_for(rules, phase);
    if split.referrer != 0 {
        rewards::grant(&tx, &referrer_id, &reward_for(phase, split.referrer), now)?;
    }
    let referred_balance = if split.referred != 0 {
        rewards::grant(&tx, user_id, &reward_for(phase, split.referred), now)?
    } else {
        ledger::balance(&tx, user_id)?
    };

    tx.commit()?;

    tracing::info!(
        referrer_id = %referrer_id,
        referred_id = user_id,
        ?phase,
        "referral redeemed"
    );

    Ok(ReferralOutcome {
        referrer_id,
        referred_id: user_id.to_string(),
        phase,
        referrer_coins: split.referrer,
        referred_coins: split.referred,
        referred_balance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{seed_user, test_db};
    use moneytube_types::reward::RewardType;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn setup() -> (Connection, String) {
        let conn = test_db();
        seed_user(&conn, "alice");
        seed_user(&conn, "bob");
        seed_user(&conn, "carol");
        let mut rng = StdRng::seed_from_u64(42);
        let code = get_or_create_code(&conn, &mut rng, &EconomyRules::default(), "alice", 1)
            .expect("code");
        (conn, code)
    }

    #[test]
    fn test_code_shape_and_stability() {
        let (conn, code) = setup();
        assert_eq!(code.len(), 8);
        assert!(code.bytes().all(|b| CODE_ALPHABET.contains(&b)));

        let mut rng = StdRng::seed_from_u64(99);
        let again = get_or_create_code(&conn, &mut rng, &EconomyRules::default(), "alice", 2)
            .expect("code");
        assert_eq!(again, code);
    }

    #[test]
    fn test_signup_split() {
        let (mut conn, code) = setup();
        let rules = EconomyRules::default();

        let out = redeem(&mut conn, &rules, "bob", &code, ReferralPhase::Signup, 5)
            .expect("redeem");
        assert_eq!(out.referrer_id, "alice");
        assert_eq!(out.referred_balance, 10);
        assert_eq!(ledger::balance(&conn, "alice").expect("balance"), 40);

        let usage = referrals::usage_of(&conn, "bob").expect("usage").expect("present");
        assert_eq!(usage.referrer_id, "alice");
        assert_eq!(usage.reward_type, RewardType::Signup);

        assert!(matches!(
            redeem(&mut conn, &rules, "bob", &code, ReferralPhase::Later, 6),
            Err(EconomyError::Duplicate(_))
        ));
        assert_eq!(ledger::balance(&conn, "bob").expect("balance"), 10);
        assert_eq!(ledger::balance(&conn, "alice").expect("balance"), 40);
    }

    #[test]
    fn test_later_split_is_case_insensitive() {
        let (mut conn, code) = setup();
        let rules = EconomyRules::default();

        let out = redeem(
            &mut conn,
            &rules,
            "carol",
            &format!("  {}  ", code.to_lowercase()),
            ReferralPhase::Later,
            5,
        )
        .expect("redeem");
        assert_eq!(out.referred_balance, 60);
        assert_eq!(out.referrer_coins, 0);
        assert_eq!(ledger::balance(&conn, "alice").expect("balance"), 0);

        // Zero-coin side writes no audit row.
        assert!(rewards::history(&conn, "alice", 10).expect("history").is_empty());
        let carol = rewards::history(&conn, "carol", 10).expect("history");
        assert_eq!(carol[0].reward_type, RewardType::ReferralPage);
    }

    #[test]
    fn test_rejections() {
        let (mut conn, code) = setup();
        let rules = EconomyRules::default();

        assert!(matches!(
            redeem(&mut conn, &rules, "alice", &code, ReferralPhase::Later, 5),
            Err(EconomyError::Authorization(_))
        ));
        assert!(matches!(
            redeem(&mut conn, &rules, "bob", "NOPE0000", ReferralPhase::Later, 5),
            Err(EconomyError::NotFound(_))
        ));
        assert!(matches!(
            redeem(&mut conn, &rules, "bob", "   ", ReferralPhase::Later, 5),
            Err(EconomyError::Validation(_))
        ));
        assert!(referrals::usage_of(&conn, "bob").expect("usage").is_none());
    }

    #[test]
    fn test_generate_code_deterministic() {
        let a = generate_code(&mut StdRng::seed_from_u64(7), 8);
        let b = generate_code(&mut StdRng::seed_from_u64(7), 8);
        assert_eq!(a, b);
        assert_eq!(generate_code(&mut StdRng::seed_from_u64(7), 12).len(), 12);
    }
}
