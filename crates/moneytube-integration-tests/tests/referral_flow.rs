//! Integration test: the referral program end to end.
//!
//! Each user has one code. A user can be referred once, either at sign-up
//! (referrer 40, referred 10) or later from the referral page (referred 60).

use rand::rngs::StdRng;
use rand::SeedableRng;

use moneytube_db::queries::referrals;
use moneytube_economy::{referral, EconomyError};
use moneytube_integration_tests::{audited_balance, balance, create_user, memory_db, BASE_TIME};
use moneytube_types::referral::ReferralPhase;
use moneytube_types::reward::RewardType;
use moneytube_types::rules::EconomyRules;

#[test]
fn signup_and_later_referrals() {
    let mut conn = memory_db();
    let rules = EconomyRules::default();
    let mut rng = StdRng::seed_from_u64(42);

    for user in ["alice", "bob", "carol"] {
        create_user(&conn, user);
    }
    let code = referral::get_or_create_code(&conn, &mut rng, &rules, "alice", BASE_TIME)
        .expect("alice's code");
    assert_eq!(code.len(), rules.referral_code_length);
    assert_eq!(
        referral::get_or_create_code(&conn, &mut rng, &rules, "alice", BASE_TIME + 1)
            .expect("same code"),
        code
    );

    // Bob signs up with a lower-cased, padded copy of the code.
    let input = format!("  {}  ", code.to_lowercase());
    let bob = referral::redeem(&mut conn, &rules, "bob", &input, ReferralPhase::Signup, BASE_TIME)
        .expect("signup referral");
    assert_eq!((bob.referrer_coins, bob.referred_coins), (40, 10));
    assert_eq!(balance(&conn, "alice"), 40);
    assert_eq!(balance(&conn, "bob"), 10);

    // Bob already used a code; the later path is closed to him.
    let again = referral::redeem(&mut conn, &rules, "bob", &code, ReferralPhase::Later, BASE_TIME);
    assert!(matches!(again, Err(EconomyError::Duplicate(_))));

    // Carol enters the code later and only she is paid.
    let carol = referral::redeem(&mut conn, &rules, "carol", &code, ReferralPhase::Later, BASE_TIME)
        .expect("later referral");
    assert_eq!((carol.referrer_coins, carol.referred_coins), (0, 60));
    assert_eq!(balance(&conn, "alice"), 40);
    assert_eq!(balance(&conn, "carol"), 60);

    let usage = referrals::usage_of(&conn, "carol")
        .expect("usage query")
        .expect("usage row");
    assert_eq!(usage.referrer_id, "alice");
    assert_eq!(usage.reward_type, RewardType::ReferralPage);
    assert_eq!(referrals::count_referred(&conn, "alice").expect("count"), 2);

    for user in ["alice", "bob", "carol"] {
        assert_eq!(audited_balance(&conn, user), balance(&conn, user), "{user}");
    }
}

#[test]
fn invalid_redemptions_move_no_coins() {
    let mut conn = memory_db();
    let rules = EconomyRules::default();
    let mut rng = StdRng::seed_from_u64(9);
    create_user(&conn, "alice");
    let code = referral::get_or_create_code(&conn, &mut rng, &rules, "alice", BASE_TIME)
        .expect("code");

    let own = referral::redeem(&mut conn, &rules, "alice", &code, ReferralPhase::Later, BASE_TIME);
    assert!(matches!(own, Err(EconomyError::Authorization(_))));

    let unknown =
        referral::redeem(&mut conn, &rules, "alice", "NOPE2345", ReferralPhase::Later, BASE_TIME);
    assert!(matches!(unknown, Err(EconomyError::NotFound(_))));

    let empty =
        referral::redeem(&mut conn, &rules, "alice", "   ", ReferralPhase::Later, BASE_TIME);
    assert!(matches!(empty, Err(EconomyError::Validation(_))));

    assert_eq!(balance(&conn, "alice"), 0);
    assert!(referrals::usage_of(&conn, "alice").expect("usage").is_none());
}
