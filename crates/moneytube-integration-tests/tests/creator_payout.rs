//! Integration test: a creator's path from upload to a confirmed payout.
//!
//! 1. Creator uploads a video through the daily quota
//! 2. Viewers unlock it by completing the video ad
//! 3. Creator claims the view milestone and watches bonus ads
//! 4. Creator becomes eligible and requests a withdrawal
//! 5. Admin confirms; the balance is debited exactly once
//! 6. Every balance matches its audit trail

use rand::rngs::StdRng;
use rand::SeedableRng;

use moneytube_economy::ads::{AdSessions, AdTarget};
use moneytube_economy::{admin, milestones, rewards, uploads, withdraw};
use moneytube_integration_tests::{
    audited_balance, balance, create_user, memory_db, new_video, video, BASE_TIME,
};
use moneytube_types::rules::EconomyRules;
use moneytube_types::withdraw::WithdrawMethod;

const VIEWERS: usize = 120;

fn rules() -> EconomyRules {
    EconomyRules {
        min_withdraw_views: 100,
        ..EconomyRules::default()
    }
}

#[test]
fn creator_upload_to_confirmed_withdrawal() {
    let mut conn = memory_db();
    let rules = rules();
    let mut rng = StdRng::seed_from_u64(7);
    let mut ads = AdSessions::new();

    // =========================================================
    // Upload
    // =========================================================
    create_user(&conn, "creator");
    uploads::check_quota(&conn, &rules, "creator", BASE_TIME).expect("quota available");
    let row = new_video("vid-1", "creator", BASE_TIME);
    let uploaded = uploads::record_upload(&mut conn, &rules, &row).expect("upload");
    assert_eq!(uploaded.views, 0);

    // =========================================================
    // Viewers unlock the video
    // =========================================================
    let mut now = BASE_TIME + 60;
    for i in 0..VIEWERS {
        let viewer = format!("viewer-{i}");
        create_user(&conn, &viewer);

        let target = AdTarget::VideoUnlock {
            video_id: "vid-1".to_string(),
        };
        let ticket = ads.start(&mut rng, &rules, &viewer, target, now);
        now += rules.video_ad_secs;
        let completed = ads
            .complete(&ticket.ticket, &viewer, now)
            .expect("countdown elapsed");
        let AdTarget::VideoUnlock { video_id } = completed else {
            unreachable!("video ticket completed as another target");
        };

        let outcome = rewards::complete_video_ad(&mut conn, &rules, &viewer, &video_id, now)
            .expect("complete video ad");
        assert_eq!(outcome.granted, rules.video_ad_reward);
    }
    assert!(ads.is_empty(), "video tickets are consumed on completion");
    assert_eq!(video(&conn, "vid-1").views, VIEWERS as u64);

    // Not yet eligible: no coins.
    let before = withdraw::evaluate(&conn, &rules, "creator").expect("evaluate");
    assert!(!before.eligible);
    assert_eq!(before.total_views, VIEWERS as u64);

    // =========================================================
    // Milestone and bonus ads
    // =========================================================
    let claim = milestones::claim(&mut conn, &rules, "creator", "vid-1", None, now)
        .expect("claim milestones");
    assert_eq!(claim.claimed.len(), 1);
    assert_eq!(claim.coins, 10);
    assert!(video(&conn, "vid-1").milestone_claimed(100));

    for _ in 0..40 {
        let ticket = ads.start(&mut rng, &rules, "creator", AdTarget::Bonus, now);
        now += rules.bonus_ad_secs;
        ads.complete(&ticket.ticket, "creator", now)
            .expect("bonus countdown elapsed");
        rewards::claim_bonus_ad(&mut conn, &rules, "creator", now).expect("bonus");
    }
    assert_eq!(balance(&conn, "creator"), 50);

    // =========================================================
    // Withdrawal request
    // =========================================================
    let eligibility = withdraw::evaluate(&conn, &rules, "creator").expect("evaluate");
    assert!(eligibility.eligible);

    let request = withdraw::submit(
        &mut conn,
        &rules,
        "creator",
        WithdrawMethod::Paytm,
        "9876543210",
        50,
        now,
    )
    .expect("submit");
    assert_eq!(request.payout().paise(), 5);
    assert_eq!(balance(&conn, "creator"), 50, "not debited before confirmation");

    let queue = admin::list_requests(&conn).expect("queue");
    assert_eq!(queue.pending.len(), 1);
    assert!(queue.confirmed.is_empty());

    // =========================================================
    // Confirmation
    // =========================================================
    let confirmation = admin::confirm(&mut conn, &rules, request.id, now + 3600).expect("confirm");
    assert_eq!(confirmation.balance, 0);
    assert!(confirmation.request.is_confirmed);

    let again = admin::confirm(&mut conn, &rules, request.id, now + 7200);
    assert!(matches!(
        again,
        Err(moneytube_economy::EconomyError::Duplicate(_))
    ));
    assert_eq!(balance(&conn, "creator"), 0);

    // =========================================================
    // Audit
    // =========================================================
    assert_eq!(audited_balance(&conn, "creator"), balance(&conn, "creator"));
    for i in [0, VIEWERS / 2, VIEWERS - 1] {
        let viewer = format!("viewer-{i}");
        assert_eq!(balance(&conn, &viewer), rules.video_ad_reward);
        assert_eq!(audited_balance(&conn, &viewer), balance(&conn, &viewer));
    }
}

#[test]
fn rejected_withdrawal_leaves_no_trace() {
    let mut conn = memory_db();
    let rules = rules();
    create_user(&conn, "creator");
    uploads::record_upload(&mut conn, &rules, &new_video("vid-1", "creator", BASE_TIME))
        .expect("upload");
    conn.execute("UPDATE videos SET views = 500 WHERE id = 'vid-1'", [])
        .expect("set views");
    conn.execute("UPDATE profiles SET coins = 75 WHERE id = 'creator'", [])
        .expect("set coins");

    for coins in [0, 15, 80, -10] {
        let result = withdraw::submit(
            &mut conn,
            &rules,
            "creator",
            WithdrawMethod::Bank,
            "001122334455",
            coins,
            BASE_TIME,
        );
        assert!(
            matches!(result, Err(moneytube_economy::EconomyError::Validation(_))),
            "{coins} coins should be rejected"
        );
    }

    assert!(withdraw::list_mine(&conn, "creator").expect("list").is_empty());
    assert_eq!(balance(&conn, "creator"), 75);
}
