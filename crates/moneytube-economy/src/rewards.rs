//! Reward grants.
//!
//! [`grant`] is the single path that turns a [`Reward`] into coins: one audit
//! row plus one ledger adjustment, on the caller's transaction. The
//! workflows here wrap it with the exactly-once checks each earning event
//! needs.

use rusqlite::Connection;
use serde::Serialize;

use moneytube_db::queries::{ad_watches, rewards, videos};
use moneytube_types::reward::{Reward, RewardRecord};
use moneytube_types::rules::EconomyRules;
use moneytube_types::video::PlaybackAccess;

use crate::{immediate, ledger, EconomyError, Result};

/// Result of completing the unlock ad on a video.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VideoAdOutcome {
    /// Coins granted by this completion. Zero on a repeat watch.
    pub granted: i64,
    pub balance: i64,
    pub access: PlaybackAccess,
}

/// Record `reward` for `user_id`: append the audit row, then adjust the
/// balance. Returns the new balance.
///
/// Must run inside the caller's transaction so both writes commit together.
pub fn grant(conn: &Connection, user_id: &str, reward: &Reward, now: u64) -> Result<i64> {
    let coins = reward.coins();
    rewards::insert(
        conn,
        user_id,
        reward.video_id(),
        reward.reward_type(),
        coins,
        now,
    )?;
    let balance = ledger::adjust(conn, user_id, coins, now)?;

    tracing::info!(
        user_id,
        reward_type = %reward.reward_type(),
        video_id = reward.video_id(),
        coins,
        balance,
        "coins granted"
    );
    Ok(balance)
}

/// Complete the unlock ad for `video_id`.
///
/// The first completion per (viewer, video) records the ad watch, grants
/// the video ad reward and counts one view. Later completions unlock
/// playback without granting or counting anything.
///
/// # Errors
///
/// - [`EconomyError::NotFound`] if the video does not exist
/// - [`EconomyError::Authorization`] if the viewer owns the video
pub fn complete_video_ad(
    conn: &mut Connection,
    rules: &EconomyRules,
    viewer: &str,
    video_id: &str,
    now: u64,
) -> Result<VideoAdOutcome> {
    let tx = immediate(conn)?;

    let video = videos::get(&tx, video_id)?;
    if video.user_id == viewer {
        return Err(EconomyError::Authorization(
            "owners cannot earn from their own videos".to_string(),
        ));
    }

    let first = ad_watches::insert_if_absent(&tx, viewer, video_id, true, now)?;
    let outcome = if first {
        let reward = Reward::AdWatch {
            video_id: Some(video_id.to_string()),
            coins: rules.video_ad_reward,
        };
        let balance = grant(&tx, viewer, &reward, now)?;
        let views = videos::increment_views(&tx, video_id, now)?;
        VideoAdOutcome {
            granted: rules.video_ad_reward,
            balance,
            access: PlaybackAccess::Unlocked { views },
        }
    } else {
        tracing::debug!(user_id = viewer, video_id, "ad already watched, no grant");
        VideoAdOutcome {
            granted: 0,
            balance: ledger::balance(&tx, viewer)?,
            access: PlaybackAccess::Unlocked { views: video.views },
        }
    };

    tx.commit()?;
    Ok(outcome)
}

/// Grant the bonus ad reward. Repeatable once per completed ad session.
pub fn claim_bonus_ad(
    conn: &mut Connection,
    rules: &EconomyRules,
    user_id: &str,
    now: u64,
) -> Result<i64> {
    let tx = immediate(conn)?;
    let reward = Reward::AdWatch {
        video_id: None,
        coins: rules.bonus_ad_reward,
    };
    let balance = grant(&tx, user_id, &reward, now)?;
    tx.commit()?;
    Ok(balance)
}

/// Reward history of `user_id`, newest first.
pub fn history(conn: &Connection, user_id: &str, limit: u32) -> Result<Vec<RewardRecord>> {
    Ok(rewards::list_by_user(conn, user_id, limit)?)
}
