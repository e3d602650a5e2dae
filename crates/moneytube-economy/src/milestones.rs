//! View-milestone payouts.
//!
//! A milestone is available on a video once `views >= threshold` and it has
//! not been claimed. Only the owner may claim, and each (video, threshold)
//! pays at most once: the claim row's primary key guarantees it.

use rusqlite::Connection;
use serde::Serialize;

use moneytube_db::queries::videos;
use moneytube_types::reward::Reward;
use moneytube_types::rules::{EconomyRules, Milestone};
use moneytube_types::video::Video;

use crate::{immediate, rewards, EconomyError, Result};

/// Milestones paid out by one claim call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MilestoneClaim {
    pub video_id: String,
    pub claimed: Vec<Milestone>,
    pub coins: i64,
    pub balance: i64,
}

/// Milestones reached on `video` and not yet claimed, lowest first.
pub fn available(rules: &EconomyRules, video: &Video) -> Vec<Milestone> {
    let mut out: Vec<Milestone> = rules
        .milestones
        .iter()
        .copied()
        .filter(|m| video.views >= m.views && !video.milestone_claimed(m.views))
        .collect();
    out.sort_by_key(|m| m.views);
    out
}

/// Claim milestones on `video_id` for its owner.
///
/// With `threshold = None` every available milestone is claimed; the result
/// may be empty. With `Some(t)` exactly that milestone is claimed.
///
/// # Errors
///
/// - [`EconomyError::NotFound`] if the video does not exist
/// - [`EconomyError::Authorization`] if `owner` does not own the video
/// - [`EconomyError::Validation`] if `t` is not a configured milestone or has
///   not been reached
/// - [`EconomyError::Duplicate`] if `t` was already claimed
pub fn claim(
    conn: &mut Connection,
    rules: &EconomyRules,
    owner: &str,
    video_id: &str,
    threshold: Option<u64>,
    now: u64,
) -> Result<MilestoneClaim> {
    let tx = immediate(conn)?;

    let video = videos::get(&tx, video_id)?;
    if video.user_id != owner {
        return Err(EconomyError::Authorization(
            "only the video owner can claim milestones".to_string(),
        ));
    }

    let targets = match threshold {
        None => available(rules, &video),
        Some(t) => {
            let milestone = rules
                .milestone(t)
                .ok_or_else(|| EconomyError::Validation(format!("no milestone at {t} views")))?;
            if video.milestone_claimed(t) {
                return Err(EconomyError::Duplicate(format!(
                    "milestone {t} already claimed"
                )));
            }
            if video.views < t {
                return Err(EconomyError::Validation(format!(
                    "milestone {t} not reached ({} views)",
                    video.views
                )));
            }
            vec![milestone]
        }
    };

    let mut balance = crate::ledger::balance(&tx, owner)?;
    let mut coins = 0;
    for m in &targets {
        if !videos::insert_milestone_claim(&tx, video_id, m.views, now)? {
            return Err(EconomyError::Duplicate(format!(
                "milestone {} already claimed",
                m.views
            )));
        }
        let reward = Reward::VideoMilestone {
            video_id: video_id.to_string(),
            threshold: m.views,
            coins: m.coins,
        };
        balance = rewards::grant(&tx, owner, &reward, now)?;
        coins += m.coins;
    }

    tx.commit()?;

    Ok(MilestoneClaim {
        video_id: video_id.to_string(),
        claimed: targets,
        coins,
        balance,
    })
}
