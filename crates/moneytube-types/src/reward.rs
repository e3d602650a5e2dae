//! Reward variants and the audit log row.
//!
//! A [`Reward`] is a closed set of earning events. Each variant carries its
//! coin amount and, where one exists, the video it was earned on. The stored
//! audit log keeps only the discriminator ([`RewardType`]).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{ParseEnumError, UserId, VideoId};

/// A coin grant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(tag = "reward_type", rename_all = "snake_case")]
pub enum Reward {
    /// Completed ad. `video_id` is `None` for the bonus ad.
    AdWatch { video_id: Option<VideoId>, coins: i64 },
    /// View milestone reached on an owned video.
    VideoMilestone {
        video_id: VideoId,
        threshold: u64,
        coins: i64,
    },
    /// Referral code used at account creation (either side of the split).
    Signup { coins: i64 },
    /// Referral code redeemed after signup.
    ReferralPage { coins: i64 },
}

impl Reward {
    pub fn coins(&self) -> i64 {
        match self {
            Reward::AdWatch { coins, .. }
            | Reward::VideoMilestone { coins, .. }
            | Reward::Signup { coins }
            | Reward::ReferralPage { coins } => *coins,
        }
    }

    pub fn video_id(&self) -> Option<&str> {
        match self {
            Reward::AdWatch { video_id, .. } => video_id.as_deref(),
            Reward::VideoMilestone { video_id, .. } => Some(video_id),
            Reward::Signup { .. } | Reward::ReferralPage { .. } => None,
        }
    }

    pub fn reward_type(&self) -> RewardType {
        match self {
            Reward::AdWatch { .. } => RewardType::AdWatch,
            Reward::VideoMilestone { .. } => RewardType::VideoMilestone,
            Reward::Signup { .. } => RewardType::Signup,
            Reward::ReferralPage { .. } => RewardType::ReferralPage,
        }
    }
}

/// Stored discriminator of a [`Reward`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RewardType {
    AdWatch,
    VideoMilestone,
    Signup,
    ReferralPage,
}

impl RewardType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RewardType::AdWatch => "ad_watch",
            RewardType::VideoMilestone => "video_milestone",
            RewardType::Signup => "signup",
            RewardType::ReferralPage => "referral_page",
        }
    }
}

impl fmt::Display for RewardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RewardType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ad_watch" => Ok(RewardType::AdWatch),
            "video_milestone" => Ok(RewardType::VideoMilestone),
            "signup" => Ok(RewardType::Signup),
            "referral_page" => Ok(RewardType::ReferralPage),
            other => Err(ParseEnumError {
                kind: "reward type",
                value: other.to_string(),
            }),
        }
    }
}

/// One row of the reward audit log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct RewardRecord {
    pub id: i64,
    pub user_id: UserId,
    pub video_id: Option<VideoId>,
    pub reward_type: RewardType,
    pub coins_earned: i64,
    pub created_at: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reward_accessors() {
        let r = Reward::VideoMilestone {
            video_id: "v1".to_string(),
            threshold: 1000,
            coins: 50,
        };
        assert_eq!(r.coins(), 50);
        assert_eq!(r.video_id(), Some("v1"));
        assert_eq!(r.reward_type(), RewardType::VideoMilestone);

        let bonus = Reward::AdWatch {
            video_id: None,
            coins: 1,
        };
        assert_eq!(bonus.video_id(), None);
        assert_eq!(bonus.reward_type().as_str(), "ad_watch");
    }

    #[test]
    fn test_reward_type_parse() {
        for t in [
            RewardType::AdWatch,
            RewardType::VideoMilestone,
            RewardType::Signup,
            RewardType::ReferralPage,
        ] {
            assert_eq!(t.as_str().parse::<RewardType>(), Ok(t));
        }
        assert!("jackpot".parse::<RewardType>().is_err());
    }

    #[test]
    fn test_reward_serializes_tagged() {
        let r = Reward::ReferralPage { coins: 60 };
        let json = serde_json::to_value(&r).expect("serialize");
        assert_eq!(json["reward_type"], "referral_page");
        assert_eq!(json["coins"], 60);
    }
}
