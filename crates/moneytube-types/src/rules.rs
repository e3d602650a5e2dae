//! Economy rules: thresholds, rates and bonus amounts.
//!
//! Loaded from the `[economy]` table of the daemon config. Every field has a
//! default, so an empty table yields the production rule set.

use serde::{Deserialize, Serialize};

/// A view-count milestone and its one-time reward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct Milestone {
    pub views: u64,
    pub coins: i64,
}

/// How a referral bonus is split between the two parties.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct ReferralSplit {
    pub referrer: i64,
    pub referred: i64,
}

/// When an unlocked, non-owner open of a video counts as a view.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ViewCountPolicy {
    /// Only the open that first satisfies the ad gate counts.
    #[default]
    FirstUnlock,
    /// Every unlocked open counts.
    EveryVisit,
}

/// What admin confirmation does when the live balance is below the
/// amount recorded on the request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmPolicy {
    /// Debit the recorded amount regardless. The balance may go negative.
    #[default]
    LockedAmount,
    /// Refuse to confirm until the balance covers the recorded amount.
    LiveBalance,
}

/// Complete economy rule set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct EconomyRules {
    #[serde(default = "default_upload_quota")]
    pub upload_quota_per_day: u32,
    #[serde(default = "default_milestones")]
    pub milestones: Vec<Milestone>,
    #[serde(default = "default_min_withdraw_coins")]
    pub min_withdraw_coins: i64,
    #[serde(default = "default_min_withdraw_views")]
    pub min_withdraw_views: u64,
    /// Withdrawals must be a positive multiple of this many coins.
    #[serde(default = "default_withdraw_unit")]
    pub withdraw_unit_coins: i64,
    /// Coins per paisa (10 coins = ₹0.01).
    #[serde(default = "default_coins_per_paisa")]
    pub coins_per_paisa: i64,
    #[serde(default = "default_video_ad_reward")]
    pub video_ad_reward: i64,
    #[serde(default = "default_bonus_ad_reward")]
    pub bonus_ad_reward: i64,
    #[serde(default = "default_signup_referral")]
    pub signup_referral: ReferralSplit,
    #[serde(default = "default_later_referral")]
    pub later_referral: ReferralSplit,
    #[serde(default = "default_referral_code_length")]
    pub referral_code_length: usize,
    #[serde(default = "default_video_ad_secs")]
    pub video_ad_secs: u64,
    #[serde(default = "default_bonus_ad_secs")]
    pub bonus_ad_secs: u64,
    #[serde(default = "default_upload_ad_secs")]
    pub upload_ad_secs: u64,
    #[serde(default)]
    pub view_count_policy: ViewCountPolicy,
    #[serde(default)]
    pub confirm_policy: ConfirmPolicy,
}

// Default value functions

fn default_upload_quota() -> u32 {
    10
}

fn default_milestones() -> Vec<Milestone> {
    vec![
        Milestone {
            views: 100,
            coins: 10,
        },
        Milestone {
            views: 1000,
            coins: 50,
        },
        Milestone {
            views: 10000,
            coins: 200,
        },
    ]
}

fn default_min_withdraw_coins() -> i64 {
    50
}

fn default_min_withdraw_views() -> u64 {
    1000
}

fn default_withdraw_unit() -> i64 {
    10
}

fn default_coins_per_paisa() -> i64 {
    10
}

fn default_video_ad_reward() -> i64 {
    5
}

fn default_bonus_ad_reward() -> i64 {
    1
}

fn default_signup_referral() -> ReferralSplit {
    ReferralSplit {
        referrer: 40,
        referred: 10,
    }
}

fn default_later_referral() -> ReferralSplit {
    ReferralSplit {
        referrer: 0,
        referred: 60,
    }
}

fn default_referral_code_length() -> usize {
    8
}

fn default_video_ad_secs() -> u64 {
    10
}

fn default_bonus_ad_secs() -> u64 {
    5
}

fn default_upload_ad_secs() -> u64 {
    10
}

impl Default for EconomyRules {
    fn default() -> Self {
        Self {
            upload_quota_per_day: default_upload_quota(),
            milestones: default_milestones(),
            min_withdraw_coins: default_min_withdraw_coins(),
            min_withdraw_views: default_min_withdraw_views(),
            withdraw_unit_coins: default_withdraw_unit(),
            coins_per_paisa: default_coins_per_paisa(),
            video_ad_reward: default_video_ad_reward(),
            bonus_ad_reward: default_bonus_ad_reward(),
            signup_referral: default_signup_referral(),
            later_referral: default_later_referral(),
            referral_code_length: default_referral_code_length(),
            video_ad_secs: default_video_ad_secs(),
            bonus_ad_secs: default_bonus_ad_secs(),
            upload_ad_secs: default_upload_ad_secs(),
            view_count_policy: ViewCountPolicy::default(),
            confirm_policy: ConfirmPolicy::default(),
        }
    }
}

impl EconomyRules {
    /// Look up the milestone configured at `threshold` views.
    pub fn milestone(&self, threshold: u64) -> Option<Milestone> {
        self.milestones.iter().copied().find(|m| m.views == threshold)
    }
}
