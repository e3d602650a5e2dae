//! Referral program structures.

use serde::{Deserialize, Serialize};

use crate::reward::RewardType;
use crate::UserId;

/// When a referral code is redeemed. Each phase pays a different split.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ReferralPhase {
    /// Code supplied while creating the account.
    Signup,
    /// Code entered later from the referral page.
    Later,
}

impl ReferralPhase {
    /// Discriminator recorded on the usage row and on the referred user's
    /// reward.
    pub fn reward_type(&self) -> RewardType {
        match self {
            ReferralPhase::Signup => RewardType::Signup,
            ReferralPhase::Later => RewardType::ReferralPage,
        }
    }
}

/// Outcome of a successful redemption.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct ReferralOutcome {
    pub referrer_id: UserId,
    pub referred_id: UserId,
    pub phase: ReferralPhase,
    pub referrer_coins: i64,
    pub referred_coins: i64,
    /// Referred user's balance after the grant.
    pub referred_balance: i64,
}
