//! Profile and creator statistics.

use serde::{Deserialize, Serialize};

use crate::UserId;

/// A user profile. `coins` is the authoritative balance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct Profile {
    pub id: UserId,
    pub username: Option<String>,
    pub email: String,
    pub avatar_url: Option<String>,
    pub coins: i64,
    pub created_at: u64,
    pub updated_at: u64,
}

/// Progress of a creator toward the withdrawal thresholds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct CreatorStats {
    pub coins: i64,
    pub total_views: u64,
    pub video_count: u32,
    /// Percent of the coin threshold reached, capped at 100.
    pub coins_progress_pct: u8,
    /// Percent of the view threshold reached, capped at 100.
    pub views_progress_pct: u8,
    pub can_withdraw: bool,
}

/// Percentage of `target` reached by `value`, capped at 100.
pub fn progress_pct(value: u64, target: u64) -> u8 {
    if target == 0 {
        return 100;
    }
    let pct = value.saturating_mul(100) / target;
    pct.min(100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_pct() {
        assert_eq!(progress_pct(0, 50), 0);
        assert_eq!(progress_pct(25, 50), 50);
        assert_eq!(progress_pct(999, 1000), 99);
        assert_eq!(progress_pct(5000, 1000), 100);
        assert_eq!(progress_pct(7, 0), 100);
    }
}
