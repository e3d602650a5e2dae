//! Withdrawal requests, payout conversion and eligibility.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{ParseEnumError, RequestId, UserId};

/// Payout channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawMethod {
    /// Paytm / UPI wallet number.
    Paytm,
    /// Bank account number.
    Bank,
}

impl WithdrawMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawMethod::Paytm => "paytm",
            WithdrawMethod::Bank => "bank",
        }
    }
}

impl fmt::Display for WithdrawMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WithdrawMethod {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "paytm" => Ok(WithdrawMethod::Paytm),
            "bank" => Ok(WithdrawMethod::Bank),
            other => Err(ParseEnumError {
                kind: "withdraw method",
                value: other.to_string(),
            }),
        }
    }
}

/// A payout amount in paise (1/100 rupee).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Payout(pub i64);

impl Payout {
    /// Convert a coin amount at `coins_per_paisa` (10 coins = ₹0.01).
    pub fn from_coins(coins: i64, coins_per_paisa: i64) -> Self {
        if coins_per_paisa <= 0 {
            return Payout(0);
        }
        Payout(coins / coins_per_paisa)
    }

    pub fn paise(&self) -> i64 {
        self.0
    }

    pub fn as_rupees(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl fmt::Display for Payout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "₹{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

/// A withdrawal request awaiting or past admin confirmation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct WithdrawRequest {
    pub id: RequestId,
    pub user_id: UserId,
    pub method: WithdrawMethod,
    /// Paytm number or bank account number.
    pub number: String,
    pub coins: i64,
    pub payout_paise: i64,
    pub is_confirmed: bool,
    pub created_at: u64,
    pub confirmed_at: Option<u64>,
}

impl WithdrawRequest {
    pub fn payout(&self) -> Payout {
        Payout(self.payout_paise)
    }
}

/// Withdrawal eligibility snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct Eligibility {
    pub eligible: bool,
    pub coins: i64,
    pub total_views: u64,
    pub min_coins: i64,
    pub min_views: u64,
}

/// Admin view of all requests, each partition newest first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct WithdrawalQueue {
    pub pending: Vec<WithdrawRequest>,
    pub confirmed: Vec<WithdrawRequest>,
}
