//! # moneytube-types
//!
//! Shared domain types used across the MoneyTube workspace.
//! Every structure here crosses the JSON-RPC boundary to the web UI, so all of
//! them are `serde` types and most export TypeScript bindings via `ts-rs`.

pub mod profile;
pub mod referral;
pub mod reward;
pub mod rules;
pub mod video;
pub mod withdraw;

/// Common type aliases.
pub type UserId = String;
pub type VideoId = String;
pub type RequestId = i64;
pub type CommentId = i64;

/// Calendar day duration in seconds. Upload quotas are keyed by UTC day.
pub const DAY_SECS: u64 = 86400;

/// UTC epoch day for a unix timestamp.
pub fn epoch_day(unix_secs: u64) -> u64 {
    unix_secs / DAY_SECS
}

/// Current unix time in seconds.
pub fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Error returned when parsing one of the string-encoded enums.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_day_boundaries() {
        assert_eq!(epoch_day(0), 0);
        assert_eq!(epoch_day(DAY_SECS - 1), 0);
        assert_eq!(epoch_day(DAY_SECS), 1);
        assert_eq!(epoch_day(1_700_000_000), 19675);
    }

    #[test]
    #[ignore] // Run manually to generate bindings
    fn export_ts_bindings() {
        use ts_rs::TS;
        let dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../bindings");
        std::fs::create_dir_all(&dir).expect("create bindings dir");
        crate::profile::Profile::export_all_to(&dir).expect("export profile");
        crate::video::Video::export_all_to(&dir).expect("export video");
        crate::reward::Reward::export_all_to(&dir).expect("export reward");
        crate::withdraw::WithdrawRequest::export_all_to(&dir).expect("export withdraw");
        crate::rules::EconomyRules::export_all_to(&dir).expect("export rules");
    }
}
