//! Video, playback and comment structures.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{CommentId, UserId, VideoId};

/// A published video.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct Video {
    pub id: VideoId,
    pub user_id: UserId,
    pub title: String,
    pub description: Option<String>,
    pub video_url: String,
    pub thumbnail_url: Option<String>,
    pub views: u64,
    /// Duration in seconds.
    pub duration: u32,
    /// Milestone threshold -> claimed.
    pub milestone_rewards_claimed: BTreeMap<u64, bool>,
    pub created_at: u64,
    pub updated_at: u64,
}

impl Video {
    /// Whether the milestone at `threshold` has already paid out.
    pub fn milestone_claimed(&self, threshold: u64) -> bool {
        self.milestone_rewards_claimed
            .get(&threshold)
            .copied()
            .unwrap_or(false)
    }
}

/// A feed entry: a video plus its owner's display fields.
#[derive(Clone, Debug, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct FeedVideo {
    #[serde(flatten)]
    pub video: Video,
    pub owner_username: Option<String>,
    pub owner_avatar_url: Option<String>,
}

/// Result of opening a video for playback.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PlaybackAccess {
    /// Playback allowed. `views` is the counter after any increment.
    Unlocked { views: u64 },
    /// The viewer must complete the unlock ad first.
    AdRequired,
}

/// A comment as shown under a video.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct Comment {
    pub id: CommentId,
    pub video_id: VideoId,
    pub user_id: UserId,
    pub content: String,
    pub likes_count: u32,
    pub username: Option<String>,
    pub avatar_url: Option<String>,
    /// Whether the requesting user has liked this comment.
    pub user_has_liked: bool,
    pub created_at: u64,
}
