//! SQL schema definitions.

/// Complete schema for the MoneyTube v1 database.
pub const SCHEMA_V1: &str = r#"
-- ============================================================
-- Accounts & Profiles
-- ============================================================

CREATE TABLE IF NOT EXISTS accounts (
    user_id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    password_salt BLOB NOT NULL,
    password_hash BLOB NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS profiles (
    id TEXT PRIMARY KEY REFERENCES accounts(user_id) ON DELETE CASCADE,
    username TEXT,
    email TEXT NOT NULL,
    avatar_url TEXT,
    coins INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

-- ============================================================
-- Videos & Views
-- ============================================================

CREATE TABLE IF NOT EXISTS videos (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES profiles(id),
    title TEXT NOT NULL,
    description TEXT,
    video_url TEXT NOT NULL,
    video_key TEXT NOT NULL,
    thumbnail_url TEXT,
    thumbnail_key TEXT,
    views INTEGER NOT NULL DEFAULT 0 CHECK (views >= 0),
    duration INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_videos_owner ON videos(user_id);
CREATE INDEX IF NOT EXISTS idx_videos_created ON videos(created_at);

CREATE TABLE IF NOT EXISTS milestone_claims (
    video_id TEXT NOT NULL REFERENCES videos(id) ON DELETE CASCADE,
    threshold INTEGER NOT NULL,
    claimed_at INTEGER NOT NULL,
    PRIMARY KEY (video_id, threshold)
);

CREATE TABLE IF NOT EXISTS ad_watches (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL REFERENCES profiles(id),
    video_id TEXT NOT NULL REFERENCES videos(id) ON DELETE CASCADE,
    reward_given INTEGER NOT NULL DEFAULT 0,
    watched_at INTEGER NOT NULL,
    UNIQUE (user_id, video_id)
);

-- ============================================================
-- Rewards & Quotas
-- ============================================================

-- Audit log. video_id carries no foreign key so rows outlive deleted videos.
CREATE TABLE IF NOT EXISTS user_rewards (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL REFERENCES profiles(id),
    video_id TEXT,
    reward_type TEXT NOT NULL,
    coins_earned INTEGER NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_rewards_user ON user_rewards(user_id, created_at);

CREATE TABLE IF NOT EXISTS daily_uploads (
    user_id TEXT NOT NULL REFERENCES profiles(id),
    upload_date INTEGER NOT NULL,
    upload_count INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (user_id, upload_date)
);

-- ============================================================
-- Referrals
-- ============================================================

CREATE TABLE IF NOT EXISTS referral_codes (
    user_id TEXT PRIMARY KEY REFERENCES profiles(id),
    code TEXT NOT NULL UNIQUE,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS referral_usage (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    referrer_id TEXT NOT NULL REFERENCES profiles(id),
    referred_id TEXT NOT NULL UNIQUE REFERENCES profiles(id),
    reward_type TEXT NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_referral_referrer ON referral_usage(referrer_id);

-- ============================================================
-- Withdrawals
-- ============================================================

CREATE TABLE IF NOT EXISTS withdraw_requests (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL REFERENCES profiles(id),
    method TEXT NOT NULL,
    number TEXT NOT NULL,
    coins INTEGER NOT NULL CHECK (coins > 0),
    payout_paise INTEGER NOT NULL,
    is_confirmed INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL,
    confirmed_at INTEGER
);

CREATE INDEX IF NOT EXISTS idx_withdraw_created ON withdraw_requests(created_at);

-- ============================================================
-- Comments
-- ============================================================

CREATE TABLE IF NOT EXISTS comments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    video_id TEXT NOT NULL REFERENCES videos(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL REFERENCES profiles(id),
    content TEXT NOT NULL,
    likes_count INTEGER NOT NULL DEFAULT 0 CHECK (likes_count >= 0),
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_comments_video ON comments(video_id, created_at);

CREATE TABLE IF NOT EXISTS comment_likes (
    comment_id INTEGER NOT NULL REFERENCES comments(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL REFERENCES profiles(id),
    created_at INTEGER NOT NULL,
    PRIMARY KEY (comment_id, user_id)
);
"#;
