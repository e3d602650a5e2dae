//! Configuration file management.
//!
//! Read from `$MONEYTUBE_DATA_DIR/config.toml`. A missing file, table or
//! field falls back to its default.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use moneytube_types::rules::EconomyRules;

/// Environment variable naming the data directory.
pub const DATA_DIR_ENV: &str = "MONEYTUBE_DATA_DIR";

/// Complete daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Identity settings.
    #[serde(default)]
    pub identity: IdentityConfig,
    /// Reserved admin account.
    #[serde(default)]
    pub admin: AdminConfig,
    /// Economy rules.
    #[serde(default)]
    pub economy: EconomyRules,
    /// Withdrawal notifications.
    #[serde(default)]
    pub notifications: NotificationsConfig,
    /// Advanced settings.
    #[serde(default)]
    pub advanced: AdvancedConfig,
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory. Empty = platform default.
    #[serde(default)]
    pub data_dir: String,
    /// Object store root. Empty = $data_dir/media/.
    #[serde(default)]
    pub media_dir: String,
    /// URL prefix under which stored objects are served.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
    /// Largest accepted video upload.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
}

/// Identity configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Idle time after which a session token expires.
    #[serde(default = "default_session_timeout")]
    pub session_timeout_minutes: u32,
    #[serde(default = "default_min_password_len")]
    pub min_password_len: usize,
}

/// Admin configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// The account with this email is the administrator.
    #[serde(default = "default_admin_email")]
    pub email: String,
    /// If set, the admin account is created at startup when missing.
    #[serde(default)]
    pub password: String,
}

/// Notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// JSON-lines outbox. Empty = $data_dir/outbox.jsonl.
    #[serde(default)]
    pub outbox_file: String,
    /// SMTP relay. When present, notices are mailed instead of written to
    /// the outbox.
    #[serde(default)]
    pub smtp: Option<SmtpConfig>,
}

/// SMTP relay settings for withdrawal notices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub server: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    /// Empty = no authentication.
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Sender mailbox, e.g. "MoneyTube <noreply@moneytube.local>".
    pub from: String,
    /// Operator mailbox that reviews withdrawals.
    pub to: String,
}

/// Advanced configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedConfig {
    /// Log level: "debug" | "info" | "warn" | "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log file path. Empty = stderr.
    #[serde(default)]
    pub log_file: String,
    /// Longest JSON-RPC request line accepted, in bytes. Bounds inline
    /// (base64) uploads; larger videos are uploaded by `source_path`.
    #[serde(default = "default_max_request_bytes")]
    pub max_request_bytes: u64,
}

// Default value functions

fn default_public_base_url() -> String {
    "http://localhost:8080/media".to_string()
}

fn default_max_upload_bytes() -> u64 {
    5 * 1024 * 1024 * 1024
}

fn default_session_timeout() -> u32 {
    60
}

fn default_min_password_len() -> usize {
    6
}

fn default_admin_email() -> String {
    "admin@moneytube.local".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_request_bytes() -> u64 {
    64 * 1024 * 1024
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: String::new(),
            media_dir: String::new(),
            public_base_url: default_public_base_url(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            session_timeout_minutes: default_session_timeout(),
            min_password_len: default_min_password_len(),
        }
    }
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            email: default_admin_email(),
            password: String::new(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            outbox_file: String::new(),
            smtp: None,
        }
    }
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_file: String::new(),
            max_request_bytes: default_max_request_bytes(),
        }
    }
}

impl DaemonConfig {
    /// Load configuration from the default config file location.
    ///
    /// Falls back to defaults if file does not exist.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: DaemonConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Get the data directory path.
    pub fn data_dir(&self) -> PathBuf {
        if self.storage.data_dir.is_empty() {
            Self::default_data_dir()
        } else {
            PathBuf::from(&self.storage.data_dir)
        }
    }

    /// Root directory of the local object store.
    pub fn media_dir(&self) -> PathBuf {
        if self.storage.media_dir.is_empty() {
            self.data_dir().join("media")
        } else {
            PathBuf::from(&self.storage.media_dir)
        }
    }

    /// Path of the notification outbox.
    pub fn outbox_path(&self) -> PathBuf {
        if self.notifications.outbox_file.is_empty() {
            self.data_dir().join("outbox.jsonl")
        } else {
            PathBuf::from(&self.notifications.outbox_file)
        }
    }

    /// Session idle timeout in seconds.
    pub fn session_timeout_secs(&self) -> u64 {
        u64::from(self.identity.session_timeout_minutes) * 60
    }

    /// Whether `email` is the reserved admin address.
    pub fn is_admin_email(&self, email: &str) -> bool {
        email.eq_ignore_ascii_case(self.admin.email.trim())
    }

    /// Get the config file path.
    fn config_path() -> PathBuf {
        Self::default_data_dir().join("config.toml")
    }

    /// Platform-specific default data directory.
    fn default_data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            return PathBuf::from(dir);
        }
        #[cfg(target_os = "macos")]
        {
            dirs_fallback("Library/Application Support/MoneyTube")
        }
        #[cfg(not(target_os = "macos"))]
        {
            dirs_fallback(".moneytube")
        }
    }
}

/// Fallback home directory resolution.
fn dirs_fallback(subpath: &str) -> PathBuf {
    std::env::var("HOME")
        .map(|h| PathBuf::from(h).join(subpath))
        .unwrap_or_else(|_| PathBuf::from("/tmp/moneytube"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DaemonConfig::default();
        assert_eq!(config.identity.session_timeout_minutes, 60);
        assert_eq!(config.session_timeout_secs(), 3600);
        assert_eq!(config.storage.max_upload_bytes, 5 * 1024 * 1024 * 1024);
        assert_eq!(config.economy.upload_quota_per_day, 10);
        assert!(config.notifications.enabled);
        assert!(config.admin.password.is_empty());
        assert_eq!(config.advanced.max_request_bytes, 64 * 1024 * 1024);
    }

    #[test]
    fn test_config_serialization() {
        let config = DaemonConfig::default();
        let toml_str = toml::to_string(&config).expect("serialize");
        let parsed: DaemonConfig = toml::from_str(&toml_str).expect("parse");
        assert_eq!(parsed.economy, config.economy);
    }

    #[test]
    fn test_partial_toml() {
        let config: DaemonConfig = toml::from_str(
            r#"
            [storage]
            data_dir = "/srv/moneytube"

            [economy]
            upload_quota_per_day = 3
            view_count_policy = "every_visit"

            [[economy.milestones]]
            views = 50
            coins = 5
            "#,
        )
        .expect("parse");
        assert_eq!(config.data_dir(), PathBuf::from("/srv/moneytube"));
        assert_eq!(config.media_dir(), PathBuf::from("/srv/moneytube/media"));
        assert_eq!(config.outbox_path(), PathBuf::from("/srv/moneytube/outbox.jsonl"));
        assert_eq!(config.economy.upload_quota_per_day, 3);
        assert_eq!(config.economy.milestones.len(), 1);
        assert_eq!(config.economy.min_withdraw_coins, 50);
        assert_eq!(config.identity.min_password_len, 6);
    }

    #[test]
    fn test_smtp_section() {
        let config: DaemonConfig = toml::from_str(
            r#"
            [notifications.smtp]
            server = "smtp.example.com"
            from = "MoneyTube <noreply@example.com>"
            to = "payouts@example.com"
            "#,
        )
        .expect("parse");
        let smtp = config.notifications.smtp.expect("smtp");
        assert_eq!(smtp.port, 587);
        assert!(smtp.username.is_empty());
        assert!(config.notifications.enabled);
        assert!(DaemonConfig::default().notifications.smtp.is_none());
    }

    #[test]
    fn test_admin_email_match() {
        let config = DaemonConfig::default();
        assert!(config.is_admin_email("ADMIN@moneytube.local"));
        assert!(!config.is_admin_email("someone@moneytube.local"));
    }
}
