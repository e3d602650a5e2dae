//! Withdrawal notifications.
//!
//! With `[notifications.smtp]` configured, each notice is mailed to the
//! operator through `lettre`. Otherwise notices are appended as JSON lines to
//! an outbox file. Delivery is best-effort: callers spawn
//! [`Notifier::send`] after the request has committed and only log failures.

use std::path::{Path, PathBuf};

use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use moneytube_types::withdraw::WithdrawRequest;

use crate::config::{DaemonConfig, SmtpConfig};

/// Notification errors.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notifications are disabled")]
    Disabled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid address: {0}")]
    Address(String),

    #[error("SMTP error: {0}")]
    Smtp(String),
}

/// Details sent to the operator for a new withdrawal request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawalNotice {
    pub request_id: i64,
    pub user_id: String,
    pub user_email: String,
    pub method: String,
    pub number: String,
    pub coins: i64,
    /// Display form, e.g. "₹0.10".
    pub payout: String,
    pub created_at: u64,
}

impl WithdrawalNotice {
    pub fn from_request(request: &WithdrawRequest, user_email: &str) -> Self {
        Self {
            request_id: request.id,
            user_id: request.user_id.clone(),
            user_email: user_email.to_string(),
            method: request.method.to_string(),
            number: request.number.clone(),
            coins: request.coins,
            payout: request.payout().to_string(),
            created_at: request.created_at,
        }
    }

    fn subject(&self) -> String {
        format!("Withdrawal request #{}", self.request_id)
    }

    fn body(&self) -> String {
        format!(
            "User: {} ({})\nMethod: {}\nNumber: {}\nCoins: {}\nPayout: {}\nRequested at: {}\n",
            self.user_email,
            self.user_id,
            self.method,
            self.number,
            self.coins,
            self.payout,
            self.created_at,
        )
    }
}

/// Build the operator email for `notice`.
fn notice_email(smtp: &SmtpConfig, notice: &WithdrawalNotice) -> Result<Message, NotifyError> {
    let from = smtp
        .from
        .parse::<Mailbox>()
        .map_err(|e| NotifyError::Address(format!("from {}: {e}", smtp.from)))?;
    let to = smtp
        .to
        .parse::<Mailbox>()
        .map_err(|e| NotifyError::Address(format!("to {}: {e}", smtp.to)))?;
    Message::builder()
        .from(from)
        .to(to)
        .subject(notice.subject())
        .body(notice.body())
        .map_err(|e| NotifyError::Smtp(format!("failed to build email: {e}")))
}

/// Blocking SMTP submission.
fn deliver(smtp: &SmtpConfig, email: &Message) -> Result<(), NotifyError> {
    let mut builder = SmtpTransport::relay(&smtp.server)
        .map_err(|e| NotifyError::Smtp(format!("failed to create transport: {e}")))?
        .port(smtp.port);
    if !smtp.username.is_empty() {
        builder = builder.credentials(Credentials::new(
            smtp.username.clone(),
            smtp.password.clone(),
        ));
    }
    builder
        .build()
        .send(email)
        .map_err(|e| NotifyError::Smtp(format!("failed to send email: {e}")))?;
    Ok(())
}

#[derive(Debug, Clone)]
enum Delivery {
    Outbox(PathBuf),
    Smtp(SmtpConfig),
}

/// Withdrawal notifier.
#[derive(Debug, Clone)]
pub struct Notifier {
    enabled: bool,
    delivery: Delivery,
}

impl Notifier {
    /// Notifier writing to a JSON-lines outbox.
    pub fn new(enabled: bool, outbox: impl Into<PathBuf>) -> Self {
        Self {
            enabled,
            delivery: Delivery::Outbox(outbox.into()),
        }
    }

    /// Notifier mailing through an SMTP relay.
    pub fn smtp(enabled: bool, smtp: SmtpConfig) -> Self {
        Self {
            enabled,
            delivery: Delivery::Smtp(smtp),
        }
    }

    pub fn from_config(config: &DaemonConfig) -> Self {
        let enabled = config.notifications.enabled;
        match &config.notifications.smtp {
            Some(smtp) => Self::smtp(enabled, smtp.clone()),
            None => Self::new(enabled, config.outbox_path()),
        }
    }

    /// Deliver one notice.
    pub async fn send(&self, notice: &WithdrawalNotice) -> Result<(), NotifyError> {
        if !self.enabled {
            return Err(NotifyError::Disabled);
        }
        match &self.delivery {
            Delivery::Outbox(outbox) => append_line(outbox, notice).await?,
            Delivery::Smtp(smtp) => {
                let email = notice_email(smtp, notice)?;
                let smtp = smtp.clone();
                tokio::task::spawn_blocking(move || deliver(&smtp, &email))
                    .await
                    .map_err(|e| NotifyError::Smtp(format!("delivery task failed: {e}")))??;
            }
        }

        tracing::info!(
            request_id = notice.request_id,
            user_id = %notice.user_id,
            "withdrawal notice sent"
        );
        Ok(())
    }

    /// Send in the background. Failures are logged and dropped.
    pub fn spawn_send(&self, notice: WithdrawalNotice) {
        let notifier = self.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.send(&notice).await {
                tracing::warn!(
                    request_id = notice.request_id,
                    error = %e,
                    "withdrawal notice not sent"
                );
            }
        });
    }
}

async fn append_line(outbox: &Path, notice: &WithdrawalNotice) -> Result<(), NotifyError> {
    let mut line = serde_json::to_string(notice)?;
    line.push('\n');

    if let Some(parent) = outbox.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(outbox)
        .await?;
    file.write_all(line.as_bytes()).await?;
    file.flush().await?;
    Ok(())
}
