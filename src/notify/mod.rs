// src/notify/mod.rs
//! Digest delivery. Optional and never fatal: failures become
//! [`NotifyStatus::Failed`] in the run summary.

pub mod email;

use std::fmt;

use tracing::{info, warn};

use crate::config::NotifySettings;
use crate::error::NotifyError;

pub use email::EmailNotifier;

/// A rendered digest ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestMessage {
    pub subject: String,
    pub body: String,
    pub recipients: Vec<String>,
}

#[async_trait::async_trait]
pub trait DigestNotifier: Send + Sync {
    async fn send_digest(&self, msg: &DigestMessage) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyStatus {
    Disabled,
    Sent,
    Failed(String),
}

impl fmt::Display for NotifyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyStatus::Disabled => f.write_str("disabled"),
            NotifyStatus::Sent => f.write_str("sent"),
            NotifyStatus::Failed(reason) => write!(f, "failed ({reason})"),
        }
    }
}

/// Stands in for a notifier that was requested but could not be built, so
/// the failure shows up in the run summary.
pub struct UnavailableNotifier(pub String);

#[async_trait::async_trait]
impl DigestNotifier for UnavailableNotifier {
    async fn send_digest(&self, _msg: &DigestMessage) -> Result<(), NotifyError> {
        Err(NotifyError::NotConfigured(self.0.clone()))
    }
}

/// Hand the digest to `notifier` if one is configured. Never errors.
pub async fn deliver(
    notifier: Option<&dyn DigestNotifier>,
    settings: &NotifySettings,
    digest: &str,
) -> NotifyStatus {
    let Some(notifier) = notifier else {
        return NotifyStatus::Disabled;
    };
    let msg = DigestMessage {
        subject: settings.subject.clone(),
        body: digest.to_string(),
        recipients: settings.recipients.clone(),
    };
    match notifier.send_digest(&msg).await {
        Ok(()) => {
            info!(recipients = msg.recipients.len(), "digest sent");
            NotifyStatus::Sent
        }
        Err(e) => {
            warn!(error = %e, "digest delivery failed");
            NotifyStatus::Failed(e.to_string())
        }
    }
}
