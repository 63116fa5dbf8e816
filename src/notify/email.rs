// src/notify/email.rs
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};

use super::{DigestMessage, DigestNotifier};
use crate::error::NotifyError;

/// SMTP settings, read from the environment only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpConfig {
    pub host: String,
    pub port: Option<u16>,
    pub user: String,
    pub pass: String,
    pub from: String,
    /// `NOTIFY_EMAIL_TO`, comma-separated. Overrides `[notify].recipients`.
    pub to: Vec<String>,
}

impl SmtpConfig {
    pub fn from_env() -> Result<Self, NotifyError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup<F: Fn(&str) -> Option<String>>(get: F) -> Result<Self, NotifyError> {
        let req = |k: &str| {
            get(k)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| NotifyError::NotConfigured(format!("{k} missing")))
        };
        let port = match get("SMTP_PORT") {
            Some(p) if !p.trim().is_empty() => Some(
                p.trim()
                    .parse::<u16>()
                    .map_err(|_| NotifyError::NotConfigured(format!("invalid SMTP_PORT `{p}`")))?,
            ),
            _ => None,
        };
        Ok(Self {
            host: req("SMTP_HOST")?,
            port,
            user: req("SMTP_USER")?,
            pass: req("SMTP_PASS")?,
            from: req("NOTIFY_EMAIL_FROM")?,
            to: get("NOTIFY_EMAIL_TO")
                .map(|s| split_recipients(&s))
                .unwrap_or_default(),
        })
    }
}

fn split_recipients(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|x| !x.is_empty())
        .map(str::to_string)
        .collect()
}

fn mailbox(addr: &str) -> Result<Mailbox, NotifyError> {
    addr.parse()
        .map_err(|e| NotifyError::Build(format!("invalid address `{addr}`: {e}")))
}

pub struct EmailNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Vec<String>,
}

impl EmailNotifier {
    pub fn new(cfg: SmtpConfig) -> Result<Self, NotifyError> {
        let creds = Credentials::new(cfg.user, cfg.pass);
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.host)
            .map_err(|e| NotifyError::NotConfigured(format!("invalid SMTP_HOST: {e}")))?
            .credentials(creds);
        if let Some(port) = cfg.port {
            builder = builder.port(port);
        }
        Ok(Self {
            mailer: builder.build(),
            from: mailbox(&cfg.from)?,
            to: cfg.to,
        })
    }

    pub fn from_env() -> Result<Self, NotifyError> {
        Self::new(SmtpConfig::from_env()?)
    }

    fn build_message(&self, msg: &DigestMessage) -> Result<Message, NotifyError> {
        let recipients = if self.to.is_empty() {
            &msg.recipients
        } else {
            &self.to
        };
        if recipients.is_empty() {
            return Err(NotifyError::NotConfigured("no recipients".into()));
        }
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(msg.subject.clone())
            .header(header::ContentType::TEXT_PLAIN);
        for r in recipients {
            builder = builder.to(mailbox(r)?);
        }
        builder
            .body(msg.body.clone())
            .map_err(|e| NotifyError::Build(e.to_string()))
    }
}

#[async_trait::async_trait]
impl DigestNotifier for EmailNotifier {
    async fn send_digest(&self, msg: &DigestMessage) -> Result<(), NotifyError> {
        let email = self.build_message(msg)?;
        self.mailer
            .send(email)
            .await
            .map_err(|e| NotifyError::Send(e.to_string()))?;
        Ok(())
    }
}
