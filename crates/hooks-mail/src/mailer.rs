//! Mail Delivery
//!
//! `MailSender` abstracts the transport: SMTP via lettre in production, an
//! in-memory outbox in development and tests.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::error::{MailError, Result};

/// A validated address with an optional display name
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mailbox {
    pub name: Option<String>,
    pub address: String,
}

impl Mailbox {
    pub fn new(address: &str, name: Option<&str>) -> Result<Self> {
        let address = address.trim();
        lettre::Address::from_str(address).map_err(|e| MailError::Address {
            address: address.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            name: name.map(str::trim).filter(|n| !n.is_empty()).map(String::from),
            address: address.to_string(),
        })
    }

    fn to_lettre(&self) -> Result<lettre::message::Mailbox> {
        let address = lettre::Address::from_str(&self.address).map_err(|e| MailError::Address {
            address: self.address.clone(),
            reason: e.to_string(),
        })?;
        Ok(lettre::message::Mailbox::new(self.name.clone(), address))
    }
}

/// An HTML email
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub from: Mailbox,
    pub to: Vec<Mailbox>,
    pub subject: String,
    pub html: String,
}

/// Mail transport trait
#[async_trait]
pub trait MailSender: Send + Sync {
    /// Deliver one message
    async fn send(&self, message: &EmailMessage) -> Result<()>;

    /// Transport name
    fn name(&self) -> &str;
}

/// SMTP connection security
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SmtpTls {
    /// Implicit TLS (port 465)
    Tls,
    /// STARTTLS upgrade (port 587)
    #[default]
    StartTls,
    /// Plain text, local relays only
    None,
}

impl FromStr for SmtpTls {
    type Err = MailError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tls" | "ssl" => Ok(Self::Tls),
            "starttls" => Ok(Self::StartTls),
            "none" | "plain" => Ok(Self::None),
            other => Err(MailError::Config(format!("unknown SMTP_TLS mode '{other}'"))),
        }
    }
}

/// SMTP server settings
#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub tls: SmtpTls,
    pub timeout: Duration,
}

impl SmtpConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 587,
            username: None,
            password: None,
            tls: SmtpTls::StartTls,
            timeout: Duration::from_secs(10),
        }
    }
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("tls", &self.tls)
            .finish()
    }
}

/// SMTP mail sender
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let builder = match config.tls {
            SmtpTls::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| MailError::Config(e.to_string()))?,
            SmtpTls::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| MailError::Config(e.to_string()))?,
            SmtpTls::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host),
        };

        let mut builder = builder.port(config.port).timeout(Some(config.timeout));
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
        })
    }

    fn build_message(message: &EmailMessage) -> Result<Message> {
        let mut builder = Message::builder()
            .from(message.from.to_lettre()?)
            .subject(message.subject.clone())
            .header(ContentType::TEXT_HTML);
        for recipient in &message.to {
            builder = builder.to(recipient.to_lettre()?);
        }

        builder
            .body(message.html.clone())
            .map_err(|e| MailError::Build(e.to_string()))
    }
}

#[async_trait]
impl MailSender for SmtpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        let email = Self::build_message(message)?;
        self.transport
            .send(email)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;
        Ok(())
    }

    fn name(&self) -> &str {
        "smtp"
    }
}

/// In-memory outbox (for development and tests)
#[derive(Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<EmailMessage>>,
    failures_remaining: AtomicUsize,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` sends with a transport error
    pub fn failing_first(count: usize) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failures_remaining: AtomicUsize::new(count),
        }
    }

    /// Messages delivered so far
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl MailSender for MemoryMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        let failing = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(MailError::Transport("simulated outage".into()));
        }

        self.sent
            .lock()
            .map_err(|_| MailError::Transport("outbox lock poisoned".into()))?
            .push(message.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> EmailMessage {
        EmailMessage {
            from: Mailbox::new("shop@example.com", Some("Cake Shop")).unwrap(),
            to: vec![Mailbox::new("owner@example.com", None).unwrap()],
            subject: "New Record Created - inquiry".into(),
            html: "<h1>Hi</h1>".into(),
        }
    }

    #[test]
    fn test_mailbox_validation() {
        assert!(Mailbox::new("not-an-address", None).is_err());
        let mailbox = Mailbox::new(" owner@example.com ", Some("  ")).unwrap();
        assert_eq!(mailbox.address, "owner@example.com");
        assert_eq!(mailbox.name, None);
    }

    #[test]
    fn test_build_message() {
        assert!(SmtpMailer::build_message(&message()).is_ok());
    }

    #[test]
    fn test_smtp_tls_parse() {
        assert_eq!("STARTTLS".parse::<SmtpTls>().unwrap(), SmtpTls::StartTls);
        assert_eq!("ssl".parse::<SmtpTls>().unwrap(), SmtpTls::Tls);
        assert!("maybe".parse::<SmtpTls>().is_err());
    }

    #[tokio::test]
    async fn test_smtp_mailer_builds_without_connecting() {
        let mut config = SmtpConfig::new("localhost");
        config.tls = SmtpTls::None;
        config.port = 2525;
        assert!(SmtpMailer::new(&config).is_ok());
    }

    #[tokio::test]
    async fn test_memory_mailer_failures_then_success() {
        let mailer = MemoryMailer::failing_first(2);
        assert!(mailer.send(&message()).await.is_err());
        assert!(mailer.send(&message()).await.is_err());
        assert!(mailer.send(&message()).await.is_ok());
        assert_eq!(mailer.sent().len(), 1);
    }
}
