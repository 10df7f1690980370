//! Operator Notifications
//!
//! Best-effort delivery: a failed send is retried a few times with linear
//! backoff and then logged. Request handlers hand messages to
//! [`Notifier::dispatch`], which runs delivery on its own task so a slow or
//! unreachable mail server never holds a response.

use hooks_core::Record;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{MailError, Result};
use crate::mailer::{EmailMessage, MailSender, Mailbox, SmtpConfig};
use crate::templates::{InquiryKind, subject_for};

/// Who sends and who receives notifications, and how hard to try
#[derive(Clone, Debug)]
pub struct NotifierConfig {
    pub sender: Mailbox,
    pub operator: Mailbox,
    /// Total attempts per message (at least 1)
    pub retry_attempts: u32,
    /// Wait before attempt `n + 1` is `n * retry_backoff`
    pub retry_backoff: Duration,
}

impl NotifierConfig {
    pub const fn new(sender: Mailbox, operator: Mailbox) -> Self {
        Self {
            sender,
            operator,
            retry_attempts: 3,
            retry_backoff: Duration::from_millis(500),
        }
    }
}

/// Everything mail-related read at startup
#[derive(Clone, Debug)]
pub struct MailConfig {
    pub notifier: NotifierConfig,
    pub smtp: SmtpConfig,
}

impl MailConfig {
    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        let sender = Mailbox::new(
            &required_env("MAIL_SENDER_ADDRESS")?,
            Some(&required_env("MAIL_SENDER_NAME")?),
        )?;
        let operator = Mailbox::new(&required_env("MAIL_OPERATOR_ADDRESS")?, None)?;

        let mut notifier = NotifierConfig::new(sender, operator);
        if let Ok(attempts) = std::env::var("MAIL_RETRY_ATTEMPTS") {
            notifier.retry_attempts = attempts
                .trim()
                .parse()
                .map_err(|_| MailError::Config(format!("MAIL_RETRY_ATTEMPTS '{attempts}' is not a number")))?;
        }

        let mut smtp = SmtpConfig::new(required_env("SMTP_HOST")?);
        if let Ok(port) = std::env::var("SMTP_PORT") {
            smtp.port = port
                .trim()
                .parse()
                .map_err(|_| MailError::Config(format!("SMTP_PORT '{port}' is not a port")))?;
        }
        smtp.username = std::env::var("SMTP_USERNAME").ok().filter(|u| !u.is_empty());
        smtp.password = std::env::var("SMTP_PASSWORD").ok().filter(|p| !p.is_empty());
        if let Ok(tls) = std::env::var("SMTP_TLS") {
            smtp.tls = tls.parse()?;
        }

        Ok(Self { notifier, smtp })
    }
}

fn required_env(name: &str) -> Result<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| MailError::Config(format!("{name} not set")))
}

/// Sends operator notifications
pub struct Notifier {
    mailer: Arc<dyn MailSender>,
    config: NotifierConfig,
}

impl Notifier {
    pub fn new(mailer: Arc<dyn MailSender>, config: NotifierConfig) -> Self {
        Self { mailer, config }
    }

    /// Email for a newly created inquiry record
    pub fn inquiry_message(&self, kind: InquiryKind, record: &Record) -> EmailMessage {
        let collection = if record.collection.is_empty() {
            kind.collection()
        } else {
            record.collection.as_str()
        };

        EmailMessage {
            from: self.config.sender.clone(),
            to: vec![self.config.operator.clone()],
            subject: subject_for(collection),
            html: kind.render(record),
        }
    }

    /// Email for a cart's first successful payment
    pub fn payment_message(
        &self,
        cart_id: &str,
        session_id: &str,
        amount_total: Option<i64>,
        currency: Option<&str>,
    ) -> EmailMessage {
        let amount = amount_total.map_or_else(
            || "unknown".to_string(),
            |minor| {
                let currency = currency.unwrap_or_default().to_ascii_uppercase();
                format!("{}.{:02} {currency}", minor / 100, (minor % 100).abs())
                    .trim_end()
                    .to_string()
            },
        );

        let html = format!(
            "<h1>Payment Received</h1>\n\
             <p><strong>Cart:</strong> {}</p>\n\
             <p><strong>Amount:</strong> {}</p>\n\
             <p><strong>Checkout Session:</strong> {}</p>\n",
            html_escape::encode_text(cart_id),
            html_escape::encode_text(&amount),
            html_escape::encode_text(session_id),
        );

        EmailMessage {
            from: self.config.sender.clone(),
            to: vec![self.config.operator.clone()],
            subject: format!("Payment Received - cart {cart_id}"),
            html,
        }
    }

    /// Send with retries. Returns the last error once attempts run out.
    pub async fn deliver(&self, message: &EmailMessage) -> Result<()> {
        let attempts = self.config.retry_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.mailer.send(message).await {
                Ok(()) => {
                    tracing::info!(subject = %message.subject, attempt, mailer = self.mailer.name(), "Notification sent");
                    return Ok(());
                }
                Err(err) if err.is_retryable() && attempt < attempts => {
                    tracing::warn!(subject = %message.subject, attempt, error = %err, "Notification failed, retrying");
                    tokio::time::sleep(self.config.retry_backoff * attempt).await;
                    attempt += 1;
                }
                Err(err) => {
                    tracing::error!(subject = %message.subject, attempt, error = %err, "Notification failed");
                    return Err(err);
                }
            }
        }
    }

    /// Render and send the notification for an inquiry record
    pub async fn notify_inquiry(&self, kind: InquiryKind, record: &Record) -> Result<()> {
        self.deliver(&self.inquiry_message(kind, record)).await
    }

    /// Deliver in the background and return immediately.
    ///
    /// Failures are logged by [`Notifier::deliver`]; the handle is only
    /// useful to callers that want to wait for the outcome.
    pub fn dispatch(self: &Arc<Self>, message: EmailMessage) -> tokio::task::JoinHandle<()> {
        let notifier = Arc::clone(self);
        tokio::spawn(async move {
            // Already logged with attempt count
            let _ = notifier.deliver(&message).await;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailer::MemoryMailer;

    fn config(attempts: u32) -> NotifierConfig {
        NotifierConfig {
            retry_attempts: attempts,
            retry_backoff: Duration::ZERO,
            ..NotifierConfig::new(
                Mailbox::new("shop@example.com", Some("Cake Shop")).unwrap(),
                Mailbox::new("owner@example.com", None).unwrap(),
            )
        }
    }

    #[tokio::test]
    async fn test_inquiry_notification() {
        let mailer = Arc::new(MemoryMailer::new());
        let notifier = Notifier::new(mailer.clone(), config(3));
        let record = Record::new("weddingcakeinquiry")
            .with_id("w1")
            .with_field("wedding_venue", "The Barn");

        notifier.notify_inquiry(InquiryKind::WeddingCake, &record).await.unwrap();

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "New Record Created - weddingcakeinquiry");
        assert_eq!(sent[0].to[0].address, "owner@example.com");
        assert_eq!(sent[0].from.name.as_deref(), Some("Cake Shop"));
        assert!(sent[0].html.contains("The Barn"));
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let mailer = Arc::new(MemoryMailer::failing_first(2));
        let notifier = Notifier::new(mailer.clone(), config(3));

        notifier
            .notify_inquiry(InquiryKind::General, &Record::new("inquiry"))
            .await
            .unwrap();
        assert_eq!(mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_attempts() {
        let mailer = Arc::new(MemoryMailer::failing_first(5));
        let notifier = Notifier::new(mailer.clone(), config(2));

        let err = notifier
            .notify_inquiry(InquiryKind::General, &Record::new("inquiry"))
            .await
            .unwrap_err();
        assert!(matches!(err, MailError::Transport(_)));
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_runs_in_background() {
        let mailer = Arc::new(MemoryMailer::failing_first(1));
        let notifier = Arc::new(Notifier::new(mailer.clone(), config(2)));
        let message = notifier.inquiry_message(InquiryKind::General, &Record::new("inquiry"));

        notifier.dispatch(message).await.unwrap();
        assert_eq!(mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_dispatch_swallows_final_failure() {
        let mailer = Arc::new(MemoryMailer::failing_first(5));
        let notifier = Arc::new(Notifier::new(mailer.clone(), config(2)));
        let message = notifier.inquiry_message(InquiryKind::General, &Record::new("inquiry"));

        assert!(notifier.dispatch(message).await.is_ok());
        assert!(mailer.sent().is_empty());
    }

    #[test]
    fn test_payment_message() {
        let notifier = Notifier::new(Arc::new(MemoryMailer::new()), config(1));
        let message = notifier.payment_message("c1", "cs_test_1", Some(1999), Some("usd"));

        assert_eq!(message.subject, "Payment Received - cart c1");
        assert!(message.html.contains("<p><strong>Amount:</strong> 19.99 USD</p>"));
        assert!(message.html.contains("cs_test_1"));

        let unknown = notifier.payment_message("c2", "cs_2", None, None);
        assert!(unknown.html.contains("<p><strong>Amount:</strong> unknown</p>"));
    }
}
