//! # hooks-mail
//!
//! Operator notifications for new inquiries and completed payments.
//!
//! Templates are chosen by collection through the closed [`InquiryKind`]
//! enum; delivery goes through the [`MailSender`] trait (SMTP via lettre, or
//! an in-memory outbox) wrapped by a retrying [`Notifier`].

mod error;
mod mailer;
mod notifier;
mod templates;

pub use error::{MailError, Result};
pub use mailer::{EmailMessage, MailSender, Mailbox, MemoryMailer, SmtpConfig, SmtpMailer, SmtpTls};
pub use notifier::{MailConfig, Notifier, NotifierConfig};
pub use templates::{FieldKind, FieldSpec, InquiryKind, subject_for};
