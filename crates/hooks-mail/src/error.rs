//! Mail Error Types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, MailError>;

/// Mail errors
#[derive(Error, Debug)]
pub enum MailError {
    /// Address could not be parsed
    #[error("Invalid address '{address}': {reason}")]
    Address { address: String, reason: String },

    /// Message could not be assembled
    #[error("Message build error: {0}")]
    Build(String),

    /// SMTP transport failed
    #[error("Transport error: {0}")]
    Transport(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl MailError {
    /// Only transport failures are worth another attempt
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
