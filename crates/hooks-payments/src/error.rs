//! Payment Error Types

use hooks_core::StoreError;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Payment-related errors
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Cart total is not a non-negative decimal
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Payment method is not one we know
    #[error("Unsupported payment method: {0}")]
    UnsupportedPaymentMethod(String),

    /// Payment provider unreachable or rejected the request
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Webhook signature verification failed
    #[error("Webhook signature invalid: {0}")]
    SignatureInvalid(String),

    /// Webhook payload could not be decoded
    #[error("Malformed webhook payload: {0}")]
    MalformedPayload(String),

    /// Correlation id does not match any cart
    #[error("Unknown cart: {0}")]
    UnknownCart(String),

    /// Record store failed
    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PaymentError {
    /// Check if the provider should retry the delivery
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Upstream(_) => true,
            Self::Persistence(err) => !matches!(err, StoreError::NotFound { .. }),
            _ => false,
        }
    }

    /// Stable machine-readable code
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::UnsupportedPaymentMethod(_) => "UNSUPPORTED_PAYMENT_METHOD",
            Self::Upstream(_) => "UPSTREAM_ERROR",
            Self::SignatureInvalid(_) => "INVALID_SIGNATURE",
            Self::MalformedPayload(_) => "MALFORMED_PAYLOAD",
            Self::UnknownCart(_) => "UNKNOWN_CART",
            Self::Persistence(_) => "PERSISTENCE_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
        }
    }

    /// Get user-friendly message
    pub fn user_message(&self) -> &str {
        match self {
            Self::InvalidAmount(_) => "The cart total is not a valid amount.",
            Self::UnsupportedPaymentMethod(_) => "That payment method is not supported.",
            Self::Upstream(_) => "Payment processing failed. Please try again.",
            Self::SignatureInvalid(_) => "Invalid signature.",
            Self::MalformedPayload(_) => "Malformed payload.",
            Self::Config(_) => "Service configuration error.",
            _ => "An error occurred processing your request.",
        }
    }
}
