//! Error Types

use thiserror::Error;

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Record store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Record does not exist
    #[error("Record not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    /// A record with the same id already exists
    #[error("Record already exists: {collection}/{id}")]
    Conflict { collection: String, id: String },

    /// The backend rejected or failed the request
    #[error("Store backend error: {0}")]
    Backend(String),

    /// The backend did not answer in time
    #[error("Store call timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    /// Check if the failure may go away on a later attempt
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Backend(_) | Self::Timeout(_))
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Backend(format!("request timed out: {err}"))
        } else {
            Self::Backend(err.to_string())
        }
    }
}
