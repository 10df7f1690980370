//! HTTP Error Mapping

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use hooks_core::StoreError;
use hooks_payments::PaymentError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Errors surfaced by handlers
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Collection is not exposed by this service
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Payment(err) => match err {
                PaymentError::InvalidAmount(_)
                | PaymentError::UnsupportedPaymentMethod(_)
                | PaymentError::SignatureInvalid(_)
                | PaymentError::MalformedPayload(_) => StatusCode::BAD_REQUEST,
                PaymentError::Upstream(_) => StatusCode::BAD_GATEWAY,
                // Never returned by the webhook route, which acknowledges
                // unknown carts; kept so the mapping covers every variant.
                PaymentError::UnknownCart(_) => StatusCode::NOT_FOUND,
                PaymentError::Persistence(store) => store_status(store),
                PaymentError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Store(err) => store_status(err),
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::CollectionNotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Payment(err) => err.code(),
            Self::Store(StoreError::Conflict { .. }) => "RECORD_EXISTS",
            Self::Store(_) => "PERSISTENCE_ERROR",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::CollectionNotFound(_) => "COLLECTION_NOT_FOUND",
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Payment(err) => err.user_message().to_string(),
            Self::Store(StoreError::Conflict { .. }) => "A record with that id already exists.".into(),
            Self::Store(_) => "Storage is temporarily unavailable.".into(),
            Self::BadRequest(msg) => msg.clone(),
            Self::CollectionNotFound(_) => "Collection not found.".into(),
        }
    }
}

const fn store_status(err: &StoreError) -> StatusCode {
    match err {
        StoreError::Conflict { .. } => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "Request failed");
        } else {
            tracing::warn!(error = %self, status = status.as_u16(), "Request rejected");
        }

        (
            status,
            Json(ErrorResponse {
                error: self.message(),
                code: self.code().into(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::from(PaymentError::SignatureInvalid("x".into())).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(PaymentError::InvalidAmount("x".into())).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(PaymentError::Upstream("x".into())).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::from(PaymentError::Persistence(StoreError::Backend("x".into()))).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(StoreError::Conflict {
                collection: "cart".into(),
                id: "c1".into()
            })
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::CollectionNotFound("_superusers".into()).status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_unknown_cart_outside_webhook() {
        let err = ApiError::from(PaymentError::UnknownCart("c9".into()));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.code(), "UNKNOWN_CART");
    }
}
