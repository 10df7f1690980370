//! HTTP Handlers

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
};
use serde::Serialize;
use serde_json::Value;

use hooks_core::Record;
use hooks_payments::{SIGNATURE_HEADER, WebhookOutcome};

use crate::error::ApiError;
use crate::listing::{SHOP_COLLECTION, expand_image_urls};
use crate::state::AppState;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub store: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    pub total_items: usize,
    pub items: Vec<Record>,
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
    pub outcome: &'static str,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        store: state.store.name().to_string(),
    })
}

/// Create a record in a hooked collection (carts and inquiries)
pub async fn create_record(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Record>, ApiError> {
    let Value::Object(fields) = body else {
        return Err(ApiError::BadRequest("record body must be a JSON object".into()));
    };

    let record = state.pipeline.create(Record::from_fields(collection, fields)).await?;
    Ok(Json(record))
}

/// List the shop catalogue with absolute image URLs.
///
/// No other collection is listable here; carts and inquiries hold customer
/// data.
pub async fn list_records(
    State(state): State<AppState>,
    Path(collection): Path<String>,
) -> Result<Json<ListResponse>, ApiError> {
    if !collection.eq_ignore_ascii_case(SHOP_COLLECTION) {
        return Err(ApiError::CollectionNotFound(collection));
    }

    let mut items = state.store.list(SHOP_COLLECTION).await?;
    for item in &mut items {
        expand_image_urls(item, &state.public_base_url);
    }

    Ok(Json(ListResponse {
        total_items: items.len(),
        items,
    }))
}

/// Checkout webhook. The raw body is needed for signature verification.
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());

    let outcome = state.webhooks.handle(&body, signature).await?;

    let label = match &outcome {
        WebhookOutcome::MarkedPaid(checkout) => {
            let message = state.notifier.payment_message(
                &checkout.cart_id,
                &checkout.session_id,
                checkout.amount_total,
                checkout.currency.as_deref(),
            );
            state.notifier.dispatch(message);
            "marked_paid"
        }
        WebhookOutcome::AlreadyPaid { cart_id } => {
            tracing::info!(cart_id = %cart_id, "Duplicate payment event for paid cart");
            "already_paid"
        }
        WebhookOutcome::UnknownCart { .. } => "unknown_cart",
        WebhookOutcome::Acknowledged { .. } => "acknowledged",
    };

    Ok(Json(WebhookAck {
        received: true,
        outcome: label,
    }))
}
