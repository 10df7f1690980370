//! Router

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use hooks_payments::MAX_BODY_BYTES;

use crate::handlers::{create_record, health_check, list_records, payment_webhook};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let webhook = post(payment_webhook).layer(DefaultBodyLimit::max(MAX_BODY_BYTES));

    Router::new()
        .route("/health", get(health_check))
        .route(
            "/api/collections/{collection}/records",
            get(list_records).post(create_record),
        )
        .route("/payment/webhook", webhook.clone())
        .route("/stripe/webhook", webhook)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
