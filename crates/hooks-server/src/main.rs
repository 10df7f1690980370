//! bakery-hooks HTTP Server
//!
//! Axum server running record create hooks (cart checkout links, inquiry
//! notifications), the shop listing and the checkout webhook.

mod config;
mod error;
mod handlers;
mod listing;
mod pipeline;
mod routes;
mod state;

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hooks_core::{MemoryRecordStore, PocketBaseStore, RecordStore, TimeoutStore};
use hooks_mail::SmtpMailer;
use hooks_payments::StripeCheckout;

use crate::config::AppConfig;
use crate::routes::build_router;
use crate::state::{AppState, Services, Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    // Record store
    let backend: Arc<dyn RecordStore> = match config.pocketbase.clone() {
        Some(pocketbase) => {
            tracing::info!(url = %pocketbase.base_url, "✓ Using PocketBase record store");
            Arc::new(PocketBaseStore::new(pocketbase)?)
        }
        None => {
            tracing::warn!("⚠ POCKETBASE_URL not set - records are kept in memory only");
            Arc::new(MemoryRecordStore::new())
        }
    };
    let store: Arc<dyn RecordStore> = Arc::new(TimeoutStore::new(backend, config.upstream_timeout));

    // Checkout provider and mail transport
    let checkout = Arc::new(StripeCheckout::new(&config.stripe.secret_key));
    tracing::info!(currency = config.checkout.currency.as_str(), "✓ Stripe checkout configured");

    let mailer = Arc::new(SmtpMailer::new(&config.mail.smtp)?);
    tracing::info!(host = %config.mail.smtp.host, port = config.mail.smtp.port, "✓ SMTP mailer configured");

    if let Some(collection) = &config.reconciler.payments_collection {
        tracing::info!(collection = %collection, "Payment records enabled");
    }

    let state = AppState::new(
        Services {
            store,
            checkout,
            mailer,
        },
        Settings {
            checkout: config.checkout,
            notifier: config.mail.notifier,
            reconciler: config.reconciler,
            webhook_secret: config.stripe.webhook_secret,
            public_base_url: config.public_base_url,
        },
    )?;

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    tracing::info!("🚀 Server running on http://{}", config.bind_addr);
    tracing::info!("   Health:   GET  /health");
    tracing::info!("   Records:  GET  /api/collections/{{collection}}/records");
    tracing::info!("   Create:   POST /api/collections/{{collection}}/records");
    tracing::info!("   Webhook:  POST /payment/webhook");

    axum::serve(listener, app).await?;

    Ok(())
}
