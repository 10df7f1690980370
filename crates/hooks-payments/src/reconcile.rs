//! Payment Reconciliation
//!
//! Applies a completed checkout to its cart exactly once. Deliveries for the
//! same cart are serialised, so concurrent redeliveries cannot both observe
//! an unpaid cart.

use hooks_core::{Record, RecordStore, StoreError};
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::cart::{CART_COLLECTION, FIELD_IS_PAID, PaymentMethod};
use crate::error::{PaymentError, Result};
use crate::locks::KeyedLocks;
use crate::webhook::CompletedCheckout;

/// What a reconciliation did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The cart went from unpaid to paid
    MarkedPaid,
    /// Replay of an already applied payment; nothing written
    AlreadyPaid,
}

/// Reconciler settings
#[derive(Clone, Debug, Default)]
pub struct ReconcilerConfig {
    /// Collection receiving one record per completed payment, if any
    pub payments_collection: Option<String>,
}

impl ReconcilerConfig {
    /// Read `PAYMENTS_COLLECTION`
    pub fn from_env() -> Self {
        Self {
            payments_collection: std::env::var("PAYMENTS_COLLECTION")
                .ok()
                .filter(|c| !c.trim().is_empty()),
        }
    }
}

/// Payment reconciler
pub struct Reconciler {
    store: Arc<dyn RecordStore>,
    locks: KeyedLocks,
    config: ReconcilerConfig,
}

impl Reconciler {
    pub fn new(store: Arc<dyn RecordStore>, config: ReconcilerConfig) -> Self {
        Self {
            store,
            locks: KeyedLocks::new(),
            config,
        }
    }

    /// Mark the checkout's cart paid.
    ///
    /// Returns `UnknownCart` when no cart has the correlation id and
    /// `Persistence` when the store fails.
    pub async fn reconcile(&self, checkout: &CompletedCheckout) -> Result<ReconcileOutcome> {
        let _guard = self.locks.lock(&checkout.cart_id).await;

        let Some(mut cart) = self.store.get(CART_COLLECTION, &checkout.cart_id).await? else {
            return Err(PaymentError::UnknownCart(checkout.cart_id.clone()));
        };

        if cart.get_bool(FIELD_IS_PAID) {
            tracing::info!(
                cart_id = %checkout.cart_id,
                session_id = %checkout.session_id,
                "Cart already paid, ignoring replayed checkout"
            );
            return Ok(ReconcileOutcome::AlreadyPaid);
        }

        if let Some(collection) = &self.config.payments_collection {
            self.record_payment(collection, checkout).await?;
        }

        cart.set(FIELD_IS_PAID, true);
        self.store.save(&cart).await.map_err(|err| match err {
            StoreError::NotFound { .. } => PaymentError::UnknownCart(checkout.cart_id.clone()),
            other => PaymentError::Persistence(other),
        })?;

        tracing::info!(
            cart_id = %checkout.cart_id,
            session_id = %checkout.session_id,
            amount = ?checkout.amount_total,
            "Cart marked paid"
        );

        Ok(ReconcileOutcome::MarkedPaid)
    }

    /// Insert the payment record. Its id derives from the session id, so an
    /// earlier attempt that stored it but failed to save the cart is fine.
    async fn record_payment(&self, collection: &str, checkout: &CompletedCheckout) -> Result<()> {
        let mut payment = Record::new(collection)
            .with_id(payment_record_id(&checkout.session_id))
            .with_field("cart", checkout.cart_id.clone())
            .with_field("session_id", checkout.session_id.clone())
            .with_field("status", "completed")
            .with_field("payment_method", PaymentMethod::Stripe.as_str());
        if let Some(amount) = checkout.amount_total {
            payment.set("amount", amount);
        }
        if let Some(currency) = &checkout.currency {
            payment.set("currency", currency.clone());
        }
        if let Some(event_id) = &checkout.event_id {
            payment.set("event_id", event_id.clone());
        }

        match self.store.insert(&payment).await {
            Ok(_) => {
                tracing::info!(cart_id = %checkout.cart_id, payment_id = %payment.id, "Payment record created");
                Ok(())
            }
            Err(StoreError::Conflict { .. }) => {
                tracing::debug!(payment_id = %payment.id, "Payment record already present");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// Deterministic 15-character record id for a checkout session
pub fn payment_record_id(session_id: &str) -> String {
    let digest = Sha256::digest(session_id.as_bytes());
    hex::encode(digest)[..hooks_core::record::ID_LENGTH].to_string()
}
