//! # hooks-payments
//!
//! Payment-session lifecycle for carts.
//!
//! ```text
//! cart created ──▶ CheckoutSessionCreator ──▶ Stripe hosted checkout
//!                        │ payment_link
//!                        ▼
//!                    cart record
//!                        ▲ is_paid = true (once)
//!                        │
//! Stripe ──▶ WebhookDispatcher ──▶ SignatureVerifier ──▶ Reconciler
//! ```
//!
//! The cart id travels through the provider as the session's correlation id
//! (`metadata.cart_record_id` and `client_reference_id`), so the webhook finds
//! its cart without looking anything up by amount or time.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use hooks_payments::{CheckoutConfig, CheckoutSessionCreator, StripeCheckout};
//!
//! let creator = CheckoutSessionCreator::new(
//!     Arc::new(StripeCheckout::new("sk_test_xxx")),
//!     CheckoutConfig::new("https://shop.example/ok", "https://shop.example/failed"),
//! );
//! let cart = creator.attach_payment_link(&mut record).await?;
//! ```

pub mod cart;
mod checkout;
mod error;
mod locks;
mod reconcile;
mod signature;
mod webhook;

pub use cart::{Cart, PaymentMethod, amount_in_cents};
pub use checkout::{
    CORRELATION_METADATA_KEY, CheckoutConfig, CheckoutProvider, CheckoutRequest, CheckoutSession,
    CheckoutSessionCreator, Currency, MockCheckoutProvider, StripeCheckout, StripeConfig,
};
pub use error::{PaymentError, Result};
pub use locks::KeyedLocks;
pub use reconcile::{ReconcileOutcome, Reconciler, ReconcilerConfig, payment_record_id};
pub use signature::{DEFAULT_TOLERANCE, SIGNATURE_HEADER, SignatureVerifier};
pub use webhook::{CompletedCheckout, EventKind, MAX_BODY_BYTES, WebhookDispatcher, WebhookEvent, WebhookOutcome};
