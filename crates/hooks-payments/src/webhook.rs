//! Stripe Webhook Handling
//!
//! Verifies inbound deliveries, decodes them into a closed set of events and
//! routes paid checkouts to the [`Reconciler`].

use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::checkout::CORRELATION_METADATA_KEY;
use crate::error::{PaymentError, Result};
use crate::reconcile::{ReconcileOutcome, Reconciler};
use crate::signature::SignatureVerifier;

/// Maximum accepted webhook body
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Event kinds this service acts on
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    CheckoutSessionCompleted,
    CheckoutSessionAsyncPaymentSucceeded,
    CheckoutSessionAsyncPaymentFailed,
    CheckoutSessionExpired,
}

impl EventKind {
    pub fn from_type(event_type: &str) -> Option<Self> {
        match event_type {
            "checkout.session.completed" => Some(Self::CheckoutSessionCompleted),
            "checkout.session.async_payment_succeeded" => Some(Self::CheckoutSessionAsyncPaymentSucceeded),
            "checkout.session.async_payment_failed" => Some(Self::CheckoutSessionAsyncPaymentFailed),
            "checkout.session.expired" => Some(Self::CheckoutSessionExpired),
            _ => None,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CheckoutSessionCompleted => "checkout.session.completed",
            Self::CheckoutSessionAsyncPaymentSucceeded => "checkout.session.async_payment_succeeded",
            Self::CheckoutSessionAsyncPaymentFailed => "checkout.session.async_payment_failed",
            Self::CheckoutSessionExpired => "checkout.session.expired",
        }
    }
}

/// A paid checkout, correlated to a cart
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletedCheckout {
    pub event_id: Option<String>,
    pub session_id: String,
    pub cart_id: String,
    /// Amount charged in minor units
    pub amount_total: Option<i64>,
    pub currency: Option<String>,
}

/// Parsed webhook event
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WebhookEvent {
    /// Payment collected - mark cart paid
    CheckoutPaid(CompletedCheckout),

    /// Session completed but the payment is still processing
    CheckoutPending { session_id: String, cart_id: Option<String> },

    /// Async payment failed or session expired
    CheckoutClosed {
        kind: EventKind,
        session_id: String,
        cart_id: Option<String>,
    },

    /// Paid checkout without a correlation id (not created by us)
    Uncorrelated { session_id: String },

    /// Unhandled event type
    Ignored { event_type: String },
}

/// Result of handling one delivery
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// First paid transition for the cart
    MarkedPaid(CompletedCheckout),
    /// Replayed delivery for a paid cart
    AlreadyPaid { cart_id: String },
    /// No cart with that id
    UnknownCart { cart_id: String },
    /// Nothing to do; acknowledged
    Acknowledged { event_type: String },
}

#[derive(Deserialize)]
struct EventEnvelope {
    #[serde(default)]
    id: Option<String>,
    #[serde(rename = "type")]
    event_type: String,
    data: EventData,
}

#[derive(Deserialize)]
struct EventData {
    object: serde_json::Value,
}

#[derive(Deserialize)]
struct SessionObject {
    id: String,
    #[serde(default)]
    client_reference_id: Option<String>,
    #[serde(default)]
    metadata: Option<HashMap<String, String>>,
    #[serde(default)]
    payment_status: Option<String>,
    #[serde(default)]
    amount_total: Option<i64>,
    #[serde(default)]
    currency: Option<String>,
}

impl SessionObject {
    /// Cart id from metadata, falling back to `client_reference_id`
    fn correlation_id(&self) -> Option<String> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get(CORRELATION_METADATA_KEY))
            .or(self.client_reference_id.as_ref())
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
    }

    fn is_paid(&self) -> bool {
        matches!(
            self.payment_status.as_deref(),
            None | Some("paid" | "no_payment_required")
        )
    }
}

impl WebhookEvent {
    /// Decode an already verified payload
    fn decode(payload: &[u8]) -> Result<Self> {
        let envelope: EventEnvelope =
            serde_json::from_slice(payload).map_err(|e| PaymentError::MalformedPayload(e.to_string()))?;

        let Some(kind) = EventKind::from_type(&envelope.event_type) else {
            return Ok(Self::Ignored {
                event_type: envelope.event_type,
            });
        };

        let session: SessionObject = serde_json::from_value(envelope.data.object)
            .map_err(|e| PaymentError::MalformedPayload(format!("{}: {e}", kind.as_str())))?;
        let cart_id = session.correlation_id();

        let event = match kind {
            EventKind::CheckoutSessionCompleted if !session.is_paid() => Self::CheckoutPending {
                session_id: session.id,
                cart_id,
            },
            EventKind::CheckoutSessionCompleted | EventKind::CheckoutSessionAsyncPaymentSucceeded => match cart_id {
                Some(cart_id) => Self::CheckoutPaid(CompletedCheckout {
                    event_id: envelope.id,
                    session_id: session.id,
                    cart_id,
                    amount_total: session.amount_total,
                    currency: session.currency,
                }),
                None => Self::Uncorrelated { session_id: session.id },
            },
            EventKind::CheckoutSessionAsyncPaymentFailed | EventKind::CheckoutSessionExpired => Self::CheckoutClosed {
                kind,
                session_id: session.id,
                cart_id,
            },
        };

        Ok(event)
    }
}

/// Webhook verifier and dispatcher
pub struct WebhookDispatcher {
    verifier: SignatureVerifier,
    reconciler: Arc<Reconciler>,
}

impl WebhookDispatcher {
    pub fn new(verifier: SignatureVerifier, reconciler: Arc<Reconciler>) -> Self {
        Self { verifier, reconciler }
    }

    pub const fn verifier(&self) -> &SignatureVerifier {
        &self.verifier
    }

    /// Verify the signature, then decode. The body is never parsed before
    /// the signature has been checked.
    pub fn verify_event(&self, payload: &[u8], signature: Option<&str>) -> Result<WebhookEvent> {
        let signature = signature.ok_or_else(|| PaymentError::SignatureInvalid("missing signature header".into()))?;
        self.verifier.verify(payload, signature)?;
        WebhookEvent::decode(payload)
    }

    /// Process a delivery end to end
    pub async fn handle(&self, payload: &[u8], signature: Option<&str>) -> Result<WebhookOutcome> {
        let event = self.verify_event(payload, signature)?;
        self.dispatch(event).await
    }

    /// Route a verified event
    pub async fn dispatch(&self, event: WebhookEvent) -> Result<WebhookOutcome> {
        match event {
            WebhookEvent::CheckoutPaid(checkout) => {
                tracing::info!(
                    cart_id = %checkout.cart_id,
                    session_id = %checkout.session_id,
                    amount = ?checkout.amount_total,
                    "Checkout session completed"
                );

                match self.reconciler.reconcile(&checkout).await {
                    Ok(ReconcileOutcome::MarkedPaid) => Ok(WebhookOutcome::MarkedPaid(checkout)),
                    Ok(ReconcileOutcome::AlreadyPaid) => Ok(WebhookOutcome::AlreadyPaid {
                        cart_id: checkout.cart_id,
                    }),
                    Err(PaymentError::UnknownCart(cart_id)) => {
                        tracing::warn!(cart_id = %cart_id, session_id = %checkout.session_id, "No cart for completed checkout");
                        Ok(WebhookOutcome::UnknownCart { cart_id })
                    }
                    Err(err) => Err(err),
                }
            }

            WebhookEvent::CheckoutPending { session_id, cart_id } => {
                tracing::info!(session_id = %session_id, cart_id = ?cart_id, "Checkout completed, payment still pending");
                Ok(WebhookOutcome::Acknowledged {
                    event_type: EventKind::CheckoutSessionCompleted.as_str().into(),
                })
            }

            WebhookEvent::CheckoutClosed { kind, session_id, cart_id } => {
                tracing::warn!(event_type = kind.as_str(), session_id = %session_id, cart_id = ?cart_id, "Checkout closed without payment");
                Ok(WebhookOutcome::Acknowledged {
                    event_type: kind.as_str().into(),
                })
            }

            WebhookEvent::Uncorrelated { session_id } => {
                tracing::warn!(session_id = %session_id, "Paid checkout carries no cart id, ignoring");
                Ok(WebhookOutcome::Acknowledged {
                    event_type: EventKind::CheckoutSessionCompleted.as_str().into(),
                })
            }

            WebhookEvent::Ignored { event_type } => {
                tracing::debug!(event_type = %event_type, "Unhandled webhook event");
                Ok(WebhookOutcome::Acknowledged { event_type })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::{CART_COLLECTION, FIELD_IS_PAID};
    use crate::reconcile::ReconcilerConfig;
    use hooks_core::{MemoryRecordStore, Record, RecordStore};
    use serde_json::json;

    fn completed(cart_id: &str, payment_status: &str) -> Vec<u8> {
        json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": {"object": {
                "id": "cs_test_1",
                "client_reference_id": cart_id,
                "metadata": {"cart_record_id": cart_id},
                "payment_status": payment_status,
                "amount_total": 1999,
                "currency": "usd"
            }}
        })
        .to_string()
        .into_bytes()
    }

    async fn dispatcher_with_cart(id: &str) -> (WebhookDispatcher, Arc<MemoryRecordStore>) {
        let store = Arc::new(MemoryRecordStore::new());
        store
            .insert(&Record::new(CART_COLLECTION).with_id(id).with_field(FIELD_IS_PAID, false))
            .await
            .unwrap();
        let reconciler = Arc::new(Reconciler::new(store.clone(), ReconcilerConfig::default()));
        let verifier = SignatureVerifier::new("whsec_test").unwrap();
        (WebhookDispatcher::new(verifier, reconciler), store)
    }

    fn sign(dispatcher: &WebhookDispatcher, payload: &[u8]) -> String {
        dispatcher
            .verifier()
            .sign(payload, chrono::Utc::now().timestamp())
            .unwrap()
    }

    #[test]
    fn test_decode_paid_checkout() {
        let event = WebhookEvent::decode(&completed("c1", "paid")).unwrap();
        assert_eq!(
            event,
            WebhookEvent::CheckoutPaid(CompletedCheckout {
                event_id: Some("evt_1".into()),
                session_id: "cs_test_1".into(),
                cart_id: "c1".into(),
                amount_total: Some(1999),
                currency: Some("usd".into()),
            })
        );
    }

    #[test]
    fn test_decode_pending_and_uncorrelated() {
        assert!(matches!(
            WebhookEvent::decode(&completed("c1", "unpaid")).unwrap(),
            WebhookEvent::CheckoutPending { .. }
        ));

        let payload = json!({
            "type": "checkout.session.async_payment_succeeded",
            "data": {"object": {"id": "cs_2", "metadata": {}}}
        })
        .to_string();
        assert_eq!(
            WebhookEvent::decode(payload.as_bytes()).unwrap(),
            WebhookEvent::Uncorrelated { session_id: "cs_2".into() }
        );
    }

    #[test]
    fn test_decode_client_reference_fallback() {
        let payload = json!({
            "type": "checkout.session.completed",
            "data": {"object": {"id": "cs_3", "client_reference_id": "c9", "metadata": null}}
        })
        .to_string();
        let WebhookEvent::CheckoutPaid(checkout) = WebhookEvent::decode(payload.as_bytes()).unwrap() else {
            panic!("expected paid checkout");
        };
        assert_eq!(checkout.cart_id, "c9");
    }

    #[test]
    fn test_decode_unknown_and_malformed() {
        let payload = json!({"type": "invoice.paid", "data": {"object": {}}}).to_string();
        assert_eq!(
            WebhookEvent::decode(payload.as_bytes()).unwrap(),
            WebhookEvent::Ignored { event_type: "invoice.paid".into() }
        );

        assert!(matches!(
            WebhookEvent::decode(b"not json"),
            Err(PaymentError::MalformedPayload(_))
        ));
        let no_session_id = json!({"type": "checkout.session.completed", "data": {"object": {}}}).to_string();
        assert!(matches!(
            WebhookEvent::decode(no_session_id.as_bytes()),
            Err(PaymentError::MalformedPayload(_))
        ));
    }

    #[tokio::test]
    async fn test_signed_delivery_marks_paid_and_replay_is_noop() {
        let (dispatcher, store) = dispatcher_with_cart("c1").await;
        let payload = completed("c1", "paid");
        let signature = sign(&dispatcher, &payload);

        let first = dispatcher.handle(&payload, Some(signature.as_str())).await.unwrap();
        assert!(matches!(first, WebhookOutcome::MarkedPaid(ref c) if c.cart_id == "c1"));

        let second = dispatcher.handle(&payload, Some(signature.as_str())).await.unwrap();
        assert_eq!(second, WebhookOutcome::AlreadyPaid { cart_id: "c1".into() });
        assert!(store.get(CART_COLLECTION, "c1").await.unwrap().unwrap().get_bool(FIELD_IS_PAID));
    }

    #[tokio::test]
    async fn test_unsigned_paid_event_rejected() {
        let (dispatcher, store) = dispatcher_with_cart("c1").await;
        let payload = completed("c1", "paid");

        assert!(matches!(
            dispatcher.handle(&payload, None).await,
            Err(PaymentError::SignatureInvalid(_))
        ));
        assert!(matches!(
            dispatcher.handle(&payload, Some("t=1,v1=deadbeef")).await,
            Err(PaymentError::SignatureInvalid(_))
        ));
        assert!(!store.get(CART_COLLECTION, "c1").await.unwrap().unwrap().get_bool(FIELD_IS_PAID));
    }

    #[tokio::test]
    async fn test_garbage_with_bad_signature_is_signature_error() {
        let (dispatcher, _) = dispatcher_with_cart("c1").await;
        let err = dispatcher.handle(b"not json", Some("t=1,v1=00")).await.unwrap_err();
        assert!(matches!(err, PaymentError::SignatureInvalid(_)));
    }

    #[tokio::test]
    async fn test_unknown_cart_absorbed() {
        let (dispatcher, _) = dispatcher_with_cart("c1").await;
        let payload = completed("ghost", "paid");
        let signature = sign(&dispatcher, &payload);

        let outcome = dispatcher.handle(&payload, Some(signature.as_str())).await.unwrap();
        assert_eq!(outcome, WebhookOutcome::UnknownCart { cart_id: "ghost".into() });
    }
}
