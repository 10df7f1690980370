//! Stripe Checkout Integration
//!
//! Creates a hosted checkout session for a new cart and stores its redirect
//! URL on the cart record before the record is persisted.

use async_trait::async_trait;
use hooks_core::Record;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use stripe::{
    CheckoutSession as StripeCheckoutSession, CheckoutSessionMode, Client,
    CreateCheckoutSession, CreateCheckoutSessionLineItems,
    CreateCheckoutSessionLineItemsPriceData,
    CreateCheckoutSessionLineItemsPriceDataProductData,
};

use crate::cart::{Cart, FIELD_PAYMENT_LINK, PaymentMethod};
use crate::error::{PaymentError, Result};

/// Metadata key carrying the cart id on the checkout session
pub const CORRELATION_METADATA_KEY: &str = "cart_record_id";

/// Stripe credentials
#[derive(Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    pub webhook_secret: String,
}

impl StripeConfig {
    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        let secret_key = required_env("STRIPE_SECRET_KEY")?;
        let webhook_secret = required_env("STRIPE_WEBHOOK_SECRET")?;

        Ok(Self {
            secret_key,
            webhook_secret,
        })
    }
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &"<redacted>")
            .field("webhook_secret", &"<redacted>")
            .finish()
    }
}

/// Checkout currencies the storefront prices in
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    #[default]
    Usd,
    Gbp,
    Eur,
}

impl Currency {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Usd => "usd",
            Self::Gbp => "gbp",
            Self::Eur => "eur",
        }
    }

    const fn to_stripe(self) -> stripe::Currency {
        match self {
            Self::Usd => stripe::Currency::USD,
            Self::Gbp => stripe::Currency::GBP,
            Self::Eur => stripe::Currency::EUR,
        }
    }
}

impl FromStr for Currency {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "usd" => Ok(Self::Usd),
            "gbp" => Ok(Self::Gbp),
            "eur" => Ok(Self::Eur),
            other => Err(PaymentError::Config(format!("unsupported checkout currency '{other}'"))),
        }
    }
}

/// Fixed parameters of every checkout session
#[derive(Clone, Debug)]
pub struct CheckoutConfig {
    /// URL to redirect after successful payment
    pub success_url: String,

    /// URL to redirect if checkout is cancelled
    pub cancel_url: String,

    pub currency: Currency,

    /// Line item name shown on the hosted page
    pub product_name: String,

    /// Deadline for the provider call
    pub timeout: Duration,
}

impl CheckoutConfig {
    pub fn new(success_url: impl Into<String>, cancel_url: impl Into<String>) -> Self {
        Self {
            success_url: success_url.into(),
            cancel_url: cancel_url.into(),
            currency: Currency::Usd,
            product_name: "Cart Total".into(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::new(
            required_env("CHECKOUT_SUCCESS_URL")?,
            required_env("CHECKOUT_CANCEL_URL")?,
        );
        if let Ok(currency) = std::env::var("CHECKOUT_CURRENCY") {
            config.currency = currency.parse()?;
        }
        Ok(config)
    }
}

fn required_env(name: &str) -> Result<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| PaymentError::Config(format!("{name} not set")))
}

/// Request to create a checkout session
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    /// Cart id, echoed back by the webhook
    pub correlation_id: String,

    /// Price in minor units
    pub amount_minor: i64,

    pub currency: Currency,
    pub product_name: String,
    pub success_url: String,
    pub cancel_url: String,
}

/// Result of creating a checkout session
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Provider session ID
    pub id: String,

    /// URL to redirect the customer to
    pub url: String,
}

/// Checkout provider trait (Strategy pattern)
#[async_trait]
pub trait CheckoutProvider: Send + Sync {
    /// Create a hosted checkout session
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession>;

    /// Provider name
    fn name(&self) -> &str;
}

/// Stripe-hosted checkout
pub struct StripeCheckout {
    client: Client,
}

impl StripeCheckout {
    pub fn new(secret_key: &str) -> Self {
        Self {
            client: Client::new(secret_key),
        }
    }
}

#[async_trait]
impl CheckoutProvider for StripeCheckout {
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession> {
        let mut params = CreateCheckoutSession::new();
        params.success_url = Some(&request.success_url);
        params.cancel_url = Some(&request.cancel_url);
        params.mode = Some(CheckoutSessionMode::Payment);
        params.client_reference_id = Some(&request.correlation_id);

        let mut metadata = HashMap::new();
        metadata.insert(CORRELATION_METADATA_KEY.to_string(), request.correlation_id.clone());
        params.metadata = Some(metadata);

        params.line_items = Some(vec![CreateCheckoutSessionLineItems {
            quantity: Some(1),
            price_data: Some(CreateCheckoutSessionLineItemsPriceData {
                currency: request.currency.to_stripe(),
                unit_amount: Some(request.amount_minor),
                product_data: Some(CreateCheckoutSessionLineItemsPriceDataProductData {
                    name: request.product_name.clone(),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        }]);

        let session = StripeCheckoutSession::create(&self.client, params)
            .await
            .map_err(|e| PaymentError::Upstream(e.to_string()))?;

        let url = session
            .url
            .ok_or_else(|| PaymentError::Upstream("No checkout URL returned".into()))?;

        Ok(CheckoutSession {
            id: session.id.to_string(),
            url,
        })
    }

    fn name(&self) -> &str {
        "stripe"
    }
}

/// Mock checkout provider (for development and tests)
///
/// Records every request and answers with a deterministic session.
#[derive(Default)]
pub struct MockCheckoutProvider {
    requests: Mutex<Vec<CheckoutRequest>>,
    failure: Option<String>,
    delay: Option<Duration>,
}

impl MockCheckoutProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider whose every call fails with `Upstream`
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// A provider that sleeps before answering
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<CheckoutRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CheckoutProvider for MockCheckoutProvider {
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.failure {
            return Err(PaymentError::Upstream(message.clone()));
        }

        let id = format!("cs_test_{}", request.correlation_id);
        Ok(CheckoutSession {
            url: format!("https://checkout.stripe.test/pay/{id}"),
            id,
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Creates checkout sessions for new carts
pub struct CheckoutSessionCreator {
    provider: Arc<dyn CheckoutProvider>,
    config: CheckoutConfig,
}

impl CheckoutSessionCreator {
    pub fn new(provider: Arc<dyn CheckoutProvider>, config: CheckoutConfig) -> Self {
        Self { provider, config }
    }

    /// Create a session for a validated cart.
    ///
    /// Returns `None` for payment methods without a checkout integration.
    pub async fn create_session(&self, cart: &Cart) -> Result<Option<CheckoutSession>> {
        match cart.payment_method {
            PaymentMethod::Stripe => {}
            PaymentMethod::Paypal => {
                tracing::warn!(cart_id = %cart.id, "PayPal checkout is not supported yet, no payment link created");
                return Ok(None);
            }
        }

        let request = CheckoutRequest {
            correlation_id: cart.id.clone(),
            amount_minor: cart.amount_minor,
            currency: self.config.currency,
            product_name: self.config.product_name.clone(),
            success_url: self.config.success_url.clone(),
            cancel_url: self.config.cancel_url.clone(),
        };

        let session = tokio::time::timeout(self.config.timeout, self.provider.create_checkout_session(&request))
            .await
            .map_err(|_| {
                PaymentError::Upstream(format!(
                    "{} checkout timed out after {:?}",
                    self.provider.name(),
                    self.config.timeout
                ))
            })??;

        tracing::info!(
            cart_id = %cart.id,
            session_id = %session.id,
            amount = cart.amount_minor,
            currency = self.config.currency.as_str(),
            "Created checkout session"
        );

        Ok(Some(session))
    }

    /// Validate a new cart record and write its `payment_link`.
    ///
    /// The record must already carry its final id. Any error means the cart
    /// must not be persisted.
    pub async fn attach_payment_link(&self, record: &mut Record) -> Result<Cart> {
        let mut cart = Cart::from_record(record)?;
        let session = self.create_session(&cart).await?;

        cart.payment_link = session.map(|s| s.url).unwrap_or_default();
        record.set(FIELD_PAYMENT_LINK, cart.payment_link.clone());

        Ok(cart)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::{CART_COLLECTION, FIELD_PAYMENT_METHOD, FIELD_TOTAL};

    fn creator(provider: Arc<dyn CheckoutProvider>) -> CheckoutSessionCreator {
        let mut config = CheckoutConfig::new("https://shop.test/ok", "https://shop.test/failed");
        config.timeout = Duration::from_millis(50);
        CheckoutSessionCreator::new(provider, config)
    }

    fn cart_record(id: &str, total: &str, method: &str) -> Record {
        Record::new(CART_COLLECTION)
            .with_id(id)
            .with_field(FIELD_TOTAL, total)
            .with_field(FIELD_PAYMENT_METHOD, method)
    }

    #[tokio::test]
    async fn test_stripe_cart_gets_payment_link() {
        let provider = Arc::new(MockCheckoutProvider::new());
        let creator = creator(provider.clone());
        let mut record = cart_record("c1", "19.99", "stripe");

        let cart = creator.attach_payment_link(&mut record).await.unwrap();

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].amount_minor, 1999);
        assert_eq!(requests[0].correlation_id, "c1");
        assert_eq!(requests[0].currency, Currency::Usd);
        assert_eq!(requests[0].success_url, "https://shop.test/ok");
        assert!(!cart.payment_link.is_empty());
        assert_eq!(record.get_string(FIELD_PAYMENT_LINK), cart.payment_link);
    }

    #[tokio::test]
    async fn test_paypal_cart_skips_provider() {
        let provider = Arc::new(MockCheckoutProvider::new());
        let creator = creator(provider.clone());
        let mut record = cart_record("c2", "5.00", "paypal");

        let cart = creator.attach_payment_link(&mut record).await.unwrap();

        assert!(provider.requests().is_empty());
        assert!(cart.payment_link.is_empty());
        assert_eq!(record.get_string(FIELD_PAYMENT_LINK), "");
    }

    #[tokio::test]
    async fn test_invalid_total_never_reaches_provider() {
        let provider = Arc::new(MockCheckoutProvider::new());
        let creator = creator(provider.clone());
        let mut record = cart_record("c3", "twelve", "stripe");

        let err = creator.attach_payment_link(&mut record).await.unwrap_err();
        assert!(matches!(err, PaymentError::InvalidAmount(_)));
        assert!(provider.requests().is_empty());
        assert!(record.get(FIELD_PAYMENT_LINK).is_none());
    }

    #[tokio::test]
    async fn test_provider_failure_is_upstream() {
        let creator = creator(Arc::new(MockCheckoutProvider::failing("card network down")));
        let mut record = cart_record("c4", "1.00", "stripe");

        let err = creator.attach_payment_link(&mut record).await.unwrap_err();
        assert!(matches!(err, PaymentError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_provider_timeout_is_upstream() {
        let creator = creator(Arc::new(MockCheckoutProvider::slow(Duration::from_secs(5))));
        let mut record = cart_record("c5", "1.00", "stripe");

        let err = creator.attach_payment_link(&mut record).await.unwrap_err();
        assert!(matches!(err, PaymentError::Upstream(msg) if msg.contains("timed out")));
    }

    #[test]
    fn test_currency_parse() {
        assert_eq!("GBP".parse::<Currency>().unwrap(), Currency::Gbp);
        assert!(matches!("jpy".parse::<Currency>(), Err(PaymentError::Config(_))));
    }
}
