//! Application Configuration
//!
//! Read once at startup and handed to constructors. Missing secrets stop the
//! process instead of letting it run with unverifiable webhooks.

use anyhow::Context;
use std::time::Duration;

use hooks_core::PocketBaseConfig;
use hooks_mail::MailConfig;
use hooks_payments::{CheckoutConfig, ReconcilerConfig, StripeConfig};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:8090";
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 10;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: String,
    pub stripe: StripeConfig,
    pub checkout: CheckoutConfig,
    pub mail: MailConfig,
    /// `None` runs against the in-memory store
    pub pocketbase: Option<PocketBaseConfig>,
    pub reconciler: ReconcilerConfig,
    /// Prefix for rewritten file URLs
    pub public_base_url: String,
    /// Deadline for provider and store calls
    pub upstream_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let upstream_timeout = match std::env::var("UPSTREAM_TIMEOUT_SECS") {
            Ok(secs) => Duration::from_secs(
                secs.trim()
                    .parse()
                    .with_context(|| format!("UPSTREAM_TIMEOUT_SECS '{secs}' is not a number"))?,
            ),
            Err(_) => Duration::from_secs(DEFAULT_UPSTREAM_TIMEOUT_SECS),
        };

        let stripe = StripeConfig::from_env().context("Stripe configuration")?;

        let mut checkout = CheckoutConfig::from_env().context("checkout configuration")?;
        checkout.timeout = upstream_timeout;

        let mail = MailConfig::from_env().context("mail configuration")?;

        let pocketbase = PocketBaseConfig::from_env().map(|pb| PocketBaseConfig {
            timeout: upstream_timeout,
            ..pb
        });

        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .ok()
            .filter(|u| !u.trim().is_empty())
            .or_else(|| pocketbase.as_ref().map(|pb| pb.base_url.clone()))
            .unwrap_or_else(|| DEFAULT_PUBLIC_BASE_URL.into());

        Ok(Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.into()),
            stripe,
            checkout,
            mail,
            pocketbase,
            reconciler: ReconcilerConfig::from_env(),
            public_base_url,
            upstream_timeout,
        })
    }
}
