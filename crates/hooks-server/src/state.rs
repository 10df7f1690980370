//! Application State

use std::sync::Arc;

use hooks_core::RecordStore;
use hooks_mail::{MailSender, Notifier, NotifierConfig};
use hooks_payments::{
    CheckoutConfig, CheckoutProvider, CheckoutSessionCreator, Reconciler, ReconcilerConfig, SignatureVerifier,
    WebhookDispatcher,
};

use crate::pipeline::CreatePipeline;

/// External collaborators, swapped for in-memory doubles in tests
pub struct Services {
    pub store: Arc<dyn RecordStore>,
    pub checkout: Arc<dyn CheckoutProvider>,
    pub mailer: Arc<dyn MailSender>,
}

/// Plain settings the state is assembled from
pub struct Settings {
    pub checkout: CheckoutConfig,
    pub notifier: NotifierConfig,
    pub reconciler: ReconcilerConfig,
    pub webhook_secret: String,
    pub public_base_url: String,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub pipeline: Arc<CreatePipeline>,
    pub webhooks: Arc<WebhookDispatcher>,
    pub notifier: Arc<Notifier>,
    pub public_base_url: Arc<str>,
}

impl AppState {
    pub fn new(services: Services, settings: Settings) -> hooks_payments::Result<Self> {
        let Services { store, checkout, mailer } = services;

        let notifier = Arc::new(Notifier::new(mailer, settings.notifier));
        let checkout = CheckoutSessionCreator::new(checkout, settings.checkout);
        let pipeline = Arc::new(CreatePipeline::new(store.clone(), checkout, notifier.clone()));

        let reconciler = Arc::new(Reconciler::new(store.clone(), settings.reconciler));
        let verifier = SignatureVerifier::new(settings.webhook_secret)?;
        let webhooks = Arc::new(WebhookDispatcher::new(verifier, reconciler));

        Ok(Self {
            store,
            pipeline,
            webhooks,
            notifier,
            public_base_url: settings.public_base_url.trim_end_matches('/').into(),
        })
    }
}
