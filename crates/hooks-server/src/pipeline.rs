//! Record Create Pipeline
//!
//! Only collections with a create hook accept records through this service;
//! every other collection stays behind the backend's own access rules.
//!
//! Every create runs three phases in order:
//!
//! 1. **prepare** - assign the id, normalise the collection name and run the
//!    hook's checks (carts get their checkout link here)
//! 2. **persist** - insert into the store
//! 3. **notify** - queue mail for inquiry collections
//!
//! A failure in phase 1 or 2 means nothing was stored. Phase 3 runs on its own
//! task after the response is decided and never undoes phase 2.

use std::sync::Arc;

use hooks_core::{Record, RecordStore};
use hooks_mail::{InquiryKind, Notifier};
use hooks_payments::{CheckoutSessionCreator, PaymentError, cart};

use crate::error::ApiError;

/// Create hook for a collection that accepts public submissions
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollectionHook {
    Cart,
    Inquiry(InquiryKind),
}

impl CollectionHook {
    /// `None` for collections that cannot be created through this service
    pub fn for_collection(collection: &str) -> Option<Self> {
        if collection.eq_ignore_ascii_case(cart::CART_COLLECTION) {
            Some(Self::Cart)
        } else {
            InquiryKind::from_collection(collection).map(Self::Inquiry)
        }
    }

    /// Collection name records are stored under
    pub const fn collection(self) -> &'static str {
        match self {
            Self::Cart => cart::CART_COLLECTION,
            Self::Inquiry(kind) => kind.collection(),
        }
    }
}

pub struct CreatePipeline {
    store: Arc<dyn RecordStore>,
    checkout: CheckoutSessionCreator,
    notifier: Arc<Notifier>,
}

impl CreatePipeline {
    pub fn new(store: Arc<dyn RecordStore>, checkout: CheckoutSessionCreator, notifier: Arc<Notifier>) -> Self {
        Self {
            store,
            checkout,
            notifier,
        }
    }

    /// Run all phases for a new record and return what was stored
    pub async fn create(&self, record: Record) -> Result<Record, ApiError> {
        let hook = CollectionHook::for_collection(&record.collection)
            .ok_or_else(|| ApiError::CollectionNotFound(record.collection.clone()))?;

        let record = self.prepare(hook, record).await?;
        let stored = self.store.insert(&record).await?;
        tracing::info!(collection = %stored.collection, id = %stored.id, "Record created");

        self.notify(hook, &stored);

        Ok(stored)
    }

    async fn prepare(&self, hook: CollectionHook, mut record: Record) -> Result<Record, PaymentError> {
        hook.collection().clone_into(&mut record.collection);
        record.ensure_id();

        if hook == CollectionHook::Cart {
            // A client cannot create an already-paid cart
            record.set(cart::FIELD_IS_PAID, false);
            let cart = self.checkout.attach_payment_link(&mut record).await?;
            tracing::debug!(
                cart_id = %cart.id,
                method = cart.payment_method.as_str(),
                amount = cart.amount_minor,
                "Cart prepared"
            );
        }

        Ok(record)
    }

    fn notify(&self, hook: CollectionHook, record: &Record) {
        let CollectionHook::Inquiry(kind) = hook else {
            return;
        };

        tracing::debug!(collection = %record.collection, id = %record.id, "Queueing inquiry notification");
        self.notifier.dispatch(self.notifier.inquiry_message(kind, record));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_hooks() {
        assert_eq!(CollectionHook::for_collection("cart"), Some(CollectionHook::Cart));
        assert_eq!(
            CollectionHook::for_collection("WeddingCakeInquiry"),
            Some(CollectionHook::Inquiry(InquiryKind::WeddingCake))
        );
        assert_eq!(
            CollectionHook::for_collection("inquiry"),
            Some(CollectionHook::Inquiry(InquiryKind::General))
        );
    }

    #[test]
    fn test_unhooked_collections_are_closed() {
        for collection in ["Shop", "_superusers", "users", "payment", "notes", ""] {
            assert_eq!(CollectionHook::for_collection(collection), None, "{collection}");
        }
    }

    #[test]
    fn test_canonical_collection_names() {
        assert_eq!(CollectionHook::for_collection("CART").map(CollectionHook::collection), Some("cart"));
        assert_eq!(
            CollectionHook::for_collection("tasterboxinquiry").map(CollectionHook::collection),
            Some("TasterBoxInquiry")
        );
    }
}
