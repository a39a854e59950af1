//! Shared application state.

use std::sync::Arc;

use domain::JwtAuth;
use order_store::OrderStore;
use payments::{CaptureGateway, OrderLifecycle, PaymentGateway, SignatureVerifier, WebhookIngestor};

/// Lifecycle manager with the provider gateways chosen at start-up.
pub type Lifecycle<S> = OrderLifecycle<S, Arc<dyn PaymentGateway>, Arc<dyn CaptureGateway>>;

/// Shared application state accessible from all handlers.
pub struct AppState<S: OrderStore> {
    pub auth: JwtAuth,
    pub lifecycle: Arc<Lifecycle<S>>,
    pub webhooks: WebhookIngestor<Arc<Lifecycle<S>>>,
}

impl<S: OrderStore> AppState<S> {
    pub fn new(
        store: S,
        push: Arc<dyn PaymentGateway>,
        pull: Arc<dyn CaptureGateway>,
        auth: JwtAuth,
        verifier: SignatureVerifier,
    ) -> Self {
        let lifecycle = Arc::new(OrderLifecycle::new(store, push, pull));
        Self {
            auth,
            webhooks: WebhookIngestor::new(verifier, lifecycle.clone()),
            lifecycle,
        }
    }
}
