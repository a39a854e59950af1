//! Payment-order reconciliation.
//!
//! Orders are created against one of two providers and reach `Paid` by
//! one of two routes:
//! 1. Push confirmation: the client pays the provider directly and the
//!    provider reports success through a signed webhook.
//! 2. Pull confirmation: the client approves the payment with the provider
//!    and the server captures it explicitly.
//!
//! Either way the local order is only ever touched through the store's
//! atomic conditional update, so duplicate and out-of-order confirmations
//! are harmless.

pub mod error;
pub mod gateway;
pub mod lifecycle;
pub mod webhook;

pub use error::{PaymentError, ProviderError};
pub use gateway::{
    CaptureGateway, CapturedPayment, Correlation, CreatedPayment, Handoff,
    InMemoryPayPalGateway, InMemoryStripeGateway, Link, PayPalGateway, PayPalSettings,
    PaymentGateway, PaymentRequest, StripeGateway, StripeSettings,
};
pub use lifecycle::{CapturedOrder, ConfirmationSource, CreatedOrder, OrderLifecycle};
pub use webhook::{
    PaymentConfirmer, SignatureError, SignatureVerifier, WebhookIngestor, WebhookOutcome,
};
