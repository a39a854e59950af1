//! Provider gateway traits and implementations.
//!
//! `PaymentGateway` is the capability every provider has: create a remote
//! payment for a local order. Providers that separate approval from
//! settlement also implement `CaptureGateway`.

mod memory;
mod paypal;
mod stripe;

use std::sync::Arc;

use async_trait::async_trait;
use common::{OrderId, SubjectId};
use domain::{Currency, Money, Principal, Provider, Role};
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

pub use memory::{InMemoryPayPalGateway, InMemoryStripeGateway};
pub use paypal::{PayPalGateway, PayPalSettings};
pub use stripe::{StripeGateway, StripeSettings};

/// Identifiers attached to a remote payment so that later events can be
/// mapped back to the local order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correlation {
    pub role: Role,
    pub subject_id: SubjectId,
    pub order_id: OrderId,
}

impl Correlation {
    pub fn new(owner: &Principal, order_id: OrderId) -> Self {
        Self {
            role: owner.role,
            subject_id: owner.subject_id.clone(),
            order_id,
        }
    }

    /// The principal that owns the correlated order.
    pub fn owner(&self) -> Principal {
        Principal::new(self.role, self.subject_id.clone())
    }
}

/// A request to create a remote payment.
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub amount: Money,
    pub currency: Currency,
    pub correlation: Correlation,
}

/// A hypermedia link returned by the pull provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    pub rel: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

/// What the client needs to complete payment with the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handoff {
    /// Push provider: secret the front-end confirms the payment with.
    ClientSecret(String),
    /// Pull provider: page the payer must visit to approve the payment.
    Approval {
        approval_url: String,
        links: Vec<Link>,
    },
}

/// A remote payment created by a gateway.
#[derive(Debug, Clone)]
pub struct CreatedPayment {
    /// Provider-side identifier of the payment (intent or remote order).
    pub remote_reference: String,
    pub handoff: Handoff,
}

/// A settled capture returned by a pull provider.
#[derive(Debug, Clone)]
pub struct CapturedPayment {
    pub capture_id: String,
    /// Local order ID echoed back by the provider, when it does.
    pub order_id: Option<OrderId>,
}

/// Capability shared by every payment provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn provider(&self) -> Provider;

    /// Creates a remote payment carrying `request.correlation` as metadata.
    async fn create_payment(&self, request: &PaymentRequest)
    -> Result<CreatedPayment, ProviderError>;
}

/// Providers that settle only on an explicit capture call.
#[async_trait]
pub trait CaptureGateway: PaymentGateway {
    /// Captures a payer-approved remote order.
    async fn capture_payment(&self, remote_order_id: &str)
    -> Result<CapturedPayment, ProviderError>;
}

#[async_trait]
impl<T: PaymentGateway + ?Sized> PaymentGateway for Arc<T> {
    fn provider(&self) -> Provider {
        (**self).provider()
    }

    async fn create_payment(
        &self,
        request: &PaymentRequest,
    ) -> Result<CreatedPayment, ProviderError> {
        (**self).create_payment(request).await
    }
}

#[async_trait]
impl<T: CaptureGateway + ?Sized> CaptureGateway for Arc<T> {
    async fn capture_payment(
        &self,
        remote_order_id: &str,
    ) -> Result<CapturedPayment, ProviderError> {
        (**self).capture_payment(remote_order_id).await
    }
}

/// Reads a non-success response into a `Rejected` error.
async fn rejected(
    provider: Provider,
    operation: &'static str,
    response: reqwest::Response,
) -> ProviderError {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .unwrap_or_else(|e| format!("<unreadable body: {e}>"));
    ProviderError::Rejected {
        provider,
        operation,
        status,
        body,
    }
}
