//! In-memory gateways for tests and local runs without provider credentials.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::OrderId;
use domain::Provider;
use tokio::sync::Mutex;

use super::{
    CaptureGateway, CapturedPayment, CreatedPayment, Handoff, Link, PaymentGateway,
    PaymentRequest,
};
use crate::error::ProviderError;

#[derive(Debug, Default)]
struct StripeState {
    next_id: u32,
    requests: Vec<PaymentRequest>,
    fail_on_create: bool,
}

/// Push-provider double that hands out sequential intent IDs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStripeGateway {
    state: Arc<Mutex<StripeState>>,
}

impl InMemoryStripeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent create calls fail as a declined card would.
    pub async fn set_fail_on_create(&self, fail: bool) {
        self.state.lock().await.fail_on_create = fail;
    }

    /// Returns every request that produced a payment intent.
    pub async fn requests(&self) -> Vec<PaymentRequest> {
        self.state.lock().await.requests.clone()
    }
}

#[async_trait]
impl PaymentGateway for InMemoryStripeGateway {
    fn provider(&self) -> Provider {
        Provider::Stripe
    }

    async fn create_payment(
        &self,
        request: &PaymentRequest,
    ) -> Result<CreatedPayment, ProviderError> {
        let mut state = self.state.lock().await;

        if state.fail_on_create {
            return Err(ProviderError::Rejected {
                provider: Provider::Stripe,
                operation: "create payment intent",
                status: 402,
                body: r#"{"error":{"code":"card_declined"}}"#.to_string(),
            });
        }

        state.next_id += 1;
        let intent_id = format!("pi_{:04}", state.next_id);
        state.requests.push(request.clone());

        Ok(CreatedPayment {
            handoff: Handoff::ClientSecret(format!("{intent_id}_secret_test")),
            remote_reference: intent_id,
        })
    }
}

#[derive(Debug)]
struct RemoteOrder {
    order_id: OrderId,
    captured: bool,
}

#[derive(Debug, Default)]
struct PayPalState {
    next_id: u32,
    orders: HashMap<String, RemoteOrder>,
    fail_on_create: bool,
    fail_on_capture: bool,
    omit_reference: bool,
}

/// Pull-provider double.
///
/// Remote orders count as approved as soon as they are created. Capturing
/// an unknown order answers 404 and capturing twice answers 422, as the
/// real provider does.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPayPalGateway {
    state: Arc<Mutex<PayPalState>>,
}

impl InMemoryPayPalGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail_on_create(&self, fail: bool) {
        self.state.lock().await.fail_on_create = fail;
    }

    pub async fn set_fail_on_capture(&self, fail: bool) {
        self.state.lock().await.fail_on_capture = fail;
    }

    /// Stops echoing the local order ID in capture responses.
    pub async fn set_omit_reference(&self, omit: bool) {
        self.state.lock().await.omit_reference = omit;
    }

    /// Returns the number of remote orders created.
    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }

    /// Returns true if the remote order exists and has been captured.
    pub async fn is_captured(&self, remote_order_id: &str) -> bool {
        self.state
            .lock()
            .await
            .orders
            .get(remote_order_id)
            .is_some_and(|o| o.captured)
    }

    fn rejected(status: u16, name: &str) -> ProviderError {
        ProviderError::Rejected {
            provider: Provider::PayPal,
            operation: "capture order",
            status,
            body: format!(r#"{{"name":"{name}"}}"#),
        }
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPayPalGateway {
    fn provider(&self) -> Provider {
        Provider::PayPal
    }

    async fn create_payment(
        &self,
        request: &PaymentRequest,
    ) -> Result<CreatedPayment, ProviderError> {
        let mut state = self.state.lock().await;

        if state.fail_on_create {
            return Err(ProviderError::Transport {
                provider: Provider::PayPal,
                operation: "create order",
                message: "connection refused".to_string(),
            });
        }

        state.next_id += 1;
        let remote_id = format!("PAYPAL-{:04}", state.next_id);
        state.orders.insert(
            remote_id.clone(),
            RemoteOrder {
                order_id: request.correlation.order_id,
                captured: false,
            },
        );

        let approval_url = format!("https://www.sandbox.paypal.com/checkoutnow?token={remote_id}");
        let links = vec![
            Link {
                href: format!("https://api-m.sandbox.paypal.com/v2/checkout/orders/{remote_id}"),
                rel: "self".to_string(),
                method: Some("GET".to_string()),
            },
            Link {
                href: approval_url.clone(),
                rel: "approve".to_string(),
                method: Some("GET".to_string()),
            },
            Link {
                href: format!(
                    "https://api-m.sandbox.paypal.com/v2/checkout/orders/{remote_id}/capture"
                ),
                rel: "capture".to_string(),
                method: Some("POST".to_string()),
            },
        ];

        Ok(CreatedPayment {
            remote_reference: remote_id,
            handoff: Handoff::Approval {
                approval_url,
                links,
            },
        })
    }
}

#[async_trait]
impl CaptureGateway for InMemoryPayPalGateway {
    async fn capture_payment(
        &self,
        remote_order_id: &str,
    ) -> Result<CapturedPayment, ProviderError> {
        let mut state = self.state.lock().await;
        let fail_on_capture = state.fail_on_capture;
        let omit_reference = state.omit_reference;

        let order = state
            .orders
            .get_mut(remote_order_id)
            .ok_or_else(|| Self::rejected(404, "RESOURCE_NOT_FOUND"))?;

        if fail_on_capture {
            return Err(Self::rejected(422, "INSTRUMENT_DECLINED"));
        }
        if order.captured {
            return Err(Self::rejected(422, "ORDER_ALREADY_CAPTURED"));
        }

        order.captured = true;
        Ok(CapturedPayment {
            capture_id: format!("CAPTURE-{remote_order_id}"),
            order_id: (!omit_reference).then_some(order.order_id),
        })
    }
}
