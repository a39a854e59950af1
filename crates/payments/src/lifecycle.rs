//! Order lifecycle manager.

use std::time::Instant;

use async_trait::async_trait;
use common::OrderId;
use domain::{CreateOrder, Currency, Order, OrderStatus, Principal, Provider};
use order_store::{OrderStore, UpdateOutcome};

use crate::error::{PaymentError, ProviderError, Result};
use crate::gateway::{CaptureGateway, Correlation, Handoff, PaymentGateway, PaymentRequest};
use crate::webhook::PaymentConfirmer;

/// Route by which a payment confirmation arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationSource {
    /// Signed push event from the provider.
    Webhook,
    /// Explicit capture requested by the order's owner.
    Capture,
}

impl ConfirmationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfirmationSource::Webhook => "webhook",
            ConfirmationSource::Capture => "capture",
        }
    }
}

/// A persisted order together with what the client needs to pay for it.
#[derive(Debug, Clone)]
pub struct CreatedOrder {
    pub order_id: OrderId,
    pub provider: Provider,
    pub remote_reference: String,
    pub handoff: Handoff,
}

/// A captured pull payment and the local order it settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedOrder {
    pub capture_id: String,
    pub order_id: OrderId,
}

/// Drives orders from creation to `Paid`.
///
/// `P` is the push-confirmation provider and `Q` the pull-confirmation
/// provider. Gateways are injected once and never hold a lock across a
/// remote call; concurrent requests only meet in the store.
pub struct OrderLifecycle<S, P, Q>
where
    S: OrderStore,
    P: PaymentGateway,
    Q: CaptureGateway,
{
    store: S,
    push: P,
    pull: Q,
}

impl<S, P, Q> OrderLifecycle<S, P, Q>
where
    S: OrderStore,
    P: PaymentGateway,
    Q: CaptureGateway,
{
    pub fn new(store: S, push: P, pull: Q) -> Self {
        Self { store, push, pull }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn gateway(&self, provider: Provider) -> &dyn PaymentGateway {
        match provider {
            Provider::Stripe => &self.push,
            Provider::PayPal => &self.pull,
        }
    }

    /// Creates a remote payment and then persists the order as `Created`.
    ///
    /// The order ID is already fixed in `cmd`, so it travels to the provider
    /// as correlation metadata. Nothing is stored if the provider call fails.
    #[tracing::instrument(skip(self, cmd), fields(order_id = %cmd.order_id))]
    pub async fn create_order(
        &self,
        principal: &Principal,
        provider: Provider,
        cmd: CreateOrder,
    ) -> Result<CreatedOrder> {
        let request = PaymentRequest {
            amount: cmd.total_amount,
            currency: Currency::Usd,
            correlation: Correlation::new(principal, cmd.order_id),
        };

        let created = observe(
            provider,
            "create",
            self.gateway(provider).create_payment(&request),
        )
        .await
        .inspect_err(|err| tracing::warn!(error = %err, "payment creation failed"))?;

        let order_id = cmd.order_id;
        let order = Order::created(cmd, provider, created.remote_reference.as_str());
        if let Err(err) = self.store.append(principal, order).await {
            tracing::error!(
                remote_reference = %created.remote_reference,
                error = %err,
                "remote payment created but order could not be stored"
            );
            return Err(err.into());
        }

        metrics::counter!("orders_created_total", "provider" => provider.as_str()).increment(1);
        tracing::info!(remote_reference = %created.remote_reference, "order created");

        Ok(CreatedOrder {
            order_id,
            provider,
            remote_reference: created.remote_reference,
            handoff: created.handoff,
        })
    }

    /// Marks the owner's order `Paid`.
    ///
    /// Idempotent: confirming an already paid order reports `Unchanged`. An
    /// unknown owner or order reports `NotMatched` rather than failing.
    #[tracing::instrument(skip(self))]
    pub async fn confirm_payment(
        &self,
        owner: &Principal,
        order_id: OrderId,
        source: ConfirmationSource,
    ) -> Result<UpdateOutcome> {
        let outcome = self
            .store
            .update_status(owner, order_id, OrderStatus::Paid)
            .await?;

        match outcome {
            UpdateOutcome::Updated => {
                metrics::counter!("orders_paid_total", "source" => source.as_str()).increment(1);
                tracing::info!("order paid");
            }
            UpdateOutcome::Unchanged => tracing::debug!("order already paid"),
            UpdateOutcome::NotMatched => tracing::warn!("payment confirmation matched no order"),
        }

        Ok(outcome)
    }

    /// Captures an approved pull payment and marks its order `Paid`.
    ///
    /// The order is located by the reference the provider echoes back. When
    /// the response carries none, the principal's most recent order is used
    /// instead, which can pick the wrong order if the principal created
    /// several concurrently.
    #[tracing::instrument(skip(self))]
    pub async fn capture_order(
        &self,
        principal: &Principal,
        remote_order_id: &str,
    ) -> Result<CapturedOrder> {
        let captured = observe(
            self.pull.provider(),
            "capture",
            self.pull.capture_payment(remote_order_id),
        )
        .await
        .inspect_err(|err| tracing::warn!(error = %err, "capture failed"))?;

        let order_id = match captured.order_id {
            Some(order_id) => order_id,
            None => {
                tracing::warn!(
                    capture_id = %captured.capture_id,
                    "capture carried no order reference, falling back to most recent order"
                );
                self.store
                    .find_most_recent(principal)
                    .await?
                    .ok_or_else(|| PaymentError::NotFound(format!("no orders for {principal}")))?
                    .order_id
            }
        };

        let outcome = self
            .confirm_payment(principal, order_id, ConfirmationSource::Capture)
            .await?;
        if !outcome.matched() {
            return Err(PaymentError::NotFound(format!(
                "order {order_id} for {principal}"
            )));
        }

        Ok(CapturedOrder {
            capture_id: captured.capture_id,
            order_id,
        })
    }

    /// Lists the principal's orders, newest first.
    pub async fn list_orders(&self, principal: &Principal) -> Result<Vec<Order>> {
        Ok(self.store.list(principal).await?)
    }
}

#[async_trait]
impl<S, P, Q> PaymentConfirmer for OrderLifecycle<S, P, Q>
where
    S: OrderStore,
    P: PaymentGateway,
    Q: CaptureGateway,
{
    async fn confirm_payment(
        &self,
        owner: &Principal,
        order_id: OrderId,
        source: ConfirmationSource,
    ) -> Result<UpdateOutcome> {
        OrderLifecycle::confirm_payment(self, owner, order_id, source).await
    }
}

/// Records call count, outcome and latency for one provider call.
async fn observe<T>(
    provider: Provider,
    operation: &'static str,
    call: impl Future<Output = std::result::Result<T, ProviderError>>,
) -> std::result::Result<T, ProviderError> {
    let start = Instant::now();
    let result = call.await;
    let outcome = if result.is_ok() { "success" } else { "failure" };

    metrics::counter!(
        "provider_calls_total",
        "provider" => provider.as_str(),
        "operation" => operation,
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!(
        "provider_call_duration_seconds",
        "provider" => provider.as_str(),
        "operation" => operation
    )
    .record(start.elapsed().as_secs_f64());

    result
}
