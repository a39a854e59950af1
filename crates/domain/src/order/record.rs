//! Order record as embedded in its owner's document.

use chrono::{DateTime, Utc};
use common::OrderId;
use serde::{Deserialize, Serialize};

use super::{CreateOrder, Currency, Money, OrderError, OrderStatus, Product, Provider};

/// A purchase order owned by exactly one principal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Locally generated identifier, unique within the owner's collection.
    pub order_id: OrderId,

    /// Total charged for the order.
    pub total_amount: Money,

    /// Currency fixed at creation.
    pub currency: Currency,

    /// Caller-supplied line items.
    pub products: Vec<Product>,

    /// Current lifecycle status.
    pub status: OrderStatus,

    /// Creation time, used only for recency ordering.
    pub created_at: DateTime<Utc>,

    /// Provider the payment was created against.
    pub provider: Provider,

    /// Provider-side identifier (payment intent or remote order ID).
    pub provider_reference: String,
}

impl Order {
    /// Builds a `Created` order once the provider accepted the payment.
    pub fn created(
        cmd: CreateOrder,
        provider: Provider,
        provider_reference: impl Into<String>,
    ) -> Self {
        Self {
            order_id: cmd.order_id,
            total_amount: cmd.total_amount,
            currency: Currency::Usd,
            products: cmd.products,
            status: OrderStatus::Created,
            created_at: Utc::now(),
            provider,
            provider_reference: provider_reference.into(),
        }
    }

    /// Moves the order to `target`.
    ///
    /// Returns `Ok(true)` if the status changed and `Ok(false)` if the order
    /// already was in `target`.
    pub fn advance_to(&mut self, target: OrderStatus) -> Result<bool, OrderError> {
        if !self.status.can_advance_to(target) {
            return Err(OrderError::InvalidStatusTransition {
                from: self.status,
                to: target,
            });
        }
        let changed = self.status != target;
        self.status = target;
        Ok(changed)
    }

    pub fn is_paid(&self) -> bool {
        self.status == OrderStatus::Paid
    }
}
