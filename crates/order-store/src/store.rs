use async_trait::async_trait;
use common::OrderId;
use domain::{Order, OrderStatus, Principal};

use crate::Result;

/// Outcome of a conditional status update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The order matched and its status moved forward.
    Updated,
    /// The order matched and already had the target status.
    Unchanged,
    /// No order matched the owner, order ID and transition condition.
    NotMatched,
}

impl UpdateOutcome {
    /// Returns true if an order matched, whether or not it changed.
    pub fn matched(&self) -> bool {
        !matches!(self, UpdateOutcome::NotMatched)
    }
}

/// Core trait for order store implementations.
///
/// Orders live in one collection per principal. Every operation is scoped
/// to the owning principal, and each mutation is atomic on its own: the
/// store is the only place where concurrent requests meet.
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Appends an order to the owner's collection.
    ///
    /// Creates the collection on first use. Fails with `DuplicateOrder` if
    /// the order ID is already present for this owner.
    async fn append(&self, owner: &Principal, order: Order) -> Result<()>;

    /// Moves the matching order to `status`.
    ///
    /// The update is conditioned on the owner, the order ID and the current
    /// status being at or before `status`; a request that would move the
    /// order backwards does not match.
    async fn update_status(
        &self,
        owner: &Principal,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<UpdateOutcome>;

    /// Returns the owner's most recently created order.
    ///
    /// Recency is by `created_at`, ties broken by insertion order.
    async fn find_most_recent(&self, owner: &Principal) -> Result<Option<Order>>;

    /// Retrieves a single order.
    async fn get(&self, owner: &Principal, order_id: OrderId) -> Result<Option<Order>>;

    /// Lists the owner's orders, newest first.
    async fn list(&self, owner: &Principal) -> Result<Vec<Order>>;
}
