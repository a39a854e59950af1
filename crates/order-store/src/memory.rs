use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::OrderId;
use domain::{Order, OrderStatus, Principal};
use tokio::sync::RwLock;

use crate::{
    OrderStoreError, Result,
    store::{OrderStore, UpdateOutcome},
};

#[derive(Default)]
struct Documents {
    /// One document per principal; orders kept in insertion order.
    orders: HashMap<Principal, Vec<Order>>,
    unavailable: bool,
}

/// In-memory order store implementation.
///
/// Provides the same interface as the PostgreSQL implementation. A single
/// write lock around each mutation gives the same per-document atomicity.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    documents: Arc<RwLock<Documents>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of orders stored across all principals.
    pub async fn order_count(&self) -> usize {
        self.documents
            .read()
            .await
            .orders
            .values()
            .map(Vec::len)
            .sum()
    }

    /// Makes every subsequent operation fail with `Unavailable`.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.documents.write().await.unavailable = unavailable;
    }

    fn check_available(documents: &Documents) -> Result<()> {
        if documents.unavailable {
            return Err(OrderStoreError::Unavailable(
                "in-memory store switched off".to_string(),
            ));
        }
        Ok(())
    }
}

/// Indices of `orders` from newest to oldest.
fn newest_first(orders: &[Order]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..orders.len()).collect();
    indices.sort_by_key(|&i| std::cmp::Reverse((orders[i].created_at, i)));
    indices
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn append(&self, owner: &Principal, order: Order) -> Result<()> {
        let mut documents = self.documents.write().await;
        Self::check_available(&documents)?;

        let collection = documents.orders.entry(owner.clone()).or_default();
        if collection.iter().any(|o| o.order_id == order.order_id) {
            return Err(OrderStoreError::DuplicateOrder {
                owner: owner.to_string(),
                order_id: order.order_id,
            });
        }

        collection.push(order);
        Ok(())
    }

    async fn update_status(
        &self,
        owner: &Principal,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<UpdateOutcome> {
        let mut documents = self.documents.write().await;
        Self::check_available(&documents)?;

        let Some(order) = documents
            .orders
            .get_mut(owner)
            .and_then(|orders| orders.iter_mut().find(|o| o.order_id == order_id))
        else {
            return Ok(UpdateOutcome::NotMatched);
        };

        Ok(match order.advance_to(status) {
            Ok(true) => UpdateOutcome::Updated,
            Ok(false) => UpdateOutcome::Unchanged,
            Err(_) => UpdateOutcome::NotMatched,
        })
    }

    async fn find_most_recent(&self, owner: &Principal) -> Result<Option<Order>> {
        let documents = self.documents.read().await;
        Self::check_available(&documents)?;

        Ok(documents.orders.get(owner).and_then(|orders| {
            newest_first(orders)
                .first()
                .map(|&i| orders[i].clone())
        }))
    }

    async fn get(&self, owner: &Principal, order_id: OrderId) -> Result<Option<Order>> {
        let documents = self.documents.read().await;
        Self::check_available(&documents)?;

        Ok(documents
            .orders
            .get(owner)
            .and_then(|orders| orders.iter().find(|o| o.order_id == order_id))
            .cloned())
    }

    async fn list(&self, owner: &Principal) -> Result<Vec<Order>> {
        let documents = self.documents.read().await;
        Self::check_available(&documents)?;

        Ok(documents
            .orders
            .get(owner)
            .map(|orders| {
                newest_first(orders)
                    .into_iter()
                    .map(|i| orders[i].clone())
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use domain::{CreateOrder, Money, Provider};

    use super::*;

    fn create_test_order(reference: &str) -> Order {
        let cmd = CreateOrder::new(Money::from_cents(4999), vec!["sku-1".into()]).unwrap();
        Order::created(cmd, Provider::Stripe, reference)
    }

    #[tokio::test]
    async fn append_and_get_order() {
        let store = InMemoryOrderStore::new();
        let owner = Principal::user("u-1");
        let order = create_test_order("pi_1");
        let order_id = order.order_id;

        store.append(&owner, order).await.unwrap();

        let stored = store.get(&owner, order_id).await.unwrap().unwrap();
        assert_eq!(stored.provider_reference, "pi_1");
        assert_eq!(stored.status, OrderStatus::Created);
        assert_eq!(store.order_count().await, 1);
    }

    #[tokio::test]
    async fn duplicate_order_id_rejected() {
        let store = InMemoryOrderStore::new();
        let owner = Principal::user("u-1");
        let order = create_test_order("pi_1");

        store.append(&owner, order.clone()).await.unwrap();
        let result = store.append(&owner, order).await;

        assert!(matches!(
            result,
            Err(OrderStoreError::DuplicateOrder { .. })
        ));
        assert_eq!(store.order_count().await, 1);
    }

    #[tokio::test]
    async fn collections_are_scoped_to_principal() {
        let store = InMemoryOrderStore::new();
        let user = Principal::user("same-id");
        let vendor = Principal::vendor("same-id");
        let order = create_test_order("pi_1");
        let order_id = order.order_id;

        store.append(&user, order).await.unwrap();

        assert!(store.get(&vendor, order_id).await.unwrap().is_none());
        let outcome = store
            .update_status(&vendor, order_id, OrderStatus::Paid)
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::NotMatched);
        assert_eq!(
            store.get(&user, order_id).await.unwrap().unwrap().status,
            OrderStatus::Created
        );
    }

    #[tokio::test]
    async fn update_status_is_idempotent() {
        let store = InMemoryOrderStore::new();
        let owner = Principal::user("u-1");
        let order = create_test_order("pi_1");
        let order_id = order.order_id;
        store.append(&owner, order).await.unwrap();

        let first = store
            .update_status(&owner, order_id, OrderStatus::Paid)
            .await
            .unwrap();
        let second = store
            .update_status(&owner, order_id, OrderStatus::Paid)
            .await
            .unwrap();

        assert_eq!(first, UpdateOutcome::Updated);
        assert_eq!(second, UpdateOutcome::Unchanged);
        assert!(second.matched());
    }

    #[tokio::test]
    async fn update_status_never_regresses() {
        let store = InMemoryOrderStore::new();
        let owner = Principal::user("u-1");
        let order = create_test_order("pi_1");
        let order_id = order.order_id;
        store.append(&owner, order).await.unwrap();
        store
            .update_status(&owner, order_id, OrderStatus::Paid)
            .await
            .unwrap();

        let outcome = store
            .update_status(&owner, order_id, OrderStatus::Created)
            .await
            .unwrap();

        assert_eq!(outcome, UpdateOutcome::NotMatched);
        assert_eq!(
            store.get(&owner, order_id).await.unwrap().unwrap().status,
            OrderStatus::Paid
        );
    }

    #[tokio::test]
    async fn update_unknown_order_is_not_matched() {
        let store = InMemoryOrderStore::new();
        let outcome = store
            .update_status(&Principal::user("ghost"), OrderId::new(), OrderStatus::Paid)
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::NotMatched);
    }

    #[tokio::test]
    async fn find_most_recent_uses_created_at() {
        let store = InMemoryOrderStore::new();
        let owner = Principal::user("u-1");

        let mut newer = create_test_order("pi_newer");
        let mut older = create_test_order("pi_older");
        let now = Utc::now();
        newer.created_at = now;
        older.created_at = now - Duration::minutes(5);

        // Insert the newer order first so insertion order alone would be wrong.
        store.append(&owner, newer).await.unwrap();
        store.append(&owner, older).await.unwrap();

        let recent = store.find_most_recent(&owner).await.unwrap().unwrap();
        assert_eq!(recent.provider_reference, "pi_newer");
    }

    #[tokio::test]
    async fn find_most_recent_breaks_ties_by_insertion() {
        let store = InMemoryOrderStore::new();
        let owner = Principal::user("u-1");
        let now = Utc::now();

        let mut first = create_test_order("pi_first");
        let mut second = create_test_order("pi_second");
        first.created_at = now;
        second.created_at = now;
        store.append(&owner, first).await.unwrap();
        store.append(&owner, second).await.unwrap();

        let recent = store.find_most_recent(&owner).await.unwrap().unwrap();
        assert_eq!(recent.provider_reference, "pi_second");
    }

    #[tokio::test]
    async fn find_most_recent_on_empty_collection() {
        let store = InMemoryOrderStore::new();
        let recent = store.find_most_recent(&Principal::user("u-1")).await.unwrap();
        assert!(recent.is_none());
    }

    #[tokio::test]
    async fn list_returns_newest_first() {
        let store = InMemoryOrderStore::new();
        let owner = Principal::user("u-1");
        let now = Utc::now();

        for (i, reference) in ["pi_a", "pi_b", "pi_c"].iter().enumerate() {
            let mut order = create_test_order(reference);
            order.created_at = now + Duration::seconds(i as i64);
            store.append(&owner, order).await.unwrap();
        }

        let orders = store.list(&owner).await.unwrap();
        let references: Vec<_> = orders.iter().map(|o| o.provider_reference.as_str()).collect();
        assert_eq!(references, vec!["pi_c", "pi_b", "pi_a"]);
        assert!(store.list(&Principal::user("other")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_operation() {
        let store = InMemoryOrderStore::new();
        let owner = Principal::user("u-1");
        store.set_unavailable(true).await;

        assert!(matches!(
            store.append(&owner, create_test_order("pi_1")).await,
            Err(OrderStoreError::Unavailable(_))
        ));
        assert!(matches!(
            store
                .update_status(&owner, OrderId::new(), OrderStatus::Paid)
                .await,
            Err(OrderStoreError::Unavailable(_))
        ));

        store.set_unavailable(false).await;
        assert!(store.append(&owner, create_test_order("pi_1")).await.is_ok());
    }

    #[tokio::test]
    async fn concurrent_appends_keep_every_order() {
        let store = InMemoryOrderStore::new();
        let owner = Principal::user("u-1");

        let handles: Vec<_> = (0..20)
            .map(|i| {
                let store = store.clone();
                let owner = owner.clone();
                tokio::spawn(async move {
                    store
                        .append(&owner, create_test_order(&format!("pi_{i}")))
                        .await
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let orders = store.list(&owner).await.unwrap();
        assert_eq!(orders.len(), 20);
        let mut ids: Vec<_> = orders.iter().map(|o| o.order_id).collect();
        ids.sort_by_key(|id| id.as_uuid());
        ids.dedup();
        assert_eq!(ids.len(), 20);
    }
}
