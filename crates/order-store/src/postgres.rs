use async_trait::async_trait;
use common::OrderId;
use domain::{Currency, Money, Order, OrderStatus, Principal, Product, Provider};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    OrderStoreError, Result,
    store::{OrderStore, UpdateOutcome},
};

const ORDER_COLUMNS: &str = "order_id, total_cents, currency, products, status, provider, \
                             provider_reference, created_at";

/// PostgreSQL-backed order store implementation.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let order_id = OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?);

        let corrupt = |reason: String| OrderStoreError::CorruptRecord { order_id, reason };

        let currency: String = row.try_get("currency")?;
        let currency = match currency.as_str() {
            "USD" => Currency::Usd,
            other => return Err(corrupt(format!("unknown currency {other}"))),
        };

        let status: String = row.try_get("status")?;
        let status =
            OrderStatus::parse(&status).ok_or_else(|| corrupt(format!("unknown status {status}")))?;

        let provider: String = row.try_get("provider")?;
        let provider = Provider::parse(&provider)
            .ok_or_else(|| corrupt(format!("unknown provider {provider}")))?;

        let products: serde_json::Value = row.try_get("products")?;
        let products: Vec<Product> = serde_json::from_value(products)?;

        Ok(Order {
            order_id,
            total_amount: Money::from_cents(row.try_get("total_cents")?),
            currency,
            products,
            status,
            created_at: row.try_get("created_at")?,
            provider,
            provider_reference: row.try_get("provider_reference")?,
        })
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    #[tracing::instrument(skip(self, order), fields(order_id = %order.order_id))]
    async fn append(&self, owner: &Principal, order: Order) -> Result<()> {
        let products = serde_json::to_value(&order.products)?;

        sqlx::query(
            r#"
            INSERT INTO principal_orders
                (owner_role, owner_id, order_id, total_cents, currency, products, status,
                 provider, provider_reference, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(owner.role.as_str())
        .bind(owner.subject_id.as_str())
        .bind(order.order_id.as_uuid())
        .bind(order.total_amount.cents())
        .bind(order.currency.code())
        .bind(products)
        .bind(order.status.as_str())
        .bind(order.provider.as_str())
        .bind(&order.provider_reference)
        .bind(order.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("unique_owner_order")
            {
                return OrderStoreError::DuplicateOrder {
                    owner: owner.to_string(),
                    order_id: order.order_id,
                };
            }
            OrderStoreError::Database(e)
        })?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn update_status(
        &self,
        owner: &Principal,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<UpdateOutcome> {
        // Statuses from which `status` is a forward move.
        let sources: Vec<String> = [OrderStatus::Created, OrderStatus::Paid]
            .into_iter()
            .filter(|s| *s != status && s.can_advance_to(status))
            .map(|s| s.as_str().to_string())
            .collect();

        let updated = sqlx::query(
            r#"
            UPDATE principal_orders
            SET status = $4
            WHERE owner_role = $1 AND owner_id = $2 AND order_id = $3 AND status = ANY($5)
            "#,
        )
        .bind(owner.role.as_str())
        .bind(owner.subject_id.as_str())
        .bind(order_id.as_uuid())
        .bind(status.as_str())
        .bind(&sources)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if updated > 0 {
            return Ok(UpdateOutcome::Updated);
        }

        let current: Option<String> = sqlx::query_scalar(
            r#"
            SELECT status FROM principal_orders
            WHERE owner_role = $1 AND owner_id = $2 AND order_id = $3
            "#,
        )
        .bind(owner.role.as_str())
        .bind(owner.subject_id.as_str())
        .bind(order_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(match current {
            Some(current) if current == status.as_str() => UpdateOutcome::Unchanged,
            _ => UpdateOutcome::NotMatched,
        })
    }

    async fn find_most_recent(&self, owner: &Principal) -> Result<Option<Order>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM principal_orders
            WHERE owner_role = $1 AND owner_id = $2
            ORDER BY created_at DESC, seq DESC
            LIMIT 1
            "#
        ))
        .bind(owner.role.as_str())
        .bind(owner.subject_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn get(&self, owner: &Principal, order_id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM principal_orders
            WHERE owner_role = $1 AND owner_id = $2 AND order_id = $3
            "#
        ))
        .bind(owner.role.as_str())
        .bind(owner.subject_id.as_str())
        .bind(order_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn list(&self, owner: &Principal) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM principal_orders
            WHERE owner_role = $1 AND owner_id = $2
            ORDER BY created_at DESC, seq DESC
            "#
        ))
        .bind(owner.role.as_str())
        .bind(owner.subject_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order).collect()
    }
}
