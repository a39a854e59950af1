//! Order listing endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use chrono::{DateTime, Utc};
use domain::Order;
use order_store::OrderStore;
use serde::Serialize;

use crate::auth::Authenticated;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub order_id: String,
    /// Decimal string, e.g. `"49.99"`.
    pub total_amount: String,
    pub currency: &'static str,
    pub products: Vec<serde_json::Value>,
    pub status: &'static str,
    pub created_at: DateTime<Utc>,
    pub provider: &'static str,
    pub provider_reference: String,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            order_id: order.order_id.to_string(),
            total_amount: order.total_amount.to_decimal_string(),
            currency: order.currency.code(),
            products: order
                .products
                .into_iter()
                .map(|p| p.as_value().clone())
                .collect(),
            status: order.status.as_str(),
            created_at: order.created_at,
            provider: order.provider.as_str(),
            provider_reference: order.provider_reference,
        }
    }
}

/// GET /api/orders: the caller's orders, newest first.
#[tracing::instrument(skip(state))]
pub async fn list<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(principal): Authenticated,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.lifecycle.list_orders(&principal).await?;
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}
