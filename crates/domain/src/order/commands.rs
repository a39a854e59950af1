//! Order commands.

use std::str::FromStr;

use common::OrderId;
use rust_decimal::Decimal;

use super::{Money, OrderError, Product};

/// Command to create a new order.
///
/// Construction validates the request, so a `CreateOrder` value always
/// carries a positive total and a product list. The order ID is generated
/// here, before any provider is contacted.
#[derive(Debug, Clone)]
pub struct CreateOrder {
    /// The locally generated order ID.
    pub order_id: OrderId,

    /// Total to charge.
    pub total_amount: Money,

    /// Line items, in caller order.
    pub products: Vec<Product>,
}

impl CreateOrder {
    /// Creates a new CreateOrder command with a generated order ID.
    pub fn new(total_amount: Money, products: Vec<Product>) -> Result<Self, OrderError> {
        if !total_amount.is_positive() {
            return Err(OrderError::NonPositiveAmount {
                value: total_amount.to_decimal_string(),
            });
        }

        Ok(Self {
            order_id: OrderId::new(),
            total_amount,
            products,
        })
    }

    /// Builds the command from loosely typed request fields.
    ///
    /// `total` may be a JSON number or a numeric string.
    pub fn from_request(
        total: Option<&serde_json::Value>,
        products: Option<Vec<serde_json::Value>>,
    ) -> Result<Self, OrderError> {
        let total = match total {
            None | Some(serde_json::Value::Null) => return Err(OrderError::MissingTotal),
            Some(value) => value,
        };
        let products = products.ok_or(OrderError::MissingProducts)?;

        let amount = parse_amount(total)?;
        if amount <= Decimal::ZERO {
            return Err(OrderError::NonPositiveAmount {
                value: amount.to_string(),
            });
        }

        let total_amount = Money::from_decimal(amount)?;
        Self::new(total_amount, products.into_iter().map(Product::new).collect())
    }
}

fn parse_amount(value: &serde_json::Value) -> Result<Decimal, OrderError> {
    let raw = match value {
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.trim().to_string(),
        other => {
            return Err(OrderError::InvalidAmount {
                value: other.to_string(),
            });
        }
    };

    Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .map_err(|_| OrderError::InvalidAmount { value: raw })
}
