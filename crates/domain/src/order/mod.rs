//! Order record and related types.

mod commands;
mod record;
mod state;
mod value_objects;

pub use commands::CreateOrder;
pub use record::Order;
pub use state::OrderStatus;
pub use value_objects::{Currency, Money, Product, Provider};

use thiserror::Error;

/// Errors raised while validating or transitioning an order.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The request did not carry a total amount.
    #[error("Total amount and products are required")]
    MissingTotal,

    /// The request did not carry a product list.
    #[error("Total amount and products are required")]
    MissingProducts,

    /// The total amount could not be read as a decimal number.
    #[error("Invalid total amount: {value}")]
    InvalidAmount { value: String },

    /// The total amount is zero or negative.
    #[error("Invalid total amount: {value} (must be greater than 0)")]
    NonPositiveAmount { value: String },

    /// The requested transition would move the order backwards.
    #[error("Invalid status transition: cannot move from {from} to {to}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },
}
