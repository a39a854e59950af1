//! Domain layer for the payment-order reconciliation core.
//!
//! This crate provides:
//! - The `Order` record with its forward-only status state machine
//! - Money and line-item value objects
//! - `Principal`/`Role`, the identity every order operation is scoped to
//! - `JwtAuth`, which turns a bearer credential into a `Principal`

pub mod auth;
pub mod order;
pub mod principal;

pub use auth::{AuthError, Claims, JwtAuth};
pub use order::{
    CreateOrder, Currency, Money, Order, OrderError, OrderStatus, Product, Provider,
};
pub use principal::{Principal, Role};
