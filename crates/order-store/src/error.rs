use common::OrderId;
use thiserror::Error;

/// Errors that can occur when interacting with the order store.
#[derive(Debug, Error)]
pub enum OrderStoreError {
    /// An order with the same ID already exists in the owner's collection.
    #[error("Duplicate order {order_id} for {owner}")]
    DuplicateOrder { owner: String, order_id: OrderId },

    /// A stored row could not be mapped back to an order.
    #[error("Corrupt order record {order_id}: {reason}")]
    CorruptRecord { order_id: OrderId, reason: String },

    /// The store is not reachable.
    #[error("Order store unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for order store operations.
pub type Result<T> = std::result::Result<T, OrderStoreError>;
