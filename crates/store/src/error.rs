use std::time::Duration;

use thiserror::Error;

use crate::{OrderId, OrderStatus, ProductId};

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A record failed validation before reaching the store.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The record addressed by an update does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// A unique constraint rejected the write.
    #[error("Unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    /// The conditional stock decrement matched no row: the product is gone
    /// or has fewer units than requested.
    #[error("Stock conflict for product {product_id}: requested {requested}")]
    StockConflict {
        product_id: ProductId,
        requested: i32,
    },

    /// A compare-and-set status update found a different current status.
    #[error("Order {order_id} is {current}")]
    StatusConflict {
        order_id: OrderId,
        current: OrderStatus,
    },

    /// A bounded transaction did not finish in time and was rolled back.
    #[error("Transaction timed out after {0:?}")]
    Timeout(Duration),

    /// The backing store failed for a reason other than the database driver.
    #[error("Store backend failure: {0}")]
    Backend(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    /// Returns true for failures that may succeed when retried unchanged.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Timeout(_) | StoreError::Backend(_) => true,
            StoreError::Database(err) => matches!(
                err,
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
            ),
            _ => false,
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
