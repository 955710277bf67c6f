//! Domain error types.

use store::{OrderStatus, ProductId, StoreError};
use thiserror::Error;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Malformed, missing or out-of-range input.
    #[error("{0}")]
    Validation(String),

    /// A referenced entity does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// A uniqueness rule rejected the operation.
    #[error("{0}")]
    Conflict(String),

    /// The order cannot move from its current status to the requested one.
    #[error("Cannot change order status from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// A line asked for more units than the product has.
    #[error(
        "Insufficient stock for {product_name} (product {product_id}). Available: {available}, requested: {requested}"
    )]
    InsufficientStock {
        product_id: ProductId,
        product_name: String,
        available: i32,
        requested: i32,
    },

    /// The actor does not own the resource and is not an administrator.
    #[error("{0}")]
    Forbidden(String),

    /// The store failed underneath the operation.
    #[error("Persistence error: {0}")]
    Persistence(StoreError),
}

impl DomainError {
    /// Only store failures may succeed when retried unchanged; every other
    /// variant needs the caller to correct its input first.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DomainError::Persistence(_))
    }

    pub(crate) fn product_not_found(id: ProductId) -> Self {
        DomainError::NotFound {
            entity: "Product",
            id: id.as_i64(),
        }
    }
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(message) => DomainError::Validation(message),
            StoreError::NotFound { entity, id } => DomainError::NotFound {
                entity: capitalized(entity),
                id,
            },
            StoreError::UniqueViolation { constraint } if constraint == "accounts_email_key" => {
                DomainError::Conflict("Email is already registered".to_string())
            }
            StoreError::UniqueViolation { constraint } => {
                DomainError::Conflict(format!("Duplicate value violates {constraint}"))
            }
            StoreError::StockConflict {
                product_id,
                requested,
            } => DomainError::Conflict(format!(
                "Not enough stock left for product {product_id} (requested {requested})"
            )),
            StoreError::StatusConflict { order_id, current } => {
                DomainError::Conflict(format!("Order {order_id} is already {current}"))
            }
            other => DomainError::Persistence(other),
        }
    }
}

fn capitalized(entity: &'static str) -> &'static str {
    match entity {
        "product" => "Product",
        "account" => "Account",
        "order" => "Order",
        other => other,
    }
}

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn only_persistence_errors_are_retryable() {
        assert!(DomainError::Persistence(StoreError::Timeout(Duration::from_secs(1))).is_retryable());
        assert!(!DomainError::Validation("x".into()).is_retryable());
        assert!(!DomainError::Conflict("x".into()).is_retryable());
        assert!(
            !DomainError::InsufficientStock {
                product_id: ProductId::new(1),
                product_name: "Lamp".into(),
                available: 0,
                requested: 1,
            }
            .is_retryable()
        );
    }

    #[test]
    fn store_errors_map_onto_the_taxonomy() {
        let not_found: DomainError = StoreError::NotFound {
            entity: "order",
            id: 7,
        }
        .into();
        assert_eq!(not_found.to_string(), "Order 7 not found");

        let duplicate: DomainError = StoreError::UniqueViolation {
            constraint: "accounts_email_key".into(),
        }
        .into();
        assert!(matches!(duplicate, DomainError::Conflict(_)));

        let timeout: DomainError = StoreError::Timeout(Duration::from_millis(5)).into();
        assert!(matches!(timeout, DomainError::Persistence(_)));
    }

    #[test]
    fn stock_message_names_available_quantity() {
        let err = DomainError::InsufficientStock {
            product_id: ProductId::new(2),
            product_name: "Desk".into(),
            available: 0,
            requested: 1,
        };
        let message = err.to_string();
        assert!(message.contains("Desk"));
        assert!(message.contains("Available: 0"));
    }
}
