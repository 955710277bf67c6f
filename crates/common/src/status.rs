//! Order status state machine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The status of an order row.
///
/// State transitions:
/// ```text
/// Pending ──┬──► Shipped
///           ├──► Delivered
///           └──► Cancelled
/// ```
/// Every state other than `Pending` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Initial state of every placed order.
    #[default]
    Pending,
    Shipped,
    Delivered,
    Cancelled,
}

/// Returned when a status name is outside the fixed enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid order status '{0}', expected one of: pending, shipped, delivered, cancelled")]
pub struct ParseStatusError(pub String);

impl OrderStatus {
    pub const ALL: [OrderStatus; 4] = [
        OrderStatus::Pending,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    /// Returns true if no transition leaves this state.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }

    /// Returns true if `next` is reachable from this state in one step.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(self, OrderStatus::Pending) && next != OrderStatus::Pending
    }

    /// Returns true if the owning customer may cancel from this state.
    pub fn can_cancel(&self) -> bool {
        self.can_transition_to(OrderStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts the canonical names and the storefront's legacy Spanish names.
impl std::str::FromStr for OrderStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" | "pendiente" => Ok(OrderStatus::Pending),
            "shipped" | "enviado" => Ok(OrderStatus::Shipped),
            "delivered" | "entregado" => Ok(OrderStatus::Delivered),
            "cancelled" | "cancelado" => Ok(OrderStatus::Cancelled),
            _ => Err(ParseStatusError(s.to_string())),
        }
    }
}
