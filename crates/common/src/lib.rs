//! Shared types for the storefront workspace.

mod money;
mod status;
mod types;

pub use money::Money;
pub use status::{OrderStatus, ParseStatusError};
pub use types::{AccountId, OrderId, ProductId, Role};
