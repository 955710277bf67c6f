//! Records persisted by the repositories.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AccountId, Money, OrderId, OrderStatus, ProductId, Result, Role, StoreError};

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub subcategory: Option<String>,
    pub price: Money,
    pub stock: i32,
}

/// Field values for creating or replacing a product.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProductDraft {
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub subcategory: Option<String>,
    pub price: Money,
    pub stock: i32,
}

/// Largest price a product column holds: `NUMERIC(10,2)`.
pub const MAX_PRICE: Money = Money::from_cents(9_999_999_999);
pub const MAX_NAME_LEN: usize = 255;
pub const MAX_CATEGORY_LEN: usize = 100;

impl ProductDraft {
    /// Rejects negative prices and negative stock, and values that would
    /// not fit the product columns.
    pub fn validate(&self) -> Result<()> {
        if self.price.is_negative() {
            return Err(StoreError::Validation(format!(
                "price must not be negative (got {})",
                self.price
            )));
        }
        if self.price > MAX_PRICE {
            return Err(StoreError::Validation(format!(
                "price must not exceed {MAX_PRICE} (got {})",
                self.price
            )));
        }
        check_len("name", &self.name, MAX_NAME_LEN)?;
        check_len("category", &self.category, MAX_CATEGORY_LEN)?;
        if let Some(subcategory) = &self.subcategory {
            check_len("subcategory", subcategory, MAX_CATEGORY_LEN)?;
        }
        if self.stock < 0 {
            return Err(StoreError::Validation(format!(
                "stock must not be negative (got {})",
                self.stock
            )));
        }
        Ok(())
    }

    pub(crate) fn into_product(self, id: ProductId) -> Product {
        Product {
            id,
            name: self.name,
            description: self.description,
            category: self.category,
            subcategory: self.subcategory,
            price: self.price,
            stock: self.stock,
        }
    }
}

fn check_len(field: &str, value: &str, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len > max {
        return Err(StoreError::Validation(format!(
            "{field} must be at most {max} characters (got {len})"
        )));
    }
    Ok(())
}

impl From<Product> for ProductDraft {
    fn from(product: Product) -> Self {
        Self {
            name: product.name,
            description: product.description,
            category: product.category,
            subcategory: product.subcategory,
            price: product.price,
            stock: product.stock,
        }
    }
}

/// A customer or administrator account. Never carries the secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub surname: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub role: Role,
    pub registered_at: DateTime<Utc>,
}

/// An account together with its stored secret hash.
///
/// Only used for credential verification; deliberately not serializable.
#[derive(Clone)]
pub struct AccountCredentials {
    pub account: Account,
    pub secret_hash: String,
}

impl std::fmt::Debug for AccountCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountCredentials")
            .field("account", &self.account)
            .field("secret_hash", &"<redacted>")
            .finish()
    }
}

/// Field values for a new account. The secret is already hashed.
#[derive(Clone)]
pub struct NewAccount {
    pub name: String,
    pub surname: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub role: Role,
    pub secret_hash: String,
}

/// Replacement values for an existing account.
///
/// `secret_hash` is only written when present.
#[derive(Clone)]
pub struct AccountChanges {
    pub name: String,
    pub surname: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub role: Role,
    pub secret_hash: Option<String>,
}

/// One order row: a single product line owned by one account.
///
/// Product name and category are copied at creation time and never
/// re-joined against the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub account_id: AccountId,
    pub product_id: ProductId,
    pub product_name: String,
    pub product_category: String,
    pub quantity: i32,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

/// Field values for a new order row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub account_id: AccountId,
    pub product_id: ProductId,
    pub product_name: String,
    pub product_category: String,
    pub quantity: i32,
    pub status: OrderStatus,
}

impl NewOrder {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.quantity <= 0 {
            return Err(StoreError::Validation(format!(
                "quantity must be greater than 0 (got {})",
                self.quantity
            )));
        }
        Ok(())
    }

    pub(crate) fn into_order(self, id: OrderId, created_at: DateTime<Utc>) -> Order {
        Order {
            id,
            account_id: self.account_id,
            product_id: self.product_id,
            product_name: self.product_name,
            product_category: self.product_category,
            quantity: self.quantity,
            status: self.status,
            created_at,
        }
    }
}

/// Order count and summed quantity for one status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusStatistics {
    pub status: OrderStatus,
    pub order_count: i64,
    pub total_quantity: i64,
}
