//! Persistence layer for the storefront.
//!
//! [`Database`] wraps the connection pool and bounds transactions.
//! The repository traits are implemented by [`PostgresStore`] and by
//! [`InMemoryStore`], which is used in tests and local development.

pub mod error;
pub mod gateway;
pub mod memory;
pub mod model;
pub mod postgres;
pub mod repository;

pub use common::{AccountId, Money, OrderId, OrderStatus, ProductId, Role};
pub use error::{Result, StoreError};
pub use gateway::{Database, DatabaseConfig};
pub use memory::InMemoryStore;
pub use model::{
    Account, AccountChanges, AccountCredentials, NewAccount, NewOrder, Order, Product,
    ProductDraft, StatusStatistics,
};
pub use postgres::PostgresStore;
pub use repository::{AccountRepository, CatalogRepository, OrderRepository, Storefront};
