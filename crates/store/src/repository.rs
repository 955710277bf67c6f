use async_trait::async_trait;

use crate::{
    Account, AccountChanges, AccountCredentials, AccountId, NewAccount, NewOrder, Order, OrderId,
    OrderStatus, Product, ProductDraft, ProductId, Result, StatusStatistics, StoreError,
};

/// Read/write access to catalog products.
///
/// Prices and stock are returned as numeric types whatever the column
/// representation.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Lists all products ordered by id.
    async fn list_products(&self) -> Result<Vec<Product>>;

    /// Returns None if the product doesn't exist.
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>>;

    /// Lists products of one category ordered by name.
    async fn products_by_category(&self, category: &str) -> Result<Vec<Product>>;

    /// Inserts a product. Fails with `Validation` on negative price or stock.
    async fn create_product(&self, draft: ProductDraft) -> Result<Product>;

    /// Replaces every field of a product. Fails with `Validation` on negative
    /// price or stock and with `NotFound` if the id is unknown.
    async fn update_product(&self, id: ProductId, draft: ProductDraft) -> Result<Product>;

    /// Returns true if a row was deleted.
    async fn delete_product(&self, id: ProductId) -> Result<bool>;
}

/// Read/write access to accounts. Secrets are only ever handled as hashes.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn list_accounts(&self) -> Result<Vec<Account>>;

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>>;

    async fn get_account_by_email(&self, email: &str) -> Result<Option<Account>>;

    /// Loads the account and its secret hash for credential verification.
    async fn get_credentials(&self, email: &str) -> Result<Option<AccountCredentials>>;

    /// Inserts an account. The store's unique email index is authoritative:
    /// a duplicate fails with `UniqueViolation`.
    async fn create_account(&self, account: NewAccount) -> Result<Account>;

    /// Fails with `NotFound` if the id is unknown and `UniqueViolation` if the
    /// new email belongs to another account.
    async fn update_account(&self, id: AccountId, changes: AccountChanges) -> Result<Account>;

    async fn delete_account(&self, id: AccountId) -> Result<bool>;
}

/// Read/write access to order rows.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Lists all orders, newest first.
    async fn list_orders(&self) -> Result<Vec<Order>>;

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Lists one account's orders, newest first.
    async fn orders_by_account(&self, account_id: AccountId) -> Result<Vec<Order>>;

    /// Persists all orders or none of them.
    ///
    /// Inside one transaction, each line decrements its product's stock with
    /// a conditional update and then inserts its row; a line whose decrement
    /// matches no row fails the batch with `StockConflict`. Any failure rolls
    /// back every insert and decrement of the batch. On success the created
    /// rows are returned in input order with ids assigned in that order.
    async fn create_orders(&self, orders: Vec<NewOrder>) -> Result<Vec<Order>>;

    /// Persists a single order under the same rules as [`create_orders`].
    ///
    /// [`create_orders`]: OrderRepository::create_orders
    async fn create_order(&self, order: NewOrder) -> Result<Order> {
        let product_id = order.product_id;
        self.create_orders(vec![order])
            .await?
            .pop()
            .ok_or_else(|| StoreError::Backend(format!("no row returned for product {product_id}")))
    }

    /// Unconditionally sets the status. Fails with `NotFound` if no row matches.
    async fn update_order_status(&self, id: OrderId, status: OrderStatus) -> Result<Order>;

    /// Sets the status only if the row is currently `from`.
    ///
    /// Fails with `NotFound` if no row matches the id and with
    /// `StatusConflict` if the row holds another status.
    async fn transition_order_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Order>;

    async fn delete_order(&self, id: OrderId) -> Result<bool>;

    /// Per status: number of orders and sum of their quantities.
    async fn order_statistics(&self) -> Result<Vec<StatusStatistics>>;
}

/// A store that backs the whole storefront.
pub trait Storefront:
    CatalogRepository + AccountRepository + OrderRepository + Clone + 'static
{
}

impl<T> Storefront for T where
    T: CatalogRepository + AccountRepository + OrderRepository + Clone + 'static
{
}
