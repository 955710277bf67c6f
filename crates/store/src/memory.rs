use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    Account, AccountChanges, AccountCredentials, AccountId, AccountRepository, CatalogRepository,
    NewAccount, NewOrder, Order, OrderId, OrderRepository, OrderStatus, Product, ProductDraft,
    ProductId, Result, StatusStatistics, StoreError,
};

const EMAIL_CONSTRAINT: &str = "accounts_email_key";

#[derive(Default)]
struct State {
    products: BTreeMap<ProductId, Product>,
    accounts: BTreeMap<AccountId, AccountCredentials>,
    orders: BTreeMap<OrderId, Order>,
    last_product_id: i64,
    last_account_id: i64,
    last_order_id: i64,
    fail_batch_at: Option<usize>,
}

impl State {
    fn email_taken(&self, email: &str, except: Option<AccountId>) -> bool {
        self.accounts
            .values()
            .any(|c| c.account.email == email && Some(c.account.id) != except)
    }
}

/// In-memory store implementation for testing.
///
/// Provides the same interface and the same atomicity guarantees as the
/// PostgreSQL implementation: a batch is staged on a copy of the affected
/// state and only published once every line has succeeded.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `create_orders` call fail while inserting the line at
    /// `index`, after the earlier lines of the batch have been staged.
    pub async fn fail_next_batch_at(&self, index: usize) {
        self.state.write().await.fail_batch_at = Some(index);
    }

    /// Returns the total number of order rows stored.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Clears all records.
    pub async fn clear(&self) {
        *self.state.write().await = State::default();
    }
}

fn sort_newest_first(orders: &mut [Order]) {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

#[async_trait]
impl CatalogRepository for InMemoryStore {
    async fn list_products(&self) -> Result<Vec<Product>> {
        Ok(self.state.read().await.products.values().cloned().collect())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.state.read().await.products.get(&id).cloned())
    }

    async fn products_by_category(&self, category: &str) -> Result<Vec<Product>> {
        let state = self.state.read().await;
        let mut products: Vec<_> = state
            .products
            .values()
            .filter(|p| p.category == category)
            .cloned()
            .collect();
        products.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(products)
    }

    async fn create_product(&self, draft: ProductDraft) -> Result<Product> {
        draft.validate()?;
        let mut state = self.state.write().await;
        state.last_product_id += 1;
        let product = draft.into_product(ProductId::new(state.last_product_id));
        state.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn update_product(&self, id: ProductId, draft: ProductDraft) -> Result<Product> {
        draft.validate()?;
        let mut state = self.state.write().await;
        let slot = state.products.get_mut(&id).ok_or(StoreError::NotFound {
            entity: "product",
            id: id.as_i64(),
        })?;
        *slot = draft.into_product(id);
        Ok(slot.clone())
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool> {
        Ok(self.state.write().await.products.remove(&id).is_some())
    }
}

#[async_trait]
impl AccountRepository for InMemoryStore {
    async fn list_accounts(&self) -> Result<Vec<Account>> {
        let state = self.state.read().await;
        Ok(state.accounts.values().map(|c| c.account.clone()).collect())
    }

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        let state = self.state.read().await;
        Ok(state.accounts.get(&id).map(|c| c.account.clone()))
    }

    async fn get_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        Ok(self
            .get_credentials(email)
            .await?
            .map(|credentials| credentials.account))
    }

    async fn get_credentials(&self, email: &str) -> Result<Option<AccountCredentials>> {
        let state = self.state.read().await;
        Ok(state
            .accounts
            .values()
            .find(|c| c.account.email == email)
            .cloned())
    }

    async fn create_account(&self, account: NewAccount) -> Result<Account> {
        let mut state = self.state.write().await;
        if state.email_taken(&account.email, None) {
            return Err(StoreError::UniqueViolation {
                constraint: EMAIL_CONSTRAINT.to_string(),
            });
        }

        state.last_account_id += 1;
        let created = Account {
            id: AccountId::new(state.last_account_id),
            name: account.name,
            surname: account.surname,
            email: account.email,
            phone: account.phone,
            address: account.address,
            role: account.role,
            registered_at: Utc::now(),
        };
        state.accounts.insert(
            created.id,
            AccountCredentials {
                account: created.clone(),
                secret_hash: account.secret_hash,
            },
        );
        Ok(created)
    }

    async fn update_account(&self, id: AccountId, changes: AccountChanges) -> Result<Account> {
        let mut state = self.state.write().await;
        if !state.accounts.contains_key(&id) {
            return Err(StoreError::NotFound {
                entity: "account",
                id: id.as_i64(),
            });
        }
        if state.email_taken(&changes.email, Some(id)) {
            return Err(StoreError::UniqueViolation {
                constraint: EMAIL_CONSTRAINT.to_string(),
            });
        }

        let Some(entry) = state.accounts.get_mut(&id) else {
            return Err(StoreError::NotFound {
                entity: "account",
                id: id.as_i64(),
            });
        };
        entry.account.name = changes.name;
        entry.account.surname = changes.surname;
        entry.account.email = changes.email;
        entry.account.phone = changes.phone;
        entry.account.address = changes.address;
        entry.account.role = changes.role;
        if let Some(hash) = changes.secret_hash {
            entry.secret_hash = hash;
        }
        Ok(entry.account.clone())
    }

    async fn delete_account(&self, id: AccountId) -> Result<bool> {
        let mut state = self.state.write().await;
        let removed = state.accounts.remove(&id).is_some();
        if removed {
            state.orders.retain(|_, o| o.account_id != id);
        }
        Ok(removed)
    }
}

#[async_trait]
impl OrderRepository for InMemoryStore {
    async fn list_orders(&self) -> Result<Vec<Order>> {
        let mut orders: Vec<_> = self.state.read().await.orders.values().cloned().collect();
        sort_newest_first(&mut orders);
        Ok(orders)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.state.read().await.orders.get(&id).cloned())
    }

    async fn orders_by_account(&self, account_id: AccountId) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        let mut orders: Vec<_> = state
            .orders
            .values()
            .filter(|o| o.account_id == account_id)
            .cloned()
            .collect();
        sort_newest_first(&mut orders);
        Ok(orders)
    }

    async fn create_orders(&self, orders: Vec<NewOrder>) -> Result<Vec<Order>> {
        for order in &orders {
            order.validate()?;
        }

        let mut state = self.state.write().await;
        let fail_at = state.fail_batch_at.take();

        // Stage on copies; nothing is published until every line succeeded.
        let mut products = state.products.clone();
        let mut next_id = state.last_order_id;
        let created_at = Utc::now();
        let mut created = Vec::with_capacity(orders.len());

        for (index, order) in orders.into_iter().enumerate() {
            let product = products
                .get_mut(&order.product_id)
                .filter(|p| p.stock >= order.quantity)
                .ok_or(StoreError::StockConflict {
                    product_id: order.product_id,
                    requested: order.quantity,
                })?;
            product.stock -= order.quantity;

            if fail_at == Some(index) {
                return Err(StoreError::Backend(format!(
                    "injected failure inserting line {index}"
                )));
            }

            next_id += 1;
            created.push(order.into_order(OrderId::new(next_id), created_at));
        }

        state.products = products;
        state.last_order_id = next_id;
        for order in &created {
            state.orders.insert(order.id, order.clone());
        }
        Ok(created)
    }

    async fn update_order_status(&self, id: OrderId, status: OrderStatus) -> Result<Order> {
        let mut state = self.state.write().await;
        let order = state.orders.get_mut(&id).ok_or(StoreError::NotFound {
            entity: "order",
            id: id.as_i64(),
        })?;
        order.status = status;
        Ok(order.clone())
    }

    async fn transition_order_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Order> {
        let mut state = self.state.write().await;
        let order = state.orders.get_mut(&id).ok_or(StoreError::NotFound {
            entity: "order",
            id: id.as_i64(),
        })?;
        if order.status != from {
            return Err(StoreError::StatusConflict {
                order_id: id,
                current: order.status,
            });
        }
        order.status = to;
        Ok(order.clone())
    }

    async fn delete_order(&self, id: OrderId) -> Result<bool> {
        Ok(self.state.write().await.orders.remove(&id).is_some())
    }

    async fn order_statistics(&self) -> Result<Vec<StatusStatistics>> {
        let state = self.state.read().await;
        let stats = OrderStatus::ALL
            .iter()
            .filter_map(|&status| {
                let (count, quantity) = state
                    .orders
                    .values()
                    .filter(|o| o.status == status)
                    .fold((0i64, 0i64), |(c, q), o| (c + 1, q + o.quantity as i64));
                (count > 0).then_some(StatusStatistics {
                    status,
                    order_count: count,
                    total_quantity: quantity,
                })
            })
            .collect();
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Money, Role};

    fn draft(name: &str, category: &str, stock: i32) -> ProductDraft {
        ProductDraft {
            name: name.to_string(),
            description: None,
            category: category.to_string(),
            subcategory: None,
            price: Money::from_cents(1000),
            stock,
        }
    }

    fn new_account(email: &str) -> NewAccount {
        NewAccount {
            name: "Ana".to_string(),
            surname: None,
            email: email.to_string(),
            phone: None,
            address: None,
            role: Role::Customer,
            secret_hash: "hash".to_string(),
        }
    }

    fn line(account_id: AccountId, product: &Product, quantity: i32) -> NewOrder {
        NewOrder {
            account_id,
            product_id: product.id,
            product_name: product.name.clone(),
            product_category: product.category.clone(),
            quantity,
            status: OrderStatus::Pending,
        }
    }

    #[tokio::test]
    async fn oversized_product_fields_are_rejected() {
        let store = InMemoryStore::new();
        let mut pricey = draft("Yacht", "boats", 1);
        pricey.price = Money::from_cents(1_000_000_000_000);
        assert!(matches!(
            store.create_product(pricey).await,
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            store.create_product(draft(&"n".repeat(256), "home", 1)).await,
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            store.create_product(draft("Lamp", &"c".repeat(101), 1)).await,
            Err(StoreError::Validation(_))
        ));

        let lamp = store.create_product(draft("Lamp", "home", 1)).await.unwrap();
        let mut renamed = draft(&"n".repeat(256), "home", 1);
        renamed.price = lamp.price;
        assert!(matches!(
            store.update_product(lamp.id, renamed).await,
            Err(StoreError::Validation(_))
        ));
        assert_eq!(store.get_product(lamp.id).await.unwrap().unwrap().name, "Lamp");
    }

    #[tokio::test]
    async fn create_and_fetch_products() {
        let store = InMemoryStore::new();
        let lamp = store.create_product(draft("Lamp", "home", 3)).await.unwrap();
        let desk = store.create_product(draft("Desk", "home", 1)).await.unwrap();
        store.create_product(draft("Ball", "toys", 9)).await.unwrap();

        assert_eq!(lamp.id, ProductId::new(1));
        assert_eq!(store.get_product(lamp.id).await.unwrap(), Some(lamp));
        assert!(store.get_product(ProductId::new(99)).await.unwrap().is_none());

        let home = store.products_by_category("home").await.unwrap();
        assert_eq!(home.len(), 2);
        assert_eq!(home[0].id, desk.id);
    }

    #[tokio::test]
    async fn update_unknown_product_is_not_found() {
        let store = InMemoryStore::new();
        let result = store
            .update_product(ProductId::new(5), draft("Lamp", "home", 1))
            .await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn duplicate_email_is_a_unique_violation() {
        let store = InMemoryStore::new();
        store
            .create_account(new_account("ana@example.com"))
            .await
            .unwrap();
        let result = store.create_account(new_account("ana@example.com")).await;
        assert!(matches!(result, Err(StoreError::UniqueViolation { .. })));
    }

    #[tokio::test]
    async fn batch_assigns_ids_in_input_order_and_decrements_stock() {
        let store = InMemoryStore::new();
        let account = store.create_account(new_account("a@b.co")).await.unwrap();
        let a = store.create_product(draft("A", "x", 5)).await.unwrap();
        let b = store.create_product(draft("B", "x", 3)).await.unwrap();

        let created = store
            .create_orders(vec![line(account.id, &a, 2), line(account.id, &b, 1)])
            .await
            .unwrap();

        assert_eq!(created.len(), 2);
        assert_eq!(created[0].product_id, a.id);
        assert!(created[0].id < created[1].id);
        assert_eq!(store.get_product(a.id).await.unwrap().unwrap().stock, 3);
        assert_eq!(store.get_product(b.id).await.unwrap().unwrap().stock, 2);
    }

    #[tokio::test]
    async fn failed_batch_leaves_no_trace() {
        let store = InMemoryStore::new();
        let account = store.create_account(new_account("a@b.co")).await.unwrap();
        let a = store.create_product(draft("A", "x", 5)).await.unwrap();
        let b = store.create_product(draft("B", "x", 0)).await.unwrap();

        let result = store
            .create_orders(vec![line(account.id, &a, 2), line(account.id, &b, 1)])
            .await;

        assert!(matches!(
            result,
            Err(StoreError::StockConflict { product_id, .. }) if product_id == b.id
        ));
        assert_eq!(store.order_count().await, 0);
        assert_eq!(store.get_product(a.id).await.unwrap().unwrap().stock, 5);
    }

    #[tokio::test]
    async fn injected_failure_rolls_back_the_batch() {
        let store = InMemoryStore::new();
        let account = store.create_account(new_account("a@b.co")).await.unwrap();
        let a = store.create_product(draft("A", "x", 5)).await.unwrap();
        store.fail_next_batch_at(1).await;

        let result = store
            .create_orders(vec![line(account.id, &a, 1), line(account.id, &a, 1)])
            .await;

        assert!(matches!(result, Err(StoreError::Backend(_))));
        assert_eq!(store.order_count().await, 0);
        assert_eq!(store.get_product(a.id).await.unwrap().unwrap().stock, 5);

        // The injection is one-shot.
        assert!(store.create_order(line(account.id, &a, 1)).await.is_ok());
    }

    #[tokio::test]
    async fn transition_checks_current_status() {
        let store = InMemoryStore::new();
        let account = store.create_account(new_account("a@b.co")).await.unwrap();
        let a = store.create_product(draft("A", "x", 5)).await.unwrap();
        let order = store.create_order(line(account.id, &a, 1)).await.unwrap();

        store
            .update_order_status(order.id, OrderStatus::Shipped)
            .await
            .unwrap();
        let result = store
            .transition_order_status(order.id, OrderStatus::Pending, OrderStatus::Cancelled)
            .await;
        assert!(matches!(
            result,
            Err(StoreError::StatusConflict {
                current: OrderStatus::Shipped,
                ..
            })
        ));

        let missing = store
            .update_order_status(OrderId::new(404), OrderStatus::Shipped)
            .await;
        assert!(matches!(missing, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn statistics_group_by_status() {
        let store = InMemoryStore::new();
        let account = store.create_account(new_account("a@b.co")).await.unwrap();
        let a = store.create_product(draft("A", "x", 10)).await.unwrap();
        let created = store
            .create_orders(vec![
                line(account.id, &a, 2),
                line(account.id, &a, 3),
                line(account.id, &a, 1),
            ])
            .await
            .unwrap();
        store
            .update_order_status(created[2].id, OrderStatus::Cancelled)
            .await
            .unwrap();

        let stats = store.order_statistics().await.unwrap();
        assert_eq!(
            stats,
            vec![
                StatusStatistics {
                    status: OrderStatus::Pending,
                    order_count: 2,
                    total_quantity: 5
                },
                StatusStatistics {
                    status: OrderStatus::Cancelled,
                    order_count: 1,
                    total_quantity: 1
                },
            ]
        );
    }
}
