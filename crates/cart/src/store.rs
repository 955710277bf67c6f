//! The cart store: one owner of the cart state, with change notification.

use tokio::sync::{Mutex, watch};

use common::ProductId;

use crate::checkout::{CheckoutClient, CheckoutItem, CheckoutReceipt};
use crate::error::{CartError, Result};
use crate::line::{Cart, CartLine, ProductSnapshot};
use crate::storage::CartStorage;
use crate::totals::Coupon;

/// Owns the cart, keeps its durable copy current and publishes every
/// committed change to subscribers.
///
/// A mutation is applied to a copy, saved, and only then published. If the
/// save fails the published cart is left as it was.
pub struct CartStore<S> {
    storage: S,
    state: watch::Sender<Cart>,
    // Serializes mutate-save-publish sequences.
    write: Mutex<()>,
}

impl<S: CartStorage> CartStore<S> {
    /// Loads the saved lines and starts publishing from them.
    pub async fn load(storage: S) -> Result<Self> {
        let cart = Cart::from_lines(storage.load().await?);
        let (state, _) = watch::channel(cart);
        Ok(Self {
            storage,
            state,
            write: Mutex::new(()),
        })
    }

    /// Current cart snapshot.
    pub fn get(&self) -> Cart {
        self.state.borrow().clone()
    }

    /// Receives every committed cart.
    pub fn subscribe(&self) -> watch::Receiver<Cart> {
        self.state.subscribe()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Applies `f` to a copy of the cart and commits it if `f` succeeds.
    pub async fn mutate<T>(&self, f: impl FnOnce(&mut Cart) -> Result<T>) -> Result<T> {
        let _guard = self.write.lock().await;
        let mut next = self.get();
        let value = f(&mut next)?;
        if next.lines() != self.state.borrow().lines() {
            self.storage.save(next.lines()).await?;
        }
        self.state.send_replace(next);
        Ok(value)
    }

    /// Adds units of a product. A stock shortfall still commits the
    /// refreshed, capped line before the error is returned.
    pub async fn add(&self, product: ProductSnapshot, quantity: i32) -> Result<CartLine> {
        self.mutate(|cart| Ok(cart.add(product, quantity).cloned()))
            .await?
    }

    pub async fn update_quantity(&self, product_id: ProductId, quantity: i32) -> Result<()> {
        self.mutate(|cart| cart.update_quantity(product_id, quantity))
            .await
    }

    pub async fn remove(&self, product_id: ProductId) -> Result<CartLine> {
        self.mutate(|cart| cart.remove(product_id)).await
    }

    pub async fn clear(&self) -> Result<()> {
        self.mutate(|cart| {
            cart.clear();
            Ok(())
        })
        .await
    }

    pub async fn apply_coupon(&self, code: &str) -> Result<Coupon> {
        self.mutate(|cart| cart.apply_coupon(code)).await
    }

    /// Submits the whole cart as one checkout.
    ///
    /// The submitted units are removed only after an explicit success
    /// acknowledgement; anything added while the request was in flight
    /// stays. Any error leaves the cart untouched so the user can correct
    /// and retry.
    #[tracing::instrument(skip(self, client, token))]
    pub async fn checkout<C>(&self, client: &C, token: &str) -> Result<CheckoutReceipt>
    where
        C: CheckoutClient + ?Sized,
    {
        let cart = self.get();
        if cart.is_empty() {
            return Err(CartError::Empty);
        }

        let items: Vec<CheckoutItem> = cart.lines().iter().map(CheckoutItem::from).collect();
        let receipt = match client.submit(token, &items).await {
            Ok(receipt) => receipt,
            Err(err) => {
                tracing::warn!(error = %err, "checkout failed, cart kept");
                return Err(err);
            }
        };

        let submitted: Vec<(ProductId, i32)> = items
            .iter()
            .map(|item| (ProductId::new(item.product_id), item.quantity))
            .collect();
        self.mutate(|cart| {
            cart.settle(&submitted);
            Ok(())
        })
        .await?;
        tracing::info!(orders = receipt.total_orders, "checkout acknowledged, cart settled");
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use common::Money;

    use super::*;
    use crate::storage::MemoryCartStorage;

    fn snapshot(id: i64, stock: i32) -> ProductSnapshot {
        ProductSnapshot {
            product_id: ProductId::new(id),
            name: format!("Product {id}"),
            unit_price: Money::from_cents(1000),
            stock,
            category: "home".to_string(),
            image: None,
        }
    }

    #[tokio::test]
    async fn subscribers_see_committed_changes() {
        let store = CartStore::load(MemoryCartStorage::new()).await.unwrap();
        let mut rx = store.subscribe();

        store.add(snapshot(1, 5), 2).await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().item_count(), 2);

        store.update_quantity(ProductId::new(1), 0).await.unwrap();
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_empty());
    }

    #[tokio::test]
    async fn failed_mutation_changes_nothing() {
        let storage = MemoryCartStorage::new();
        let store = CartStore::load(storage.clone()).await.unwrap();
        store.add(snapshot(1, 2), 2).await.unwrap();

        let result = store.update_quantity(ProductId::new(1), 3).await;
        assert!(matches!(result, Err(CartError::StockExceeded { .. })));
        assert_eq!(store.get().item_count(), 2);
        assert_eq!(storage.load().await.unwrap()[0].quantity, 2);
    }

    #[tokio::test]
    async fn stock_shortfall_commits_capped_line() {
        let storage = MemoryCartStorage::new();
        let store = CartStore::load(storage.clone()).await.unwrap();
        store.add(snapshot(1, 5), 4).await.unwrap();

        let result = store.add(snapshot(1, 2), 1).await;
        assert!(matches!(result, Err(CartError::StockExceeded { .. })));
        assert_eq!(store.get().item_count(), 2);
        assert_eq!(storage.load().await.unwrap()[0].quantity, 2);
    }

    #[tokio::test]
    async fn coupon_is_not_persisted() {
        let storage = MemoryCartStorage::new();
        let store = CartStore::load(storage.clone()).await.unwrap();
        store.add(snapshot(1, 2), 1).await.unwrap();
        store.apply_coupon("newuser").await.unwrap();
        assert_eq!(store.get().coupon(), Some(Coupon::NewUser));

        let reloaded = CartStore::load(storage).await.unwrap();
        assert_eq!(reloaded.get().item_count(), 1);
        assert!(reloaded.get().coupon().is_none());
    }
}
