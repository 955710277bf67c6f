//! Checkout: turns a cart into persisted orders.
//!
//! The workflow validates the cart, checks every line against the catalog,
//! and hands all order rows to the store as one batch. Validation failures
//! have no side effects. A failed batch leaves neither orders nor stock
//! changes behind.

use std::collections::HashMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use store::{
    AccountId, CatalogRepository, NewOrder, Order, OrderRepository, OrderStatus, Product,
    ProductId, StoreError,
};

use crate::error::{DomainError, Result};

/// One requested cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutLine {
    pub product_id: ProductId,
    pub quantity: i32,
}

impl CheckoutLine {
    pub fn new(product_id: ProductId, quantity: i32) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

fn validate_lines(lines: &[CheckoutLine]) -> Result<()> {
    if lines.is_empty() {
        return Err(DomainError::Validation(
            "The cart is empty or invalid".to_string(),
        ));
    }
    if let Some(line) = lines.iter().find(|l| l.quantity <= 0) {
        return Err(DomainError::Validation(format!(
            "Invalid quantity {} for product {}",
            line.quantity, line.product_id
        )));
    }
    Ok(())
}

fn failure_reason(err: &DomainError) -> &'static str {
    match err {
        DomainError::Validation(_) => "validation",
        DomainError::NotFound { .. } => "not_found",
        DomainError::InsufficientStock { .. } => "insufficient_stock",
        DomainError::Persistence(_) => "persistence",
        _ => "other",
    }
}

/// Service that places orders for a whole cart.
#[derive(Clone)]
pub struct CheckoutService<R> {
    repo: R,
}

impl<R> CheckoutService<R>
where
    R: CatalogRepository + OrderRepository,
{
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Places one pending order per line, all or nothing.
    ///
    /// Each line is checked against its own product's stock; lines are not
    /// summed per product here. The store's conditional decrement catches
    /// what this check cannot see, including concurrent checkouts, and that
    /// failure is reported as `InsufficientStock` with the stock re-read.
    #[tracing::instrument(skip(self, lines), fields(lines = lines.len()))]
    pub async fn checkout(
        &self,
        account_id: AccountId,
        lines: Vec<CheckoutLine>,
    ) -> Result<Vec<Order>> {
        let start = Instant::now();
        metrics::counter!("checkout_total").increment(1);

        let result = self.place(account_id, lines).await;

        metrics::histogram!("checkout_duration_seconds").record(start.elapsed().as_secs_f64());
        match &result {
            Ok(orders) => {
                metrics::counter!("orders_created_total").increment(orders.len() as u64);
                tracing::info!(orders = orders.len(), "checkout completed");
            }
            Err(err) => {
                let reason = failure_reason(err);
                metrics::counter!("checkout_failed_total", "reason" => reason).increment(1);
                if err.is_retryable() {
                    tracing::error!(error = %err, "checkout failed");
                } else {
                    tracing::warn!(reason, error = %err, "checkout rejected");
                }
            }
        }
        result
    }

    async fn place(&self, account_id: AccountId, lines: Vec<CheckoutLine>) -> Result<Vec<Order>> {
        validate_lines(&lines)?;

        let mut products: HashMap<ProductId, Product> = HashMap::new();
        let mut orders = Vec::with_capacity(lines.len());

        for line in &lines {
            // Each distinct product is read once per checkout.
            if !products.contains_key(&line.product_id) {
                let fetched = self.repo.get_product(line.product_id).await?;
                products.insert(
                    line.product_id,
                    fetched.ok_or(DomainError::product_not_found(line.product_id))?,
                );
            }
            let product = products
                .get(&line.product_id)
                .ok_or(DomainError::product_not_found(line.product_id))?;

            if line.quantity > product.stock {
                return Err(DomainError::InsufficientStock {
                    product_id: product.id,
                    product_name: product.name.clone(),
                    available: product.stock,
                    requested: line.quantity,
                });
            }

            orders.push(NewOrder {
                account_id,
                product_id: product.id,
                product_name: product.name.clone(),
                product_category: product.category.clone(),
                quantity: line.quantity,
                status: OrderStatus::Pending,
            });
        }

        match self.repo.create_orders(orders).await {
            Ok(created) => Ok(created),
            Err(StoreError::StockConflict {
                product_id,
                requested,
            }) => {
                let current = self.repo.get_product(product_id).await?;
                let product_name = current
                    .as_ref()
                    .or_else(|| products.get(&product_id))
                    .map(|p| p.name.clone())
                    .unwrap_or_else(|| product_id.to_string());
                Err(DomainError::InsufficientStock {
                    product_id,
                    product_name,
                    available: current.map(|p| p.stock).unwrap_or(0),
                    requested,
                })
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_cart_and_non_positive_quantities_are_rejected() {
        assert!(matches!(
            validate_lines(&[]),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            validate_lines(&[CheckoutLine::new(ProductId::new(1), 0)]),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            validate_lines(&[
                CheckoutLine::new(ProductId::new(1), 2),
                CheckoutLine::new(ProductId::new(2), -1)
            ]),
            Err(DomainError::Validation(ref m)) if m.contains("product 2")
        ));
        assert!(validate_lines(&[CheckoutLine::new(ProductId::new(1), 1)]).is_ok());
    }

    #[test]
    fn failure_reasons_are_stable_labels() {
        assert_eq!(
            failure_reason(&DomainError::Validation("x".into())),
            "validation"
        );
        assert_eq!(
            failure_reason(&DomainError::product_not_found(ProductId::new(1))),
            "not_found"
        );
    }
}
