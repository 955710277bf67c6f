//! Actor-aware order reads and status changes.

use store::{
    AccountId, Order, OrderId, OrderRepository, OrderStatus, Role, StatusStatistics, StoreError,
};

use crate::error::{DomainError, Result};

/// The authenticated caller of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub account_id: AccountId,
    pub role: Role,
}

impl Actor {
    pub fn new(account_id: AccountId, role: Role) -> Self {
        Self { account_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    fn owns(&self, order: &Order) -> bool {
        order.account_id == self.account_id
    }

    fn require_admin(&self) -> Result<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(DomainError::Forbidden(
                "Administrator role required".to_string(),
            ))
        }
    }
}

/// Service for reading orders and moving them through their lifecycle.
#[derive(Clone)]
pub struct OrderService<R> {
    repo: R,
}

impl<R: OrderRepository> OrderService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Loads an order the actor may see: its own, or any for administrators.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, actor: Actor, id: OrderId) -> Result<Order> {
        let order = self.repo.get_order(id).await?.ok_or(DomainError::NotFound {
            entity: "Order",
            id: id.as_i64(),
        })?;

        if actor.is_admin() || actor.owns(&order) {
            Ok(order)
        } else {
            Err(DomainError::Forbidden(
                "You do not have access to this order".to_string(),
            ))
        }
    }

    /// The actor's own orders, newest first.
    pub async fn mine(&self, actor: Actor) -> Result<Vec<Order>> {
        Ok(self.repo.orders_by_account(actor.account_id).await?)
    }

    pub async fn all(&self, actor: Actor) -> Result<Vec<Order>> {
        actor.require_admin()?;
        Ok(self.repo.list_orders().await?)
    }

    pub async fn by_account(&self, actor: Actor, account_id: AccountId) -> Result<Vec<Order>> {
        if actor.account_id != account_id {
            actor.require_admin()?;
        }
        Ok(self.repo.orders_by_account(account_id).await?)
    }

    /// Changes an order's status.
    ///
    /// Administrators may move a pending order to any other status. Owners
    /// may only cancel, and only while the order is still pending. The store
    /// update is compare-and-set on the status read here, so a concurrent
    /// change surfaces as `InvalidTransition` instead of being overwritten.
    #[tracing::instrument(skip(self))]
    pub async fn update_status(&self, actor: Actor, id: OrderId, requested: &str) -> Result<Order> {
        let to: OrderStatus = requested.parse().map_err(|_| {
            DomainError::Validation(format!(
                "Invalid status '{requested}'. Allowed: pending, shipped, delivered, cancelled"
            ))
        })?;

        let order = self.get(actor, id).await?;
        let from = order.status;

        if !actor.is_admin() {
            if to != OrderStatus::Cancelled {
                return Err(DomainError::Forbidden(
                    "You can only cancel your own orders".to_string(),
                ));
            }
            if !from.can_cancel() {
                return Err(DomainError::InvalidTransition { from, to });
            }
        } else if !from.can_transition_to(to) {
            return Err(DomainError::InvalidTransition { from, to });
        }

        let updated = self
            .repo
            .transition_order_status(id, from, to)
            .await
            .map_err(|err| match err {
                StoreError::StatusConflict { current, .. } => {
                    DomainError::InvalidTransition { from: current, to }
                }
                other => other.into(),
            })?;

        metrics::counter!("order_status_changes_total", "status" => to.as_str()).increment(1);
        tracing::info!(order_id = %id, %from, %to, "order status changed");
        Ok(updated)
    }

    pub async fn delete(&self, actor: Actor, id: OrderId) -> Result<()> {
        actor.require_admin()?;
        if self.repo.delete_order(id).await? {
            Ok(())
        } else {
            Err(DomainError::NotFound {
                entity: "Order",
                id: id.as_i64(),
            })
        }
    }

    pub async fn statistics(&self, actor: Actor) -> Result<Vec<StatusStatistics>> {
        actor.require_admin()?;
        Ok(self.repo.order_statistics().await?)
    }
}
