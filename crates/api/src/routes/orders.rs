//! Order endpoints: checkout, owner views, status changes and
//! administration.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use domain::CheckoutLine;
use serde::{Deserialize, Serialize};
use store::{AccountId, Order, OrderId, ProductId, StatusStatistics, Storefront};

use crate::auth::{AdminUser, AuthUser};
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::state::AppState;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct OrderLineRequest {
    #[serde(alias = "producto_id")]
    pub product_id: i64,
    #[serde(rename = "cantidad", alias = "quantity")]
    pub quantity: i32,
}

impl From<&OrderLineRequest> for CheckoutLine {
    fn from(line: &OrderLineRequest) -> Self {
        CheckoutLine::new(ProductId::new(line.product_id), line.quantity)
    }
}

/// A whole cart. A missing `products` field is treated as an empty cart so
/// it is rejected by the checkout validation like any other empty cart.
#[derive(Debug, Deserialize)]
pub struct CartCheckoutRequest {
    #[serde(default, alias = "productos")]
    pub products: Vec<OrderLineRequest>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    #[serde(alias = "estado")]
    pub status: Option<String>,
}

// -- Response types --

/// Checkout acknowledgement, in the field names the storefront client reads.
#[derive(Serialize)]
pub struct CartCheckoutResponse {
    pub success: bool,
    pub message: String,
    pub pedidos: Vec<Order>,
    pub total_pedidos: usize,
}

#[derive(Serialize)]
pub struct OrderEnvelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub order: Order,
}

#[derive(Serialize)]
pub struct OrderListResponse {
    pub success: bool,
    pub orders: Vec<Order>,
}

impl From<Vec<Order>> for OrderListResponse {
    fn from(orders: Vec<Order>) -> Self {
        Self {
            success: true,
            orders,
        }
    }
}

#[derive(Serialize)]
pub struct StatisticsResponse {
    pub success: bool,
    pub statistics: Vec<StatusStatistics>,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: &'static str,
}

// -- Handlers --

/// POST /orders/cart: places one order per cart line, all or nothing.
#[tracing::instrument(skip(state, user, req), fields(account_id = %user.account_id))]
pub async fn checkout_cart<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    ApiJson(req): ApiJson<CartCheckoutRequest>,
) -> Result<(StatusCode, Json<CartCheckoutResponse>), ApiError> {
    let lines = req.products.iter().map(CheckoutLine::from).collect();
    let orders = state.checkout.checkout(user.account_id, lines).await?;

    Ok((
        StatusCode::CREATED,
        Json(CartCheckoutResponse {
            success: true,
            message: format!("{} order(s) created", orders.len()),
            total_pedidos: orders.len(),
            pedidos: orders,
        }),
    ))
}

/// POST /orders: a single-line checkout.
#[tracing::instrument(skip(state, user, req), fields(account_id = %user.account_id))]
pub async fn create<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    ApiJson(req): ApiJson<OrderLineRequest>,
) -> Result<(StatusCode, Json<OrderEnvelope>), ApiError> {
    let mut orders = state
        .checkout
        .checkout(user.account_id, vec![CheckoutLine::from(&req)])
        .await?;
    let order = orders
        .pop()
        .ok_or_else(|| ApiError::Internal("checkout returned no order".to_string()))?;

    Ok((
        StatusCode::CREATED,
        Json(OrderEnvelope {
            success: true,
            message: Some("Order created"),
            order,
        }),
    ))
}

/// GET /orders/mine
pub async fn mine<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
) -> Result<Json<OrderListResponse>, ApiError> {
    let orders = state.orders.mine(user.actor()).await?;
    Ok(Json(orders.into()))
}

/// GET /orders/{id}: the owner or an administrator.
pub async fn get<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<OrderEnvelope>, ApiError> {
    let order = state.orders.get(user.actor(), OrderId::new(id)).await?;
    Ok(Json(OrderEnvelope {
        success: true,
        message: None,
        order,
    }))
}

/// PUT /orders/{id}/status
#[tracing::instrument(skip(state, user, req), fields(account_id = %user.account_id))]
pub async fn update_status<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<StatusRequest>,
) -> Result<Json<OrderEnvelope>, ApiError> {
    let status = req
        .status
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Status is required".to_string()))?;

    let order = state
        .orders
        .update_status(user.actor(), OrderId::new(id), status.trim())
        .await?;
    Ok(Json(OrderEnvelope {
        success: true,
        message: Some("Order status updated"),
        order,
    }))
}

/// GET /orders: administrators only.
pub async fn list<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    AdminUser(admin): AdminUser,
) -> Result<Json<OrderListResponse>, ApiError> {
    let orders = state.orders.all(admin.actor()).await?;
    Ok(Json(orders.into()))
}

/// GET /orders/statistics: administrators only.
pub async fn statistics<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    AdminUser(admin): AdminUser,
) -> Result<Json<StatisticsResponse>, ApiError> {
    let statistics = state.orders.statistics(admin.actor()).await?;
    Ok(Json(StatisticsResponse {
        success: true,
        statistics,
    }))
}

/// GET /orders/account/{id}: administrators only.
pub async fn by_account<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<OrderListResponse>, ApiError> {
    let orders = state
        .orders
        .by_account(admin.actor(), AccountId::new(id))
        .await?;
    Ok(Json(orders.into()))
}

/// DELETE /orders/{id}: administrators only.
#[tracing::instrument(skip(state, admin), fields(admin = %admin.account_id))]
pub async fn delete<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.orders.delete(admin.actor(), OrderId::new(id)).await?;
    Ok(Json(MessageResponse {
        success: true,
        message: "Order deleted",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cart_lines_accept_both_field_spellings() {
        let req: CartCheckoutRequest = serde_json::from_str(
            r#"{"products":[{"product_id":1,"cantidad":2},{"producto_id":3,"quantity":1}]}"#,
        )
        .unwrap();
        let lines: Vec<CheckoutLine> = req.products.iter().map(CheckoutLine::from).collect();
        assert_eq!(
            lines,
            vec![
                CheckoutLine::new(ProductId::new(1), 2),
                CheckoutLine::new(ProductId::new(3), 1)
            ]
        );
    }

    #[test]
    fn missing_products_is_an_empty_cart() {
        let req: CartCheckoutRequest = serde_json::from_str("{}").unwrap();
        assert!(req.products.is_empty());
    }

    #[test]
    fn status_accepts_legacy_field_name() {
        let req: StatusRequest = serde_json::from_str(r#"{"estado":"enviado"}"#).unwrap();
        assert_eq!(req.status.as_deref(), Some("enviado"));
    }
}
