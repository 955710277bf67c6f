//! Catalog endpoints: public reads, administrator writes.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use domain::{ProductPatch, ProductView};
use serde::{Deserialize, Serialize};
use store::{Money, ProductDraft, ProductId, Storefront};

use crate::auth::AdminUser;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::state::AppState;

// -- Request types --

/// A price sent either as a JSON number or as a decimal string.
#[derive(Deserialize)]
#[serde(untagged)]
pub enum PriceInput {
    Number(f64),
    Text(String),
}

impl PriceInput {
    fn to_money(&self) -> Result<Money, ApiError> {
        let amount = match self {
            PriceInput::Number(n) => *n,
            PriceInput::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| ApiError::BadRequest(format!("Invalid price '{s}'")))?,
        };
        Money::try_from_decimal(amount)
            .ok_or_else(|| ApiError::BadRequest("Invalid price".to_string()))
    }
}

/// Product fields for create and update. Every field is optional here;
/// create checks the required ones.
#[derive(Deserialize, Default)]
pub struct ProductRequest {
    #[serde(alias = "nombre")]
    pub name: Option<String>,
    #[serde(alias = "descripcion")]
    pub description: Option<String>,
    #[serde(alias = "categoria")]
    pub category: Option<String>,
    #[serde(alias = "subcategoria")]
    pub subcategory: Option<String>,
    #[serde(alias = "precio")]
    pub price: Option<PriceInput>,
    pub stock: Option<i32>,
}

impl ProductRequest {
    fn into_draft(self) -> Result<ProductDraft, ApiError> {
        let (Some(name), Some(category), Some(price)) = (self.name, self.category, self.price)
        else {
            return Err(ApiError::BadRequest(
                "Name, category and price are required".to_string(),
            ));
        };
        Ok(ProductDraft {
            name,
            description: self.description,
            category,
            subcategory: self.subcategory,
            price: price.to_money()?,
            stock: self.stock.unwrap_or(0),
        })
    }

    fn into_patch(self) -> Result<ProductPatch, ApiError> {
        Ok(ProductPatch {
            price: self.price.as_ref().map(PriceInput::to_money).transpose()?,
            name: self.name,
            description: self.description,
            category: self.category,
            subcategory: self.subcategory,
            stock: self.stock,
        })
    }
}

// -- Response types --

#[derive(Serialize)]
pub struct ProductResponse {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub subcategory: Option<String>,
    pub price: f64,
    pub stock: i32,
    pub image: String,
}

impl From<ProductView> for ProductResponse {
    fn from(view: ProductView) -> Self {
        let product = view.product;
        Self {
            id: product.id,
            name: product.name,
            description: product.description,
            category: product.category,
            subcategory: product.subcategory,
            price: product.price.as_decimal(),
            stock: product.stock,
            image: view.image,
        }
    }
}

#[derive(Serialize)]
pub struct ProductListResponse {
    pub success: bool,
    pub products: Vec<ProductResponse>,
}

impl From<Vec<ProductView>> for ProductListResponse {
    fn from(views: Vec<ProductView>) -> Self {
        Self {
            success: true,
            products: views.into_iter().map(ProductResponse::from).collect(),
        }
    }
}

#[derive(Serialize)]
pub struct ProductEnvelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub product: ProductResponse,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: &'static str,
}

// -- Handlers --

/// GET /products
pub async fn list<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<ProductListResponse>, ApiError> {
    let products = state.catalog.list().await?;
    Ok(Json(products.into()))
}

/// GET /products/{id}
pub async fn get<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ProductEnvelope>, ApiError> {
    let product = state.catalog.get(ProductId::new(id)).await?;
    Ok(Json(ProductEnvelope {
        success: true,
        message: None,
        product: product.into(),
    }))
}

/// GET /products/category/{category}
pub async fn by_category<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    ApiPath(category): ApiPath<String>,
) -> Result<Json<ProductListResponse>, ApiError> {
    let products = state.catalog.by_category(&category).await?;
    Ok(Json(products.into()))
}

/// POST /products: administrators only.
#[tracing::instrument(skip(state, admin, req), fields(admin = %admin.0.account_id))]
pub async fn create<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    admin: AdminUser,
    ApiJson(req): ApiJson<ProductRequest>,
) -> Result<(StatusCode, Json<ProductEnvelope>), ApiError> {
    let product = state.catalog.create(req.into_draft()?).await?;
    Ok((
        StatusCode::CREATED,
        Json(ProductEnvelope {
            success: true,
            message: Some("Product created"),
            product: product.into(),
        }),
    ))
}

/// PUT /products/{id}: partial update, administrators only.
#[tracing::instrument(skip(state, admin, req), fields(admin = %admin.0.account_id))]
pub async fn update<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    admin: AdminUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<ProductRequest>,
) -> Result<Json<ProductEnvelope>, ApiError> {
    let product = state
        .catalog
        .update(ProductId::new(id), req.into_patch()?)
        .await?;
    Ok(Json(ProductEnvelope {
        success: true,
        message: Some("Product updated"),
        product: product.into(),
    }))
}

/// DELETE /products/{id}: administrators only.
#[tracing::instrument(skip(state, admin), fields(admin = %admin.0.account_id))]
pub async fn delete<S: Storefront>(
    State(state): State<Arc<AppState<S>>>,
    admin: AdminUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.catalog.delete(ProductId::new(id)).await?;
    Ok(Json(MessageResponse {
        success: true,
        message: "Product deleted",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prices_accept_numbers_and_strings() {
        let req: ProductRequest =
            serde_json::from_str(r#"{"nombre":"Lamp","categoria":"home","precio":"19.99"}"#)
                .unwrap();
        let draft = req.into_draft().unwrap();
        assert_eq!(draft.price, Money::from_cents(1999));
        assert_eq!(draft.stock, 0);

        let req: ProductRequest =
            serde_json::from_str(r#"{"name":"Lamp","category":"home","price":5}"#).unwrap();
        assert_eq!(req.into_draft().unwrap().price, Money::from_cents(500));
    }

    #[test]
    fn create_needs_name_category_and_price() {
        let req: ProductRequest = serde_json::from_str(r#"{"name":"Lamp"}"#).unwrap();
        assert!(matches!(req.into_draft(), Err(ApiError::BadRequest(_))));

        let req: ProductRequest =
            serde_json::from_str(r#"{"name":"Lamp","category":"home","price":"cheap"}"#).unwrap();
        assert!(matches!(req.into_draft(), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn patch_keeps_absent_fields_empty() {
        let req: ProductRequest = serde_json::from_str(r#"{"stock":3}"#).unwrap();
        let patch = req.into_patch().unwrap();
        assert_eq!(patch.stock, Some(3));
        assert!(patch.name.is_none());
        assert!(patch.price.is_none());
    }
}
