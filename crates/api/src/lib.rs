//! HTTP API server with observability for the storefront.
//!
//! Provides REST endpoints for the catalog, accounts and orders, with
//! bearer-token authentication, structured logging (tracing) and
//! Prometheus metrics. The storefront's static pages are served as a
//! fallback when a static directory is configured.

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use domain::{AccountService, CatalogService, CheckoutService, ImageResolver, OrderService};
use metrics_exporter_prometheus::PrometheusHandle;
use store::Storefront;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub use auth::TokenIssuer;
pub use state::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Storefront>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
    static_dir: Option<PathBuf>,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    let app = Router::new()
        .route("/health", get(routes::health::check))
        // Catalog
        .route(
            "/products",
            get(routes::products::list::<S>).post(routes::products::create::<S>),
        )
        .route(
            "/products/category/{category}",
            get(routes::products::by_category::<S>),
        )
        .route(
            "/products/{id}",
            get(routes::products::get::<S>)
                .put(routes::products::update::<S>)
                .delete(routes::products::delete::<S>),
        )
        // Accounts
        .route(
            "/users",
            get(routes::users::list::<S>).post(routes::users::register::<S>),
        )
        .route("/users/register", post(routes::users::register::<S>))
        .route("/users/login", post(routes::users::login::<S>))
        .route(
            "/users/profile",
            get(routes::users::profile::<S>).put(routes::users::update_profile::<S>),
        )
        .route(
            "/users/{id}",
            get(routes::users::get::<S>)
                .put(routes::users::update::<S>)
                .delete(routes::users::delete::<S>),
        )
        // Orders
        .route(
            "/orders",
            get(routes::orders::list::<S>).post(routes::orders::create::<S>),
        )
        .route("/orders/cart", post(routes::orders::checkout_cart::<S>))
        .route("/orders/mine", get(routes::orders::mine::<S>))
        .route("/orders/statistics", get(routes::orders::statistics::<S>))
        .route(
            "/orders/account/{id}",
            get(routes::orders::by_account::<S>),
        )
        .route(
            "/orders/{id}",
            get(routes::orders::get::<S>).delete(routes::orders::delete::<S>),
        )
        .route(
            "/orders/{id}/status",
            put(routes::orders::update_status::<S>),
        )
        .with_state(state)
        .merge(metrics_router);

    let app = match static_dir {
        Some(dir) => app.fallback_service(ServeDir::new(dir)),
        None => app,
    };

    app.layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    )
    .layer(TraceLayer::new_for_http())
}

/// Creates the application state with every service over one store.
pub fn create_default_state<S: Storefront>(
    store: S,
    tokens: TokenIssuer,
    images: ImageResolver,
) -> Arc<AppState<S>> {
    Arc::new(AppState {
        catalog: CatalogService::new(store.clone(), images),
        accounts: AccountService::new(store.clone()),
        orders: OrderService::new(store.clone()),
        checkout: CheckoutService::new(store),
        tokens,
    })
}
