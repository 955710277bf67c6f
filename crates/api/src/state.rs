//! Shared application state.

use std::sync::Arc;

use axum::extract::FromRef;
use domain::{AccountService, CatalogService, CheckoutService, OrderService};

use crate::auth::TokenIssuer;

/// Services shared by all handlers, each over the same store.
pub struct AppState<S> {
    pub catalog: CatalogService<S>,
    pub accounts: AccountService<S>,
    pub orders: OrderService<S>,
    pub checkout: CheckoutService<S>,
    pub tokens: TokenIssuer,
}

impl<S> FromRef<Arc<AppState<S>>> for TokenIssuer {
    fn from_ref(state: &Arc<AppState<S>>) -> Self {
        state.tokens.clone()
    }
}
