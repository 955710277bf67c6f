//! Submitting the cart to the storefront API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{CartError, Result};
use crate::line::CartLine;

/// One line of a checkout request, in the API's wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CheckoutItem {
    pub product_id: i64,
    #[serde(rename = "cantidad")]
    pub quantity: i32,
}

impl From<&CartLine> for CheckoutItem {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product_id().as_i64(),
            quantity: line.quantity,
        }
    }
}

#[derive(Debug, Serialize)]
struct CheckoutRequest<'a> {
    products: &'a [CheckoutItem],
}

/// An order row created by a successful checkout.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlacedOrder {
    pub id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i32,
    pub status: String,
}

/// Server acknowledgement of a checkout.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckoutReceipt {
    pub success: bool,
    #[serde(rename = "pedidos")]
    pub orders: Vec<PlacedOrder>,
    #[serde(rename = "total_pedidos")]
    pub total_orders: usize,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    message: String,
}

/// Sends a cart to the checkout workflow.
///
/// Implementations return `Ok` only for an explicit success acknowledgement.
#[async_trait]
pub trait CheckoutClient: Send + Sync {
    async fn submit(&self, token: &str, items: &[CheckoutItem]) -> Result<CheckoutReceipt>;
}

/// Checkout over HTTP against `POST {base_url}/orders/cart`.
#[derive(Debug, Clone)]
pub struct HttpCheckoutClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCheckoutClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl CheckoutClient for HttpCheckoutClient {
    #[tracing::instrument(skip(self, token, items), fields(lines = items.len()))]
    async fn submit(&self, token: &str, items: &[CheckoutItem]) -> Result<CheckoutReceipt> {
        let url = format!("{}/orders/cart", self.base_url);

        let resp = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&CheckoutRequest { products: items })
            .send()
            .await?;

        let status = resp.status();
        let body = resp.bytes().await?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorEnvelope>(&body)
                .map(|e| e.message)
                .unwrap_or_else(|_| format!("Checkout failed with status {status}"));
            return Err(CartError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let receipt: CheckoutReceipt = serde_json::from_slice(&body)
            .map_err(|e| CartError::Transport(format!("Invalid checkout response: {e}")))?;
        if !receipt.success {
            return Err(CartError::Rejected {
                status: status.as_u16(),
                message: "Checkout was not acknowledged".to_string(),
            });
        }
        Ok(receipt)
    }
}
