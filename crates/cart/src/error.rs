use common::ProductId;
use thiserror::Error;

/// Errors that can occur when working with the cart.
#[derive(Debug, Error)]
pub enum CartError {
    /// Input the cart cannot accept.
    #[error("{0}")]
    Validation(String),

    /// The product has no line in the cart.
    #[error("Product {0} is not in the cart")]
    ItemNotFound(ProductId),

    /// The requested quantity exceeds the stock last seen for the product.
    #[error("Only {available} units of product {product_id} available (requested {requested})")]
    StockExceeded {
        product_id: ProductId,
        available: i32,
        requested: i32,
    },

    /// Checkout was attempted with no lines.
    #[error("The cart is empty")]
    Empty,

    /// The server answered the checkout with an error envelope.
    #[error("Checkout rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The checkout request never produced a usable answer.
    #[error("Checkout request failed: {0}")]
    Transport(String),

    /// Reading or writing the durable copy failed.
    #[error("Cart storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cart serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<reqwest::Error> for CartError {
    fn from(err: reqwest::Error) -> Self {
        CartError::Transport(err.to_string())
    }
}

/// Result type for cart operations.
pub type Result<T> = std::result::Result<T, CartError>;
