//! Client cart cache for the storefront.
//!
//! [`CartStore`] owns the cart and mirrors it to a [`CartStorage`] so it
//! survives restarts. Checkout sends the whole cart through a
//! [`CheckoutClient`] and removes the submitted lines only on an explicit
//! success.

pub mod checkout;
pub mod error;
pub mod line;
pub mod storage;
pub mod store;
pub mod totals;

pub use checkout::{CheckoutClient, CheckoutItem, CheckoutReceipt, HttpCheckoutClient, PlacedOrder};
pub use error::{CartError, Result};
pub use line::{Cart, CartLine, ProductSnapshot};
pub use storage::{CartStorage, FileCartStorage, MemoryCartStorage};
pub use store::CartStore;
pub use totals::{
    CartTotals, Coupon, FREE_SHIPPING_THRESHOLD, SHIPPING_FEE, TAX_RATE, UnknownCoupon,
};
