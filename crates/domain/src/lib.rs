//! Domain layer for the storefront.
//!
//! This crate provides the services that sit between the HTTP surface and
//! the store:
//! - `CheckoutService` turning a cart into orders atomically
//! - `OrderService` with ownership checks and the status state machine
//! - `AccountService` for registration and credential verification
//! - `CatalogService` for partial product updates and image lookup

pub mod accounts;
pub mod catalog;
pub mod checkout;
pub mod error;
pub mod orders;

pub use accounts::{AccountPatch, AccountService, Registration, hash_secret, verify_secret};
pub use catalog::{
    CatalogService, DEFAULT_IMAGE, IMAGE_EXTENSIONS, ImageResolver, ProductPatch, ProductView,
    resolve_image_name,
};
pub use checkout::{CheckoutLine, CheckoutService};
pub use error::{DomainError, Result};
pub use orders::{Actor, OrderService};
