//! Displayed cart totals and coupons.

use common::Money;
use serde::{Deserialize, Serialize};

use crate::line::CartLine;

/// Sales tax applied to the subtotal.
pub const TAX_RATE: f64 = 0.16;

/// Subtotals strictly above this ship for free.
pub const FREE_SHIPPING_THRESHOLD: Money = Money::from_cents(50_000);

pub const SHIPPING_FEE: Money = Money::from_cents(5_000);

/// Discount codes accepted by the storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Coupon {
    #[serde(rename = "DESCUENTO10")]
    Descuento10,
    #[serde(rename = "WELCOME20")]
    Welcome20,
    #[serde(rename = "SAVE15")]
    Save15,
    #[serde(rename = "NEWUSER")]
    NewUser,
}

impl Coupon {
    pub const ALL: [Coupon; 4] = [
        Coupon::Descuento10,
        Coupon::Welcome20,
        Coupon::Save15,
        Coupon::NewUser,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Coupon::Descuento10 => "DESCUENTO10",
            Coupon::Welcome20 => "WELCOME20",
            Coupon::Save15 => "SAVE15",
            Coupon::NewUser => "NEWUSER",
        }
    }

    /// Fraction of the subtotal taken off.
    pub fn rate(&self) -> f64 {
        match self {
            Coupon::Descuento10 => 0.10,
            Coupon::Welcome20 => 0.20,
            Coupon::Save15 => 0.15,
            Coupon::NewUser => 0.25,
        }
    }
}

impl std::fmt::Display for Coupon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Error returned for unknown coupon codes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown coupon code: {0}")]
pub struct UnknownCoupon(pub String);

impl std::str::FromStr for Coupon {
    type Err = UnknownCoupon;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_uppercase();
        Coupon::ALL
            .into_iter()
            .find(|c| c.code() == code)
            .ok_or_else(|| UnknownCoupon(s.trim().to_string()))
    }
}

/// Amounts shown for a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CartTotals {
    pub subtotal: Money,
    pub tax: Money,
    pub shipping: Money,
    pub discount: Money,
    pub total: Money,
}

impl CartTotals {
    /// total = subtotal + tax + shipping - discount.
    ///
    /// The discount is taken from the subtotal only. An empty cart costs
    /// nothing, shipping included.
    pub fn compute(lines: &[CartLine], coupon: Option<Coupon>) -> Self {
        if lines.is_empty() {
            return Self::default();
        }

        let subtotal: Money = lines.iter().map(CartLine::line_total).sum();
        let tax = subtotal.apply_rate(TAX_RATE);
        let shipping = if subtotal > FREE_SHIPPING_THRESHOLD {
            Money::zero()
        } else {
            SHIPPING_FEE
        };
        let discount = coupon
            .map(|c| subtotal.apply_rate(c.rate()))
            .unwrap_or_default();

        Self {
            subtotal,
            tax,
            shipping,
            discount,
            total: subtotal + tax + shipping - discount,
        }
    }
}
