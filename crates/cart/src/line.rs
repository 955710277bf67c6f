//! Cart contents.

use common::{Money, ProductId};
use serde::{Deserialize, Serialize};

use crate::error::{CartError, Result};
use crate::totals::{CartTotals, Coupon};

/// Product details captured when the product is added to the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Money,
    pub stock: i32,
    pub category: String,
    #[serde(default)]
    pub image: Option<String>,
}

/// One product line in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    #[serde(flatten)]
    pub product: ProductSnapshot,
    pub quantity: i32,
}

impl CartLine {
    pub fn product_id(&self) -> ProductId {
        self.product.product_id
    }

    pub fn line_total(&self) -> Money {
        self.product
            .unit_price
            .multiply(u32::try_from(self.quantity).unwrap_or(0))
    }
}

/// The cart: its lines and the coupon applied for display.
///
/// Every line satisfies `0 < quantity <= stock` as last observed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cart {
    lines: Vec<CartLine>,
    coupon: Option<Coupon>,
}

impl Cart {
    /// Rebuilds a cart from stored lines, dropping lines that no longer
    /// satisfy the quantity invariant.
    pub fn from_lines(lines: Vec<CartLine>) -> Self {
        let lines = lines
            .into_iter()
            .filter(|l| l.quantity > 0 && l.quantity <= l.product.stock)
            .collect();
        Self {
            lines,
            coupon: None,
        }
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line(&self, product_id: ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.product_id() == product_id)
    }

    /// Total number of units across all lines.
    pub fn item_count(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity as i64).sum()
    }

    pub fn coupon(&self) -> Option<Coupon> {
        self.coupon
    }

    pub fn totals(&self) -> CartTotals {
        CartTotals::compute(&self.lines, self.coupon)
    }

    /// Adds units of a product, merging with an existing line.
    ///
    /// The snapshot replaces the stored one. The merged quantity is capped
    /// at the snapshot's stock; adding fails only when no unit fits.
    ///
    /// When the snapshot reports less stock than the line already holds,
    /// the line is refreshed and shrunk to the new stock (removed at zero)
    /// before the error is returned.
    pub fn add(&mut self, product: ProductSnapshot, quantity: i32) -> Result<&CartLine> {
        if quantity <= 0 {
            return Err(CartError::Validation(format!(
                "Quantity must be greater than 0 (got {quantity})"
            )));
        }

        let product_id = product.product_id;
        let stock = product.stock;
        let position = self.lines.iter().position(|l| l.product_id() == product_id);
        let current = position.map(|i| self.lines[i].quantity).unwrap_or(0);
        if current >= stock {
            if let Some(index) = position
                && current > stock
            {
                if stock > 0 {
                    self.lines[index] = CartLine {
                        product,
                        quantity: stock,
                    };
                } else {
                    self.lines.remove(index);
                }
            }
            return Err(CartError::StockExceeded {
                product_id,
                available: stock,
                requested: current.saturating_add(quantity),
            });
        }
        let merged = current.saturating_add(quantity).min(stock);

        let index = match position {
            Some(index) => {
                self.lines[index] = CartLine {
                    product,
                    quantity: merged,
                };
                index
            }
            None => {
                self.lines.push(CartLine {
                    product,
                    quantity: merged,
                });
                self.lines.len() - 1
            }
        };
        Ok(&self.lines[index])
    }

    /// Sets a line's quantity. Zero or less removes the line.
    pub fn update_quantity(&mut self, product_id: ProductId, quantity: i32) -> Result<()> {
        let index = self
            .lines
            .iter()
            .position(|l| l.product_id() == product_id)
            .ok_or(CartError::ItemNotFound(product_id))?;

        if quantity <= 0 {
            self.lines.remove(index);
            return Ok(());
        }

        let line = &mut self.lines[index];
        if quantity > line.product.stock {
            return Err(CartError::StockExceeded {
                product_id,
                available: line.product.stock,
                requested: quantity,
            });
        }
        line.quantity = quantity;
        Ok(())
    }

    /// Takes submitted units out of the cart after a confirmed checkout.
    ///
    /// Units added after the submission stay. The coupon is dropped once
    /// the cart is empty.
    pub fn settle(&mut self, submitted: &[(ProductId, i32)]) {
        for &(product_id, quantity) in submitted {
            if let Some(index) = self.lines.iter().position(|l| l.product_id() == product_id) {
                let line = &mut self.lines[index];
                if line.quantity > quantity {
                    line.quantity -= quantity;
                } else {
                    self.lines.remove(index);
                }
            }
        }
        if self.lines.is_empty() {
            self.coupon = None;
        }
    }

    pub fn remove(&mut self, product_id: ProductId) -> Result<CartLine> {
        let index = self
            .lines
            .iter()
            .position(|l| l.product_id() == product_id)
            .ok_or(CartError::ItemNotFound(product_id))?;
        Ok(self.lines.remove(index))
    }

    /// Empties the cart and forgets the coupon.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.coupon = None;
    }

    /// Applies a coupon code. Unknown codes leave the current coupon in place.
    pub fn apply_coupon(&mut self, code: &str) -> Result<Coupon> {
        let coupon = code
            .parse::<Coupon>()
            .map_err(|_| CartError::Validation(format!("Invalid coupon code: {}", code.trim())))?;
        self.coupon = Some(coupon);
        Ok(coupon)
    }

    pub fn remove_coupon(&mut self) {
        self.coupon = None;
    }
}
