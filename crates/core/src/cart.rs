//! Session cart and reconciliation against the live catalog.
//!
//! The cart lives in the customer's session and caches name, price and image
//! from the moment an item was added. Those cached values are never trusted
//! for totals: [`Cart::reconcile`] rebuilds every line from a
//! [`CatalogSnapshot`] before the cart is shown or checked out.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{Money, Product, ProductId, Size};

/// One (product, size, quantity) entry in a customer's cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    /// Price when the line was last added or reconciled.
    pub unit_price: Money,
    pub image: Option<String>,
    pub size: Size,
    /// Always at least one; a line reaching zero is removed.
    pub quantity: u32,
}

impl CartLine {
    /// `unit_price * quantity`.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.unit_price * self.quantity
    }

    fn is_for(&self, product_id: ProductId, size: &Size) -> bool {
        self.product_id == product_id && self.size == *size
    }
}

/// Result of adding one unit to the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// A new line was appended.
    Added,
    /// An existing line went up by one.
    Incremented,
    /// The existing line already holds all available stock; nothing changed.
    AtStockLimit,
}

/// Returned by [`Cart::add`] when the size has no stock.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{name} is out of stock in size {size}")]
pub struct OutOfStock {
    pub name: String,
    pub size: Size,
}

/// An ordered list of cart lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Build a cart from existing lines, as-is.
    #[must_use]
    pub const fn from_lines(lines: Vec<CartLine>) -> Self {
        Self { lines }
    }

    /// The cart lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn line(&self, index: usize) -> Option<&CartLine> {
        self.lines.get(index)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total number of units across all lines (the cart badge).
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    /// Sum of line totals at the cached prices.
    #[must_use]
    pub fn subtotal(&self) -> Money {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Distinct product ids referenced by the cart.
    #[must_use]
    pub fn product_ids(&self) -> Vec<ProductId> {
        let mut ids: Vec<ProductId> = self.lines.iter().map(|line| line.product_id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Add one unit of `product` in `size`, given the units on hand.
    ///
    /// # Errors
    ///
    /// Returns [`OutOfStock`] when `available` is zero.
    pub fn add(
        &mut self,
        product: &Product,
        size: Size,
        available: u32,
    ) -> Result<AddOutcome, OutOfStock> {
        if available == 0 {
            return Err(OutOfStock {
                name: product.name.clone(),
                size,
            });
        }

        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|line| line.is_for(product.id, &size))
        {
            if line.quantity >= available {
                return Ok(AddOutcome::AtStockLimit);
            }
            line.quantity += 1;
            return Ok(AddOutcome::Incremented);
        }

        self.lines.push(CartLine {
            product_id: product.id,
            name: product.name.clone(),
            unit_price: product.price,
            image: product.image.clone(),
            size,
            quantity: 1,
        });
        Ok(AddOutcome::Added)
    }

    /// Raise the line at `index` by one if it stays within `available`.
    ///
    /// Returns whether the cart changed.
    pub fn increase(&mut self, index: usize, available: u32) -> bool {
        match self.lines.get_mut(index) {
            Some(line) if line.quantity < available => {
                line.quantity += 1;
                true
            }
            _ => false,
        }
    }

    /// Lower the line at `index` by one, removing it when it reaches zero.
    ///
    /// Returns whether the cart changed.
    pub fn decrease(&mut self, index: usize) -> bool {
        match self.lines.get_mut(index) {
            Some(line) if line.quantity > 1 => {
                line.quantity -= 1;
                true
            }
            Some(_) => {
                self.lines.remove(index);
                true
            }
            None => false,
        }
    }

    /// Remove the line at `index`; out-of-range indexes are ignored.
    pub fn remove(&mut self, index: usize) -> Option<CartLine> {
        (index < self.lines.len()).then(|| self.lines.remove(index))
    }

    /// Drop every line.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Rebuild the cart against live catalog state.
    ///
    /// Lines whose product is missing or inactive, or whose size has no
    /// stock, are dropped. Lines for the same (product, size) are merged.
    /// Each quantity is clamped to the units available, and name, price and
    /// image are refreshed from the product record. Applying this twice to
    /// the same snapshot gives the same cart.
    #[must_use]
    pub fn reconcile(&self, snapshot: &CatalogSnapshot) -> Self {
        let mut lines: Vec<CartLine> = Vec::with_capacity(self.lines.len());

        for line in &self.lines {
            let Some(product) = snapshot.product(line.product_id) else {
                continue;
            };
            if !product.active {
                continue;
            }
            let available = snapshot.available(line.product_id, &line.size);
            if available == 0 {
                continue;
            }

            if let Some(merged) = lines
                .iter_mut()
                .find(|existing| existing.is_for(line.product_id, &line.size))
            {
                merged.quantity = merged.quantity.saturating_add(line.quantity).min(available);
                continue;
            }

            let quantity = line.quantity.min(available);
            if quantity == 0 {
                continue;
            }

            lines.push(CartLine {
                product_id: product.id,
                name: product.name.clone(),
                unit_price: product.price,
                image: product.image.clone(),
                size: line.size.clone(),
                quantity,
            });
        }

        Self { lines }
    }
}

/// Point-in-time view of the products and stock a cart refers to.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    products: HashMap<ProductId, Product>,
    stock: HashMap<(ProductId, Size), u32>,
}

impl CatalogSnapshot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a product.
    pub fn insert_product(&mut self, product: Product) {
        self.products.insert(product.id, product);
    }

    /// Record the units on hand for a (product, size).
    pub fn set_stock(&mut self, product_id: ProductId, size: Size, quantity: u32) {
        self.stock.insert((product_id, size), quantity);
    }

    #[must_use]
    pub fn product(&self, id: ProductId) -> Option<&Product> {
        self.products.get(&id)
    }

    /// Units on hand, zero when no stock entry exists.
    #[must_use]
    pub fn available(&self, product_id: ProductId, size: &Size) -> u32 {
        self.stock
            .get(&(product_id, size.clone()))
            .copied()
            .unwrap_or(0)
    }
}
