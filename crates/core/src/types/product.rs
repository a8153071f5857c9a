//! Catalog records.

use serde::{Deserialize, Serialize};

use super::{Money, ProductId, Size};

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Product {
    pub id: ProductId,
    /// URL handle, unique across the catalog.
    pub slug: String,
    pub name: String,
    pub price: Money,
    pub description: Option<String>,
    pub category: Option<String>,
    /// Image file name under the static uploads directory.
    pub image: Option<String>,
    /// Inactive products are hidden from the shop and dropped from carts.
    pub active: bool,
}

/// Units on hand for one size of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct StockLevel {
    pub product_id: ProductId,
    pub size: Size,
    /// Never negative; the database enforces `quantity >= 0`.
    pub quantity: i32,
}

impl StockLevel {
    /// Quantity as an unsigned count, treating any negative value as zero.
    #[must_use]
    pub fn available(&self) -> u32 {
        u32::try_from(self.quantity).unwrap_or(0)
    }
}
