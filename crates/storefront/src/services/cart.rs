//! Cart reconciliation and mutations against the live catalog.

use tracing::instrument;

use streetlab_core::{AddOutcome, Cart, OutOfStock, Size};

use crate::ports::{CatalogStore, StoreError};

/// Errors from cart mutations that the customer sees.
#[derive(Debug, thiserror::Error)]
pub enum CartError {
    #[error("Select a size")]
    MissingSize,

    #[error("Product not found")]
    ProductNotFound,

    #[error("{0}")]
    OutOfStock(#[from] OutOfStock),

    #[error("storage failure: {0}")]
    Store(#[from] StoreError),
}

/// Validates session carts against current products and stock.
///
/// Borrowed from `AppState` per request; holds no state of its own.
pub struct CartReconciler<'a> {
    catalog: &'a dyn CatalogStore,
}

impl<'a> CartReconciler<'a> {
    #[must_use]
    pub const fn new(catalog: &'a dyn CatalogStore) -> Self {
        Self { catalog }
    }

    /// Produce a cart whose every line references an active product and
    /// fits within live stock, priced at current prices.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the catalog cannot be read.
    #[instrument(skip(self, cart), fields(lines = cart.lines().len()))]
    pub async fn reconcile(&self, cart: &Cart) -> Result<Cart, StoreError> {
        if cart.is_empty() {
            return Ok(Cart::new());
        }

        let snapshot = self.catalog.snapshot(&cart.product_ids()).await?;
        let cleaned = cart.reconcile(&snapshot);

        if cleaned != *cart {
            tracing::debug!(
                before = cart.item_count(),
                after = cleaned.item_count(),
                "Cart adjusted to catalog"
            );
        }
        Ok(cleaned)
    }

    /// Add one unit of the product `slug` in `size`.
    ///
    /// # Errors
    ///
    /// Returns `CartError::MissingSize` for a blank size,
    /// `CartError::ProductNotFound` for an unknown or inactive product, and
    /// `CartError::OutOfStock` when the size has no units.
    #[instrument(skip(self, cart))]
    pub async fn add(
        &self,
        cart: &mut Cart,
        slug: &str,
        size: Option<&str>,
    ) -> Result<AddOutcome, CartError> {
        let size = size
            .and_then(|code| Size::parse(code).ok())
            .ok_or(CartError::MissingSize)?;

        let product = self
            .catalog
            .product_by_slug(slug)
            .await?
            .filter(|product| product.active)
            .ok_or(CartError::ProductNotFound)?;

        let available = self.catalog.stock(product.id, &size).await?;
        Ok(cart.add(&product, size, available)?)
    }

    /// Raise the line at `index` by one unit, bounded by live stock.
    ///
    /// Returns whether the cart changed; an out-of-range index is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if stock cannot be read.
    pub async fn increase(&self, cart: &mut Cart, index: usize) -> Result<bool, StoreError> {
        let Some(line) = cart.line(index) else {
            return Ok(false);
        };
        let available = self.catalog.stock(line.product_id, &line.size).await?;
        Ok(cart.increase(index, available))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::db::InMemoryStore;
    use streetlab_core::{Money, Product, ProductId};

    fn tee(id: i32, cents: i64) -> Product {
        Product {
            id: ProductId::new(id),
            slug: format!("tee-{id}"),
            name: format!("Tee {id}"),
            price: Money::from_cents(cents),
            description: None,
            category: None,
            image: None,
            active: true,
        }
    }

    fn size(code: &str) -> Size {
        Size::parse(code).unwrap()
    }

    async fn store_with_tee(stock: u32) -> InMemoryStore {
        let store = InMemoryStore::new();
        store.insert_product(tee(1, 9900)).await;
        store.set_stock(ProductId::new(1), size("M"), stock).await;
        store
    }

    #[tokio::test]
    async fn test_add_requires_size() {
        let store = store_with_tee(3).await;
        let reconciler = CartReconciler::new(&store);
        let mut cart = Cart::new();

        let err = reconciler.add(&mut cart, "tee-1", Some("  ")).await;
        assert!(matches!(err, Err(CartError::MissingSize)));
        let err = reconciler.add(&mut cart, "tee-1", None).await;
        assert!(matches!(err, Err(CartError::MissingSize)));
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_add_unknown_or_out_of_stock() {
        let store = store_with_tee(0).await;
        let reconciler = CartReconciler::new(&store);
        let mut cart = Cart::new();

        assert!(matches!(
            reconciler.add(&mut cart, "missing", Some("M")).await,
            Err(CartError::ProductNotFound)
        ));
        assert!(matches!(
            reconciler.add(&mut cart, "tee-1", Some("M")).await,
            Err(CartError::OutOfStock(_))
        ));
    }

    #[tokio::test]
    async fn test_increase_bounded_by_stock() {
        let store = store_with_tee(2).await;
        let reconciler = CartReconciler::new(&store);
        let mut cart = Cart::new();
        reconciler.add(&mut cart, "tee-1", Some("m")).await.unwrap();

        assert!(reconciler.increase(&mut cart, 0).await.unwrap());
        assert!(!reconciler.increase(&mut cart, 0).await.unwrap());
        assert!(!reconciler.increase(&mut cart, 7).await.unwrap());
        assert_eq!(cart.item_count(), 2);
    }

    #[tokio::test]
    async fn test_reconcile_picks_up_price_change_and_stock_drop() {
        let store = store_with_tee(5).await;
        let reconciler = CartReconciler::new(&store);
        let mut cart = Cart::new();
        for _ in 0..4 {
            reconciler.add(&mut cart, "tee-1", Some("M")).await.unwrap();
        }

        store.insert_product(tee(1, 12900)).await;
        store.set_stock(ProductId::new(1), size("M"), 2).await;
        let cleaned = reconciler.reconcile(&cart).await.unwrap();

        assert_eq!(cleaned.lines()[0].quantity, 2);
        assert_eq!(cleaned.lines()[0].unit_price, Money::from_cents(12900));
        assert_eq!(reconciler.reconcile(&cleaned).await.unwrap(), cleaned);
    }
}
