//! Storage ports used by the cart and checkout services.
//!
//! Services depend on these traits rather than on `PgPool` so the same
//! reconciliation and commit logic runs against Postgres in production and
//! against [`crate::db::memory::InMemoryStore`] in tests.

use async_trait::async_trait;

use streetlab_core::{CatalogSnapshot, NewOrder, OrderId, Product, ProductId, Size, StockLevel};

use crate::db::RepositoryError;
use crate::models::OrderSummary;

/// Errors from read operations on a store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing store could not be reached or the query failed.
    #[error("storage failure: {0}")]
    Unavailable(String),

    /// A stored row could not be turned into a domain value.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

impl From<RepositoryError> for StoreError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::DataCorruption(msg) => Self::DataCorruption(msg),
            other => Self::Unavailable(other.to_string()),
        }
    }
}

/// Read access to products and stock.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Look up a product by slug, active or not.
    async fn product_by_slug(&self, slug: &str) -> Result<Option<Product>, StoreError>;

    /// Look up a product by id, active or not.
    async fn product(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    /// Units on hand for one size; zero when no stock row exists.
    async fn stock(&self, product_id: ProductId, size: &Size) -> Result<u32, StoreError>;

    /// All stock rows of a product, including empty ones.
    async fn stock_levels(&self, product_id: ProductId) -> Result<Vec<StockLevel>, StoreError>;

    /// Products and stock for the given ids, in one consistent read.
    async fn snapshot(&self, product_ids: &[ProductId]) -> Result<CatalogSnapshot, StoreError>;

    /// Newest active products, most recent first.
    async fn featured(&self, limit: u32) -> Result<Vec<Product>, StoreError>;

    /// Active products, optionally restricted to one category.
    async fn active_products(&self, category: Option<&str>) -> Result<Vec<Product>, StoreError>;

    /// Distinct categories of active products.
    async fn categories(&self) -> Result<Vec<String>, StoreError>;
}

/// How a commit resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// A new order was written and stock decremented.
    Committed(OrderId),
    /// The token already belonged to a committed order; nothing was written.
    Replayed(OrderId),
}

impl CommitOutcome {
    #[must_use]
    pub const fn order_id(self) -> OrderId {
        match self {
            Self::Committed(id) | Self::Replayed(id) => id,
        }
    }
}

/// Why a commit was rolled back.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommitError {
    /// A line asked for more units than remain.
    #[error("not enough stock for {name} (size {size})")]
    StockConflict {
        product_id: ProductId,
        name: String,
        size: Size,
    },

    /// A uniqueness or reference constraint rejected the write.
    #[error("integrity conflict: {0}")]
    IntegrityConflict(String),

    /// The store failed for a reason unrelated to the order's content.
    #[error("storage failure: {0}")]
    Storage(String),
}

/// Order persistence.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Write the order, its lines and the stock decrements as one unit.
    ///
    /// Either everything is persisted or nothing is. A token that already
    /// names a committed order yields [`CommitOutcome::Replayed`].
    async fn commit_order(&self, order: &NewOrder) -> Result<CommitOutcome, CommitError>;

    /// Order header and lines for the confirmation page.
    async fn order_summary(&self, id: OrderId) -> Result<Option<OrderSummary>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_outcome_order_id() {
        let id = OrderId::new(12);
        assert_eq!(CommitOutcome::Committed(id).order_id(), id);
        assert_eq!(CommitOutcome::Replayed(id).order_id(), id);
    }

    #[test]
    fn test_repository_error_conversion() {
        let err: StoreError = RepositoryError::DataCorruption("bad size".to_owned()).into();
        assert!(matches!(err, StoreError::DataCorruption(_)));

        let err: StoreError = RepositoryError::NotFound.into();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }
}
