//! `PostgreSQL` catalog reads.

use async_trait::async_trait;
use sqlx::PgPool;

use streetlab_core::{CatalogSnapshot, Product, ProductId, Size, StockLevel};

use super::{RepositoryError, units};
use crate::ports::{CatalogStore, StoreError};

const PRODUCT_COLUMNS: &str = "id, slug, name, price, description, category, image, active";

/// [`CatalogStore`] backed by the `products` and `product_stock` tables.
#[derive(Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn ids_param(ids: &[ProductId]) -> Vec<i32> {
    ids.iter().map(ProductId::as_i32).collect()
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn product_by_slug(&self, slug: &str) -> Result<Option<Product>, StoreError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(product)
    }

    async fn product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(product)
    }

    async fn stock(&self, product_id: ProductId, size: &Size) -> Result<u32, StoreError> {
        let quantity: Option<i32> = sqlx::query_scalar(
            "SELECT quantity FROM product_stock WHERE product_id = $1 AND size = $2",
        )
        .bind(product_id)
        .bind(size)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(quantity.map(units).transpose()?.unwrap_or(0))
    }

    async fn stock_levels(&self, product_id: ProductId) -> Result<Vec<StockLevel>, StoreError> {
        let mut levels = sqlx::query_as::<_, StockLevel>(
            "SELECT product_id, size, quantity FROM product_stock WHERE product_id = $1",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        levels.sort_by_key(|level| (level.size.display_rank(), level.size.clone()));
        Ok(levels)
    }

    async fn snapshot(&self, product_ids: &[ProductId]) -> Result<CatalogSnapshot, StoreError> {
        let mut snapshot = CatalogSnapshot::new();
        if product_ids.is_empty() {
            return Ok(snapshot);
        }
        let ids = ids_param(product_ids);

        // Products and stock must come from the same point in time
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(RepositoryError::from)?;

        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)"
        ))
        .bind(&ids)
        .fetch_all(&mut *tx)
        .await
        .map_err(RepositoryError::from)?;

        let levels = sqlx::query_as::<_, StockLevel>(
            "SELECT product_id, size, quantity FROM product_stock WHERE product_id = ANY($1)",
        )
        .bind(&ids)
        .fetch_all(&mut *tx)
        .await
        .map_err(RepositoryError::from)?;

        tx.commit().await.map_err(RepositoryError::from)?;

        for product in products {
            snapshot.insert_product(product);
        }
        for level in levels {
            let quantity = units(level.quantity)?;
            snapshot.set_stock(level.product_id, level.size, quantity);
        }

        Ok(snapshot)
    }

    async fn featured(&self, limit: u32) -> Result<Vec<Product>, StoreError> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE active ORDER BY id DESC LIMIT $1"
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(products)
    }

    async fn active_products(&self, category: Option<&str>) -> Result<Vec<Product>, StoreError> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE active AND ($1::text IS NULL OR category = $1) \
             ORDER BY id DESC"
        ))
        .bind(category)
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(products)
    }

    async fn categories(&self) -> Result<Vec<String>, StoreError> {
        let categories = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT category FROM products \
             WHERE active AND category IS NOT NULL AND category <> '' \
             ORDER BY category",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(categories)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_param_preserves_order() {
        let ids = [ProductId::new(3), ProductId::new(1)];
        assert_eq!(ids_param(&ids), vec![3, 1]);
    }
}
