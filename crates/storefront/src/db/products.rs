//! Product administration.
//!
//! Back-office writes to `products` and `product_stock`. Stock for the
//! standard sizes is edited together with the product: an existing entry is
//! overwritten even when the new quantity is zero, while a missing entry is
//! only created for a positive quantity.

use sqlx::{PgPool, Postgres, Transaction};
use tracing::instrument;

use streetlab_core::{Money, ProductId, Size};

use super::RepositoryError;

/// Fields for a new product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDraft {
    pub slug: String,
    pub name: String,
    pub price: Money,
    pub description: Option<String>,
    pub category: Option<String>,
    /// Image file name.
    pub image: Option<String>,
    pub active: bool,
}

/// Editable fields of an existing product. The slug is fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductChanges {
    pub name: String,
    pub price: Money,
    pub description: Option<String>,
    pub category: Option<String>,
    /// New image file name; `None` keeps the current one.
    pub image: Option<String>,
    pub active: bool,
}

/// Requested units for one size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockInput {
    pub size: Size,
    pub quantity: u32,
}

/// Repository for product administration.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

fn conflict_on_unique(err: sqlx::Error, message: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(message.to_owned());
    }
    RepositoryError::Database(err)
}

fn quantity_param(quantity: u32) -> Result<i32, RepositoryError> {
    i32::try_from(quantity)
        .map_err(|_| RepositoryError::Conflict(format!("stock quantity {quantity} is too large")))
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a product and its initial stock.
    ///
    /// Sizes with zero units get no stock row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    #[instrument(skip(self, draft, stock), fields(slug = %draft.slug))]
    pub async fn create(
        &self,
        draft: &ProductDraft,
        stock: &[StockInput],
    ) -> Result<ProductId, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let id: ProductId = sqlx::query_scalar(
            r"
            INSERT INTO products (slug, name, price, description, category, image, active)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            ",
        )
        .bind(&draft.slug)
        .bind(&draft.name)
        .bind(draft.price)
        .bind(&draft.description)
        .bind(&draft.category)
        .bind(&draft.image)
        .bind(draft.active)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, "slug already exists"))?;

        for entry in stock.iter().filter(|entry| entry.quantity > 0) {
            sqlx::query("INSERT INTO product_stock (product_id, size, quantity) VALUES ($1, $2, $3)")
                .bind(id)
                .bind(&entry.size)
                .bind(quantity_param(entry.quantity)?)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        tracing::info!(product_id = %id, "Product created");
        Ok(id)
    }

    /// Update a product and overwrite its stock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    /// Returns `RepositoryError::Database` for other database errors.
    #[instrument(skip(self, changes, stock))]
    pub async fn update(
        &self,
        id: ProductId,
        changes: &ProductChanges,
        stock: &[StockInput],
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r"
            UPDATE products
            SET name = $1, price = $2, description = $3, category = $4,
                image = COALESCE($5, image), active = $6
            WHERE id = $7
            ",
        )
        .bind(&changes.name)
        .bind(changes.price)
        .bind(&changes.description)
        .bind(&changes.category)
        .bind(&changes.image)
        .bind(changes.active)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        for entry in stock {
            write_stock(&mut tx, id, entry).await?;
        }

        tx.commit().await?;
        tracing::info!(product_id = %id, "Product updated");
        Ok(())
    }

    /// Delete a product and its stock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    /// Returns `RepositoryError::Conflict` if orders reference the product.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.is_foreign_key_violation()
                {
                    return RepositoryError::Conflict("product has orders".to_owned());
                }
                RepositoryError::Database(e)
            })?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        tracing::info!(product_id = %id, "Product deleted");
        Ok(())
    }
}

/// Overwrite an existing stock row, or create one for a positive quantity.
async fn write_stock(
    tx: &mut Transaction<'_, Postgres>,
    id: ProductId,
    entry: &StockInput,
) -> Result<(), RepositoryError> {
    let quantity = quantity_param(entry.quantity)?;

    if entry.quantity > 0 {
        sqlx::query(
            r"
            INSERT INTO product_stock (product_id, size, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (product_id, size) DO UPDATE SET quantity = EXCLUDED.quantity
            ",
        )
        .bind(id)
        .bind(&entry.size)
        .bind(quantity)
        .execute(&mut **tx)
        .await?;
    } else {
        sqlx::query("UPDATE product_stock SET quantity = 0 WHERE product_id = $1 AND size = $2")
            .bind(id)
            .bind(&entry.size)
            .execute(&mut **tx)
            .await?;
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_quantity_param_bounds() {
        assert_eq!(quantity_param(40).unwrap(), 40);
        assert!(matches!(
            quantity_param(u32::MAX),
            Err(RepositoryError::Conflict(_))
        ));
    }

    #[test]
    fn test_conflict_on_unique_passes_other_errors_through() {
        let err = conflict_on_unique(sqlx::Error::RowNotFound, "slug already exists");
        assert!(matches!(err, RepositoryError::Database(_)));
    }
}
