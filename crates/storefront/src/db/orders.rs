//! `PostgreSQL` order persistence.
//!
//! [`PgOrderStore::commit_order`] is the only place stock is decremented.
//! Everything runs in one transaction:
//!
//! 1. Claim the order token with `INSERT ... ON CONFLICT (token) DO NOTHING`.
//!    If the token is taken the existing order id is returned as a replay.
//! 2. For each line, in `(product_id, size)` order, decrement stock with a
//!    conditional `UPDATE ... WHERE quantity >= $n`. The row lock and the
//!    comparison happen in one statement, so two buyers racing for the last
//!    unit cannot both succeed. Zero affected rows aborts with a stock
//!    conflict.
//! 3. Insert the order line at the purchase-time price.
//! 4. Commit.
//!
//! Any early return drops the transaction, which rolls it back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use streetlab_core::{
    Money, NewOrder, NewOrderLine, OrderId, OrderStatus, PaymentMethod, ProductId, Size,
};

use super::{RepositoryError, units};
use crate::models::{DashboardCounts, OrderSummary, OrderSummaryLine};
use crate::ports::{CommitError, CommitOutcome, OrderStore, StoreError};

/// [`OrderStore`] backed by the `orders` and `order_items` tables.
#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    created_at: DateTime<Utc>,
    customer_name: String,
    payment_method: PaymentMethod,
    status: OrderStatus,
    subtotal: Money,
    shipping: Money,
    total: Money,
}

#[derive(sqlx::FromRow)]
struct OrderLineRow {
    product_id: ProductId,
    name: String,
    size: Size,
    quantity: i32,
    unit_price: Money,
}

/// Map a database failure inside the commit transaction.
fn classify(err: sqlx::Error) -> CommitError {
    if let sqlx::Error::Database(ref db_err) = err
        && (db_err.is_unique_violation()
            || db_err.is_foreign_key_violation()
            || db_err.is_check_violation())
    {
        return CommitError::IntegrityConflict(db_err.message().to_owned());
    }
    CommitError::Storage(err.to_string())
}

/// Lines in lock order.
fn lock_order(lines: &[NewOrderLine]) -> Vec<&NewOrderLine> {
    let mut sorted: Vec<&NewOrderLine> = lines.iter().collect();
    sorted.sort_by(|a, b| (a.product_id, &a.size).cmp(&(b.product_id, &b.size)));
    sorted
}

impl PgOrderStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Change an order's status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no order has this id.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE orders SET status = $1 WHERE id = $2")
            .bind(status)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Product and order counters for the admin dashboard.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn dashboard_counts(&self) -> Result<DashboardCounts, RepositoryError> {
        let counts = sqlx::query_as::<_, DashboardCounts>(
            r"
            SELECT
                (SELECT COUNT(*) FROM products) AS total_products,
                (SELECT COUNT(*) FROM products WHERE active) AS active_products,
                (SELECT COUNT(*) FROM orders) AS total_orders,
                (SELECT COUNT(*) FROM orders WHERE status = 'pending') AS pending_orders
            ",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(counts)
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    #[instrument(skip(self, order), fields(token = %order.token, lines = order.lines.len()))]
    async fn commit_order(&self, order: &NewOrder) -> Result<CommitOutcome, CommitError> {
        let mut tx = self.pool.begin().await.map_err(classify)?;

        let inserted: Option<OrderId> = sqlx::query_scalar(
            r"
            INSERT INTO orders (
                token, customer_name, customer_email,
                address_line, address_city, address_state, address_zip,
                payment_method, subtotal, shipping, total
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (token) DO NOTHING
            RETURNING id
            ",
        )
        .bind(order.token.as_uuid())
        .bind(&order.customer.name)
        .bind(&order.customer.email)
        .bind(&order.customer.address_line)
        .bind(&order.customer.city)
        .bind(order.customer.region.as_str())
        .bind(&order.customer.zip)
        .bind(order.customer.payment_method)
        .bind(order.totals.subtotal)
        .bind(order.totals.shipping)
        .bind(order.totals.total)
        .fetch_optional(&mut *tx)
        .await
        .map_err(classify)?;

        let Some(order_id) = inserted else {
            let existing: OrderId = sqlx::query_scalar("SELECT id FROM orders WHERE token = $1")
                .bind(order.token.as_uuid())
                .fetch_one(&mut *tx)
                .await
                .map_err(classify)?;
            tracing::info!(order_id = %existing, "Order token already committed");
            return Ok(CommitOutcome::Replayed(existing));
        };

        for line in lock_order(&order.lines) {
            let quantity = i32::try_from(line.quantity).map_err(|_| {
                CommitError::IntegrityConflict(format!("quantity {} out of range", line.quantity))
            })?;

            let decremented = sqlx::query(
                r"
                UPDATE product_stock
                SET quantity = quantity - $1
                WHERE product_id = $2 AND size = $3 AND quantity >= $1
                ",
            )
            .bind(quantity)
            .bind(line.product_id)
            .bind(&line.size)
            .execute(&mut *tx)
            .await
            .map_err(classify)?;

            if decremented.rows_affected() == 0 {
                tracing::warn!(
                    product_id = %line.product_id,
                    size = %line.size,
                    requested = line.quantity,
                    "Stock conflict, rolling back order"
                );
                return Err(CommitError::StockConflict {
                    product_id: line.product_id,
                    name: line.name.clone(),
                    size: line.size.clone(),
                });
            }

            sqlx::query(
                r"
                INSERT INTO order_items (order_id, product_id, size, quantity, unit_price)
                VALUES ($1, $2, $3, $4, $5)
                ",
            )
            .bind(order_id)
            .bind(line.product_id)
            .bind(&line.size)
            .bind(quantity)
            .bind(line.unit_price)
            .execute(&mut *tx)
            .await
            .map_err(classify)?;
        }

        tx.commit().await.map_err(classify)?;

        tracing::info!(order_id = %order_id, total = %order.totals.total, "Order committed");
        Ok(CommitOutcome::Committed(order_id))
    }

    async fn order_summary(&self, id: OrderId) -> Result<Option<OrderSummary>, StoreError> {
        let Some(order) = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, created_at, customer_name, payment_method, status,
                   subtotal, shipping, total
            FROM orders
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?
        else {
            return Ok(None);
        };

        let rows = sqlx::query_as::<_, OrderLineRow>(
            r"
            SELECT oi.product_id, p.name, oi.size, oi.quantity, oi.unit_price
            FROM order_items oi
            JOIN products p ON p.id = oi.product_id
            WHERE oi.order_id = $1
            ORDER BY oi.id
            ",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        let lines = rows
            .into_iter()
            .map(|row| {
                Ok(OrderSummaryLine {
                    product_id: row.product_id,
                    name: row.name,
                    size: row.size,
                    quantity: units(row.quantity)?,
                    unit_price: row.unit_price,
                })
            })
            .collect::<Result<Vec<_>, RepositoryError>>()?;

        Ok(Some(OrderSummary {
            id: order.id,
            created_at: order.created_at,
            customer_name: order.customer_name,
            payment_method: order.payment_method,
            status: order.status,
            subtotal: order.subtotal,
            shipping: order.shipping,
            total: order.total,
            lines,
        }))
    }
}
