//! In-memory catalog and order store.
//!
//! Implements both [`CatalogStore`] and [`OrderStore`] over one mutex, so a
//! commit checks and decrements stock as a single critical section, the
//! same guarantee the conditional `UPDATE` gives in Postgres. Used by tests
//! and local demos that run without a database.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use streetlab_core::{
    CatalogSnapshot, NewOrder, OrderId, OrderStatus, OrderToken, Product, ProductId, Size,
    StockLevel,
};

use crate::models::{OrderSummary, OrderSummaryLine};
use crate::ports::{CatalogStore, CommitError, CommitOutcome, OrderStore, StoreError};

struct StoredOrder {
    order: NewOrder,
    status: OrderStatus,
    created_at: DateTime<Utc>,
}

#[derive(Default)]
struct Inner {
    products: BTreeMap<ProductId, Product>,
    stock: HashMap<(ProductId, Size), u32>,
    orders: BTreeMap<OrderId, StoredOrder>,
    tokens: HashMap<OrderToken, OrderId>,
    last_order_id: i32,
    fail_commits: bool,
}

impl Inner {
    fn available(&self, product_id: ProductId, size: &Size) -> u32 {
        self.stock
            .get(&(product_id, size.clone()))
            .copied()
            .unwrap_or(0)
    }

    /// First line whose (aggregated) request exceeds stock.
    fn shortage(&self, order: &NewOrder) -> Option<CommitError> {
        let mut requested: HashMap<(ProductId, &Size), u32> = HashMap::new();
        for line in &order.lines {
            let total = requested.entry((line.product_id, &line.size)).or_insert(0);
            *total = total.saturating_add(line.quantity);
            if *total > self.available(line.product_id, &line.size) {
                return Some(CommitError::StockConflict {
                    product_id: line.product_id,
                    name: line.name.clone(),
                    size: line.size.clone(),
                });
            }
        }
        None
    }
}

/// Catalog and orders held in process memory.
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a product.
    pub async fn insert_product(&self, product: Product) {
        self.inner.lock().await.products.insert(product.id, product);
    }

    /// Set the units on hand for a (product, size).
    pub async fn set_stock(&self, product_id: ProductId, size: Size, quantity: u32) {
        self.inner
            .lock()
            .await
            .stock
            .insert((product_id, size), quantity);
    }

    /// Number of committed orders.
    pub async fn order_count(&self) -> usize {
        self.inner.lock().await.orders.len()
    }

    /// Make every following commit fail with a storage error.
    pub async fn fail_commits(&self, fail: bool) {
        self.inner.lock().await.fail_commits = fail;
    }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn product_by_slug(&self, slug: &str) -> Result<Option<Product>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.products.values().find(|p| p.slug == slug).cloned())
    }

    async fn product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.inner.lock().await.products.get(&id).cloned())
    }

    async fn stock(&self, product_id: ProductId, size: &Size) -> Result<u32, StoreError> {
        Ok(self.inner.lock().await.available(product_id, size))
    }

    async fn stock_levels(&self, product_id: ProductId) -> Result<Vec<StockLevel>, StoreError> {
        let inner = self.inner.lock().await;
        let mut levels: Vec<StockLevel> = inner
            .stock
            .iter()
            .filter(|((id, _), _)| *id == product_id)
            .map(|((id, size), quantity)| StockLevel {
                product_id: *id,
                size: size.clone(),
                quantity: i32::try_from(*quantity).unwrap_or(i32::MAX),
            })
            .collect();
        levels.sort_by_key(|level| (level.size.display_rank(), level.size.clone()));
        Ok(levels)
    }

    async fn snapshot(&self, product_ids: &[ProductId]) -> Result<CatalogSnapshot, StoreError> {
        let inner = self.inner.lock().await;
        let mut snapshot = CatalogSnapshot::new();
        for id in product_ids {
            if let Some(product) = inner.products.get(id) {
                snapshot.insert_product(product.clone());
            }
        }
        for ((id, size), quantity) in &inner.stock {
            if product_ids.contains(id) {
                snapshot.set_stock(*id, size.clone(), *quantity);
            }
        }
        Ok(snapshot)
    }

    async fn featured(&self, limit: u32) -> Result<Vec<Product>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .products
            .values()
            .rev()
            .filter(|p| p.active)
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn active_products(&self, category: Option<&str>) -> Result<Vec<Product>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .products
            .values()
            .rev()
            .filter(|p| p.active)
            .filter(|p| category.is_none_or(|c| p.category.as_deref() == Some(c)))
            .cloned()
            .collect())
    }

    async fn categories(&self) -> Result<Vec<String>, StoreError> {
        let inner = self.inner.lock().await;
        let mut categories: Vec<String> = inner
            .products
            .values()
            .filter(|p| p.active)
            .filter_map(|p| p.category.clone())
            .filter(|c| !c.is_empty())
            .collect();
        categories.sort();
        categories.dedup();
        Ok(categories)
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn commit_order(&self, order: &NewOrder) -> Result<CommitOutcome, CommitError> {
        let mut inner = self.inner.lock().await;

        if inner.fail_commits {
            return Err(CommitError::Storage("store unavailable".to_owned()));
        }
        if let Some(existing) = inner.tokens.get(&order.token) {
            return Ok(CommitOutcome::Replayed(*existing));
        }
        if let Some(conflict) = inner.shortage(order) {
            return Err(conflict);
        }

        for line in &order.lines {
            if let Some(quantity) = inner.stock.get_mut(&(line.product_id, line.size.clone())) {
                *quantity -= line.quantity;
            }
        }

        inner.last_order_id += 1;
        let id = OrderId::new(inner.last_order_id);
        inner.tokens.insert(order.token, id);
        inner.orders.insert(
            id,
            StoredOrder {
                order: order.clone(),
                status: OrderStatus::Pending,
                created_at: Utc::now(),
            },
        );

        Ok(CommitOutcome::Committed(id))
    }

    async fn order_summary(&self, id: OrderId) -> Result<Option<OrderSummary>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.orders.get(&id).map(|stored| OrderSummary {
            id,
            created_at: stored.created_at,
            customer_name: stored.order.customer.name.clone(),
            payment_method: stored.order.customer.payment_method,
            status: stored.status,
            subtotal: stored.order.totals.subtotal,
            shipping: stored.order.totals.shipping,
            total: stored.order.totals.total,
            lines: stored
                .order
                .lines
                .iter()
                .map(|line| OrderSummaryLine {
                    product_id: line.product_id,
                    name: line.name.clone(),
                    size: line.size.clone(),
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                })
                .collect(),
        }))
    }
}
