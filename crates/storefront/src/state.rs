//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::db::{PgCatalogStore, PgOrderStore};
use crate::ports::{CatalogStore, OrderStore};
use crate::services::{CartReconciler, CheckoutService};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    catalog: Arc<dyn CatalogStore>,
    orders: Arc<dyn OrderStore>,
    admin_orders: PgOrderStore,
}

impl AppState {
    /// Create application state with Postgres-backed stores.
    #[must_use]
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Self {
        let catalog = Arc::new(PgCatalogStore::new(pool.clone()));
        let orders = Arc::new(PgOrderStore::new(pool.clone()));
        Self::with_stores(config, pool, catalog, orders)
    }

    /// Create application state with explicit catalog and order stores.
    ///
    /// Admin and account operations still go through `pool`.
    #[must_use]
    pub fn with_stores(
        config: StorefrontConfig,
        pool: PgPool,
        catalog: Arc<dyn CatalogStore>,
        orders: Arc<dyn OrderStore>,
    ) -> Self {
        let admin_orders = PgOrderStore::new(pool.clone());
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                catalog,
                orders,
                admin_orders,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Catalog reads.
    #[must_use]
    pub fn catalog(&self) -> &dyn CatalogStore {
        self.inner.catalog.as_ref()
    }

    /// Order persistence.
    #[must_use]
    pub fn orders(&self) -> &dyn OrderStore {
        self.inner.orders.as_ref()
    }

    /// Order status changes and dashboard counters.
    #[must_use]
    pub fn admin_orders(&self) -> &PgOrderStore {
        &self.inner.admin_orders
    }

    /// Cart reconciler over the catalog store.
    #[must_use]
    pub fn cart_reconciler(&self) -> CartReconciler<'_> {
        CartReconciler::new(self.catalog())
    }

    /// Checkout service over the catalog and order stores.
    #[must_use]
    pub fn checkout(&self) -> CheckoutService<'_> {
        CheckoutService::new(self.catalog(), self.orders())
    }
}
