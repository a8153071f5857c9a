//! Shared fixtures for Streetlab integration tests.
//!
//! # Running Tests
//!
//! ```bash
//! # In-memory scenarios
//! cargo test -p streetlab-integration-tests
//!
//! # Including the Postgres race test
//! STREETLAB_TEST_DATABASE_URL=postgres://localhost/streetlab_test \
//!     cargo test -p streetlab-integration-tests -- --include-ignored
//! ```
//!
//! # Test Categories
//!
//! - `cart_reconciliation` - Cart cleanup against changing catalog state
//! - `checkout_flow` - Shipping, commit, failure and replay behaviour
//! - `checkout_race` - Concurrent last-unit purchases
//! - `http_routes` - Router wiring, auth redirects, JSON pages

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::sync::Arc;

use secrecy::SecretString;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use streetlab_core::{Cart, CheckoutForm, CheckoutSession, Money, Product, ProductId, Size};
use streetlab_storefront::config::StorefrontConfig;
use streetlab_storefront::db::InMemoryStore;
use streetlab_storefront::services::CartReconciler;
use streetlab_storefront::state::AppState;

/// An active tee priced in cents.
#[must_use]
pub fn tee(id: i32, cents: i64) -> Product {
    Product {
        id: ProductId::new(id),
        slug: format!("tee-{id}"),
        name: format!("Tee {id}"),
        price: Money::from_cents(cents),
        description: None,
        category: Some("camisetas".to_owned()),
        image: Some(format!("tee-{id}.jpg")),
        active: true,
    }
}

#[must_use]
pub fn size(code: &str) -> Size {
    Size::parse(code).unwrap()
}

/// Store holding `product` with the given units per size.
pub async fn store_with(product: Product, stock: &[(&str, u32)]) -> InMemoryStore {
    let store = InMemoryStore::new();
    let id = product.id;
    store.insert_product(product).await;
    for (code, quantity) in stock {
        store.set_stock(id, size(code), *quantity).await;
    }
    store
}

/// Add `quantity` units through the reconciler, as the cart page would.
pub async fn add_units(store: &InMemoryStore, cart: &mut Cart, slug: &str, code: &str, quantity: u32) {
    let reconciler = CartReconciler::new(store);
    for _ in 0..quantity {
        reconciler.add(cart, slug, Some(code)).await.unwrap();
    }
}

/// Checkout session for `cart` with shipping already calculated for SP.
#[must_use]
pub fn ready_session(cart: Cart) -> CheckoutSession {
    CheckoutSession {
        cart,
        shipping: Some(Money::from_cents(1500)),
        order_token: None,
    }
}

/// A complete checkout form for `action`.
#[must_use]
pub fn checkout_form(action: &str) -> CheckoutForm {
    CheckoutForm {
        action: Some(action.to_owned()),
        customer_name: Some("Ana Souza".to_owned()),
        customer_email: Some("ana@example.com".to_owned()),
        address_line: Some("Rua Augusta, 100".to_owned()),
        address_city: Some("São Paulo".to_owned()),
        address_state: Some("SP".to_owned()),
        address_zip: Some("01304-000".to_owned()),
        payment_method: Some("pix".to_owned()),
    }
}

/// Configuration for a plain-HTTP local server.
#[must_use]
pub fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from(test_database_url()),
        host: "127.0.0.1".parse().unwrap(),
        port: 3000,
        base_url: "http://localhost:3000".to_owned(),
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// `STREETLAB_TEST_DATABASE_URL`, or a local default.
#[must_use]
pub fn test_database_url() -> String {
    std::env::var("STREETLAB_TEST_DATABASE_URL")
        .unwrap_or_else(|_| "postgres://localhost/streetlab_test".to_owned())
}

/// A pool that never connects until a query runs.
#[must_use]
pub fn lazy_pool() -> PgPool {
    PgPoolOptions::new()
        .connect_lazy(&test_database_url())
        .unwrap()
}

/// App state whose catalog and orders live in `store`.
#[must_use]
pub fn memory_state(store: Arc<InMemoryStore>) -> AppState {
    AppState::with_stores(test_config(), lazy_pool(), store.clone(), store)
}
