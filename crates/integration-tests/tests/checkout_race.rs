//! Two customers buying the last unit at the same time.
//!
//! Stock is 1 for product 7 in size M. Exactly one checkout may commit; the
//! other must fail without touching stock, which never goes negative.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;

use streetlab_core::{Cart, CheckoutAction, NewOrder, OrderToken, ProductId};
use streetlab_integration_tests::{
    add_units, checkout_form, ready_session, size, store_with, tee, test_database_url,
};
use streetlab_storefront::db::InMemoryStore;
use streetlab_storefront::ports::{CatalogStore, CommitError, CommitOutcome, OrderStore};
use streetlab_storefront::services::{CheckoutError, CheckoutService, CheckoutStep};

const LAST_UNIT_PRODUCT: i32 = 7;

fn order_for(cart: &Cart) -> NewOrder {
    let customer = checkout_form("finish_order").customer_details().unwrap();
    NewOrder::from_session(&ready_session(cart.clone()), customer, OrderToken::generate()).unwrap()
}

async fn last_unit_store() -> (Arc<InMemoryStore>, Cart) {
    let store = store_with(tee(LAST_UNIT_PRODUCT, 8990), &[("M", 1)]).await;
    let mut cart = Cart::new();
    add_units(&store, &mut cart, "tee-7", "M", 1).await;
    (Arc::new(store), cart)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_commits_sell_last_unit_once() {
    let (store, cart) = last_unit_store().await;

    let attempts: Vec<_> = (0..2)
        .map(|_| {
            let store = Arc::clone(&store);
            let order = order_for(&cart);
            tokio::spawn(async move { store.commit_order(&order).await })
        })
        .collect();

    let mut results = Vec::new();
    for attempt in attempts {
        results.push(attempt.await.unwrap());
    }

    let committed = results
        .iter()
        .filter(|r| matches!(r, Ok(CommitOutcome::Committed(_))))
        .count();
    let conflicts: Vec<_> = results
        .iter()
        .filter_map(|r| match r {
            Err(CommitError::StockConflict { product_id, size, .. }) => Some((*product_id, size.clone())),
            _ => None,
        })
        .collect();

    assert_eq!(committed, 1);
    assert_eq!(conflicts, [(ProductId::new(LAST_UNIT_PRODUCT), size("M"))]);
    assert_eq!(
        store
            .stock(ProductId::new(LAST_UNIT_PRODUCT), &size("M"))
            .await
            .unwrap(),
        0
    );
    assert_eq!(store.order_count().await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_checkouts_complete_once() {
    let (store, cart) = last_unit_store().await;

    let attempts: Vec<_> = (0..2)
        .map(|_| {
            let store = Arc::clone(&store);
            let session = ready_session(cart.clone());
            tokio::spawn(async move {
                CheckoutService::new(store.as_ref(), store.as_ref())
                    .run(
                        CheckoutAction::FinishOrder,
                        &checkout_form("finish_order"),
                        session,
                    )
                    .await
            })
        })
        .collect();

    let mut outcomes = Vec::new();
    for attempt in attempts {
        outcomes.push(attempt.await.unwrap());
    }

    let completed = outcomes
        .iter()
        .filter(|o| matches!(o.step, CheckoutStep::Completed { replayed: false, .. }))
        .count();
    assert_eq!(completed, 1);

    // The loser either lost the commit race or saw the sold-out size while
    // reconciling; both leave it without an order.
    let loser = outcomes
        .iter()
        .find(|o| o.error.is_some())
        .unwrap();
    assert!(matches!(
        loser.error,
        Some(CheckoutError::StockConflict { .. } | CheckoutError::Validation(_))
    ));
    assert_eq!(
        store
            .stock(ProductId::new(LAST_UNIT_PRODUCT), &size("M"))
            .await
            .unwrap(),
        0
    );
}

mod postgres {
    use super::*;
    use sqlx::PgPool;
    use streetlab_core::{CartLine, Money, Size};
    use streetlab_storefront::db::products::{ProductDraft, StockInput};
    use streetlab_storefront::db::{PgOrderStore, ProductRepository};
    use uuid::Uuid;

    async fn pool() -> PgPool {
        let pool = PgPool::connect(&test_database_url()).await.unwrap();
        sqlx::migrate!("../storefront/migrations")
            .run(&pool)
            .await
            .unwrap();
        pool
    }

    async fn last_unit_product(pool: &PgPool) -> (ProductId, Cart) {
        let slug = format!("race-{}", Uuid::new_v4());
        let draft = ProductDraft {
            slug,
            name: "Race Tee".to_owned(),
            price: Money::from_cents(8990),
            description: None,
            category: None,
            image: None,
            active: true,
        };
        let stock = [StockInput {
            size: Size::parse("M").unwrap(),
            quantity: 1,
        }];
        let id = ProductRepository::new(pool)
            .create(&draft, &stock)
            .await
            .unwrap();

        let cart = Cart::from_lines(vec![CartLine {
            product_id: id,
            name: draft.name,
            unit_price: draft.price,
            image: None,
            size: Size::parse("M").unwrap(),
            quantity: 1,
        }]);
        (id, cart)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    #[ignore = "Requires running PostgreSQL database"]
    async fn test_conditional_decrement_sells_last_unit_once() {
        let pool = pool().await;
        let (product_id, cart) = last_unit_product(&pool).await;
        let store = Arc::new(PgOrderStore::new(pool.clone()));

        let attempts: Vec<_> = (0..2)
            .map(|_| {
                let store = Arc::clone(&store);
                let order = order_for(&cart);
                tokio::spawn(async move { store.commit_order(&order).await })
            })
            .collect();

        let mut results = Vec::new();
        for attempt in attempts {
            results.push(attempt.await.unwrap());
        }

        assert_eq!(
            results
                .iter()
                .filter(|r| matches!(r, Ok(CommitOutcome::Committed(_))))
                .count(),
            1
        );
        assert!(
            results
                .iter()
                .any(|r| matches!(r, Err(CommitError::StockConflict { .. })))
        );

        let remaining: i32 = sqlx::query_scalar(
            "SELECT quantity FROM product_stock WHERE product_id = $1 AND size = 'M'",
        )
        .bind(product_id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(remaining, 0);
    }

    #[tokio::test]
    #[ignore = "Requires running PostgreSQL database"]
    async fn test_replayed_token_does_not_decrement_twice() {
        let pool = pool().await;
        let (product_id, cart) = last_unit_product(&pool).await;
        let store = PgOrderStore::new(pool.clone());
        let order = order_for(&cart);

        let first = store.commit_order(&order).await.unwrap();
        let second = store.commit_order(&order).await.unwrap();

        assert!(matches!(first, CommitOutcome::Committed(_)));
        assert_eq!(second, CommitOutcome::Replayed(first.order_id()));

        let summary = store.order_summary(first.order_id()).await.unwrap().unwrap();
        assert_eq!(summary.lines.len(), 1);
        assert_eq!(summary.lines[0].product_id, product_id);
    }
}
