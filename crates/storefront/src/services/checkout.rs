//! Checkout orchestration.
//!
//! [`CheckoutService::run`] takes the visitor's [`CheckoutSession`] by value
//! and hands back the next one inside a [`CheckoutOutcome`], together with
//! where to send the browser and what to tell the customer. The route
//! handler only loads and stores the session; every decision is made here.
//!
//! The cart is always reconciled first, so totals are computed from live
//! prices and an emptied cart short-circuits to the shop.

use tracing::instrument;

use streetlab_core::{
    CheckoutAction, CheckoutForm, CheckoutSession, NewOrder, OrderId, ProductId, Size,
    ValidationError,
};

use super::cart::CartReconciler;
use crate::ports::{CatalogStore, CommitError, CommitOutcome, OrderStore, StoreError};

/// Where a redirect for the shop goes.
pub const SHOP_PATH: &str = "/shop";
/// Where a redirect back to checkout goes.
pub const CHECKOUT_PATH: &str = "/checkout";

/// Confirmation page for an order.
#[must_use]
pub fn order_success_path(id: OrderId) -> String {
    format!("/order/{id}/success")
}

/// Checkout failures. None of them are retried automatically; the customer
/// can resubmit after fixing the cause.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckoutError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Not enough stock for {name} in size {size}.")]
    StockConflict {
        product_id: ProductId,
        name: String,
        size: Size,
    },

    #[error("integrity conflict: {0}")]
    IntegrityConflict(String),

    #[error("storage failure: {0}")]
    Storage(String),
}

impl CheckoutError {
    /// Message safe to show the customer.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(_) | Self::StockConflict { .. } => self.to_string(),
            Self::IntegrityConflict(_) | Self::Storage(_) => {
                "We could not place your order. Please try again.".to_owned()
            }
        }
    }
}

impl From<CommitError> for CheckoutError {
    fn from(err: CommitError) -> Self {
        match err {
            CommitError::StockConflict {
                product_id,
                name,
                size,
            } => Self::StockConflict {
                product_id,
                name,
                size,
            },
            CommitError::IntegrityConflict(msg) => Self::IntegrityConflict(msg),
            CommitError::Storage(msg) => Self::Storage(msg),
        }
    }
}

impl From<StoreError> for CheckoutError {
    fn from(err: StoreError) -> Self {
        Self::Storage(err.to_string())
    }
}

/// Where the checkout stands after an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutStep {
    /// Shipping not calculated yet.
    AwaitingShipping,
    /// Shipping known; the customer can pick a payment method and finish.
    PaymentSelectable,
    /// The order exists. `replayed` is set when an earlier submission with
    /// the same token had already committed it.
    Completed { order_id: OrderId, replayed: bool },
}

impl CheckoutStep {
    fn of(session: &CheckoutSession) -> Self {
        if session.payment_selectable() {
            Self::PaymentSelectable
        } else {
            Self::AwaitingShipping
        }
    }
}

/// Result of one checkout action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutOutcome {
    /// The session to store for the next request.
    pub session: CheckoutSession,
    pub step: CheckoutStep,
    /// Path to redirect the browser to.
    pub redirect: String,
    /// Message for the customer, if any.
    pub message: Option<String>,
    /// The failure, when the action did not go through.
    pub error: Option<CheckoutError>,
}

impl CheckoutOutcome {
    fn failed(session: CheckoutSession, error: CheckoutError) -> Self {
        let redirect = if matches!(error, CheckoutError::Validation(ValidationError::EmptyCart)) {
            SHOP_PATH
        } else {
            CHECKOUT_PATH
        };
        Self {
            step: CheckoutStep::of(&session),
            session,
            redirect: redirect.to_owned(),
            message: Some(error.user_message()),
            error: Some(error),
        }
    }

    fn proceed(session: CheckoutSession) -> Self {
        Self {
            step: CheckoutStep::of(&session),
            session,
            redirect: CHECKOUT_PATH.to_owned(),
            message: None,
            error: None,
        }
    }
}

/// Runs checkout actions against the catalog and order stores.
pub struct CheckoutService<'a> {
    reconciler: CartReconciler<'a>,
    orders: &'a dyn OrderStore,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(catalog: &'a dyn CatalogStore, orders: &'a dyn OrderStore) -> Self {
        Self {
            reconciler: CartReconciler::new(catalog),
            orders,
        }
    }

    /// Reconcile the cart for display on the checkout page.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyCart` once reconciled if nothing is
    /// left, or `CheckoutError::Storage` if the catalog cannot be read.
    pub async fn prepare(
        &self,
        mut session: CheckoutSession,
    ) -> Result<CheckoutSession, CheckoutError> {
        session.cart = self.reconciler.reconcile(&session.cart).await?;
        if session.cart.is_empty() {
            return Err(ValidationError::EmptyCart.into());
        }
        Ok(session)
    }

    /// Apply one checkout action.
    ///
    /// Failures never leave partial state: the returned session carries the
    /// reconciled cart and whatever shipping and token it had before.
    #[instrument(skip(self, form, session), fields(lines = session.cart.lines().len()))]
    pub async fn run(
        &self,
        action: CheckoutAction,
        form: &CheckoutForm,
        session: CheckoutSession,
    ) -> CheckoutOutcome {
        let fallback = session.clone();
        let session = match self.prepare(session).await {
            Ok(session) => session,
            Err(CheckoutError::Storage(msg)) => {
                tracing::error!(error = %msg, "Cart reconciliation failed");
                return CheckoutOutcome::failed(fallback, CheckoutError::Storage(msg));
            }
            Err(err) => {
                let mut emptied = fallback;
                emptied.cart.clear();
                return CheckoutOutcome::failed(emptied, err);
            }
        };

        match action {
            CheckoutAction::CalcShipping => Self::calc_shipping(form, session),
            CheckoutAction::FinishOrder => self.finish_order(form, session).await,
        }
    }

    fn calc_shipping(form: &CheckoutForm, mut session: CheckoutSession) -> CheckoutOutcome {
        let region = match form.region() {
            Ok(region) => region,
            Err(err) => return CheckoutOutcome::failed(session, err.into()),
        };

        let fee = session.apply_shipping(&region);
        tracing::debug!(region = %region, fee = %fee, "Shipping calculated");
        CheckoutOutcome::proceed(session)
    }

    async fn finish_order(
        &self,
        form: &CheckoutForm,
        mut session: CheckoutSession,
    ) -> CheckoutOutcome {
        if !session.payment_selectable() {
            return CheckoutOutcome::failed(session, ValidationError::ShippingNotCalculated.into());
        }
        let customer = match form.customer_details() {
            Ok(customer) => customer,
            Err(err) => return CheckoutOutcome::failed(session, err.into()),
        };

        let token = session.token_or_generate();
        let order = match NewOrder::from_session(&session, customer, token) {
            Ok(order) => order,
            Err(err) => return CheckoutOutcome::failed(session, err.into()),
        };

        match self.orders.commit_order(&order).await {
            Ok(outcome) => {
                let order_id = outcome.order_id();
                let replayed = matches!(outcome, CommitOutcome::Replayed(_));
                tracing::info!(
                    order_id = %order_id,
                    replayed,
                    total = %order.totals.total,
                    "Checkout completed"
                );
                session.complete();
                CheckoutOutcome {
                    session,
                    step: CheckoutStep::Completed { order_id, replayed },
                    redirect: order_success_path(order_id),
                    message: None,
                    error: None,
                }
            }
            Err(err) => {
                let err = CheckoutError::from(err);
                match &err {
                    CheckoutError::StockConflict {
                        product_id, size, ..
                    } => {
                        tracing::warn!(product_id = %product_id, size = %size, "Checkout stock conflict");
                    }
                    other => tracing::error!(error = %other, "Order commit failed"),
                }
                CheckoutOutcome::failed(session, err)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::db::InMemoryStore;
    use streetlab_core::{Cart, CartLine, Money, OrderToken, Product};

    const TEE: ProductId = ProductId::new(7);

    fn size(code: &str) -> Size {
        Size::parse(code).unwrap()
    }

    async fn store(stock: u32) -> InMemoryStore {
        let store = InMemoryStore::new();
        store
            .insert_product(Product {
                id: TEE,
                slug: "box-tee".to_owned(),
                name: "Box Tee".to_owned(),
                price: Money::from_cents(8990),
                description: None,
                category: Some("tees".to_owned()),
                image: None,
                active: true,
            })
            .await;
        store.set_stock(TEE, size("M"), stock).await;
        store
    }

    fn session(quantity: u32) -> CheckoutSession {
        CheckoutSession {
            cart: Cart::from_lines(vec![CartLine {
                product_id: TEE,
                name: "Box Tee".to_owned(),
                unit_price: Money::from_cents(8990),
                image: None,
                size: size("M"),
                quantity,
            }]),
            shipping: None,
            order_token: None,
        }
    }

    fn form(action: &str) -> CheckoutForm {
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

    #[tokio::test]
    async fn test_calc_shipping_sets_fee() {
        let store = store(3).await;
        let service = CheckoutService::new(&store, &store);

        let outcome = service
            .run(CheckoutAction::CalcShipping, &form("calc_shipping"), session(2))
            .await;

        assert_eq!(outcome.step, CheckoutStep::PaymentSelectable);
        assert_eq!(outcome.session.shipping, Some(Money::from_cents(1500)));
        assert_eq!(outcome.session.totals().total, Money::from_cents(19480));
        assert_eq!(outcome.redirect, CHECKOUT_PATH);
    }

    #[tokio::test]
    async fn test_calc_shipping_requires_region() {
        let store = store(3).await;
        let service = CheckoutService::new(&store, &store);
        let blank = CheckoutForm {
            address_state: Some(" ".to_owned()),
            ..form("calc_shipping")
        };

        let outcome = service
            .run(CheckoutAction::CalcShipping, &blank, session(1))
            .await;

        assert_eq!(
            outcome.error,
            Some(CheckoutError::Validation(ValidationError::MissingRegion))
        );
        assert_eq!(outcome.session, session(1));
    }

    #[tokio::test]
    async fn test_finish_without_shipping_does_nothing() {
        let store = store(3).await;
        let service = CheckoutService::new(&store, &store);

        let outcome = service
            .run(CheckoutAction::FinishOrder, &form("finish_order"), session(1))
            .await;

        assert_eq!(
            outcome.error,
            Some(CheckoutError::Validation(
                ValidationError::ShippingNotCalculated
            ))
        );
        assert_eq!(outcome.session, session(1));
        assert_eq!(store.order_count().await, 0);
        assert_eq!(store.stock(TEE, &size("M")).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_finish_order_commits_and_clears_session() {
        let store = store(3).await;
        let service = CheckoutService::new(&store, &store);
        let mut ready = session(2);
        ready.shipping = Some(Money::from_cents(1500));

        let outcome = service
            .run(CheckoutAction::FinishOrder, &form("finish_order"), ready)
            .await;

        let CheckoutStep::Completed { order_id, replayed } = outcome.step else {
            panic!("expected completion, got {:?}", outcome.error);
        };
        assert!(!replayed);
        assert_eq!(outcome.redirect, format!("/order/{order_id}/success"));
        assert_eq!(outcome.session, CheckoutSession::default());
        assert_eq!(store.stock(TEE, &size("M")).await.unwrap(), 1);

        let summary = store.order_summary(order_id).await.unwrap().unwrap();
        assert_eq!(summary.subtotal, Money::from_cents(17980));
        assert_eq!(summary.total, Money::from_cents(19480));
    }

    #[test]
    fn test_stock_conflict_message_names_product_and_size() {
        let err = CheckoutError::from(CommitError::StockConflict {
            product_id: TEE,
            name: "Box Tee".to_owned(),
            size: size("M"),
        });
        assert_eq!(err.user_message(), "Not enough stock for Box Tee in size M.");

        let err = CheckoutError::from(CommitError::IntegrityConflict("dup".to_owned()));
        assert!(!err.user_message().contains("dup"));
    }

    #[tokio::test]
    async fn test_storage_failure_is_generic_and_retains_token() {
        let store = store(3).await;
        store.fail_commits(true).await;
        let service = CheckoutService::new(&store, &store);
        let mut ready = session(1);
        ready.shipping = Some(Money::from_cents(1500));

        let outcome = service
            .run(CheckoutAction::FinishOrder, &form("finish_order"), ready.clone())
            .await;

        assert!(matches!(outcome.error, Some(CheckoutError::Storage(_))));
        assert_eq!(
            outcome.message.as_deref(),
            Some("We could not place your order. Please try again.")
        );
        assert_eq!(outcome.session.cart, ready.cart);
        assert_eq!(outcome.session.shipping, ready.shipping);
        assert!(outcome.session.order_token.is_some());
        assert_eq!(outcome.redirect, CHECKOUT_PATH);
    }

    #[tokio::test]
    async fn test_retry_with_same_token_replays() {
        let store = store(3).await;
        let service = CheckoutService::new(&store, &store);
        let mut ready = session(1);
        ready.shipping = Some(Money::from_cents(1500));
        ready.order_token = Some(OrderToken::generate());

        let first = service
            .run(CheckoutAction::FinishOrder, &form("finish_order"), ready.clone())
            .await;
        let second = service
            .run(CheckoutAction::FinishOrder, &form("finish_order"), ready)
            .await;

        let CheckoutStep::Completed { order_id, .. } = first.step else {
            panic!("first submission failed: {:?}", first.error);
        };
        assert_eq!(
            second.step,
            CheckoutStep::Completed {
                order_id,
                replayed: true
            }
        );
        assert_eq!(store.order_count().await, 1);
        assert_eq!(store.stock(TEE, &size("M")).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_empty_cart_redirects_to_shop() {
        let store = store(0).await;
        let service = CheckoutService::new(&store, &store);

        let outcome = service
            .run(CheckoutAction::CalcShipping, &form("calc_shipping"), session(1))
            .await;

        assert_eq!(outcome.redirect, SHOP_PATH);
        assert_eq!(outcome.message.as_deref(), Some("Your cart is empty."));
        assert!(outcome.session.cart.is_empty());
    }
}
