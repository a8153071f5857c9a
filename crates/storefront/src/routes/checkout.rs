//! Checkout and order confirmation handlers.
//!
//! The handlers only move the [`CheckoutSession`] in and out of the session
//! store; [`crate::services::CheckoutService`] decides everything else.

use axum::{
    Form, Json,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Serialize;
use tower_sessions::Session;
use tracing::instrument;

use streetlab_core::{CheckoutForm, CheckoutSession, Money, OrderId, PaymentMethod, Totals};

use super::cart::CartView;
use super::redirect_with_flash;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{RequireAuth, load_checkout, push_flash, store_checkout, take_flash};
use crate::models::OrderSummary;
use crate::services::{CheckoutError, CheckoutStep};
use crate::services::checkout::{CHECKOUT_PATH, SHOP_PATH};
use crate::state::AppState;

/// Checkout page data.
#[derive(Debug, Serialize)]
pub struct CheckoutView {
    pub cart: CartView,
    /// Fee for the region last calculated, if any.
    pub shipping: Option<Money>,
    pub totals: Totals,
    /// Whether the payment step is unlocked.
    pub payment_selectable: bool,
    pub payment_methods: [PaymentMethod; 3],
    pub messages: Vec<String>,
}

impl CheckoutView {
    fn new(session: &CheckoutSession, messages: Vec<String>) -> Self {
        Self {
            cart: CartView::from(&session.cart),
            shipping: session.shipping_fee(),
            totals: session.totals(),
            payment_selectable: session.payment_selectable(),
            payment_methods: PaymentMethod::ALL,
            messages,
        }
    }
}

/// Show the checkout page for the reconciled cart.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
) -> Result<Response> {
    let checkout = load_checkout(&session).await?;

    match state.checkout().prepare(checkout.clone()).await {
        Ok(prepared) => {
            if prepared != checkout {
                store_checkout(&session, &prepared).await?;
            }
            let messages = take_flash(&session).await?.into_messages();
            Ok(Json(CheckoutView::new(&prepared, messages)).into_response())
        }
        Err(CheckoutError::Storage(msg)) => Err(AppError::Internal(msg)),
        Err(err) => {
            let mut emptied = checkout;
            emptied.cart.clear();
            store_checkout(&session, &emptied).await?;
            Ok(redirect_with_flash(&session, SHOP_PATH, err.user_message())
                .await?
                .into_response())
        }
    }
}

/// Handle `calc_shipping` and `finish_order` posts.
#[instrument(skip(state, session, user, form), fields(user_id = %user.id, action = ?form.action))]
pub async fn submit(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Form(form): Form<CheckoutForm>,
) -> Result<Redirect> {
    let action = match form.action() {
        Ok(action) => action,
        Err(err) => return redirect_with_flash(&session, CHECKOUT_PATH, err.to_string()).await,
    };

    let checkout = load_checkout(&session).await?;
    let outcome = state.checkout().run(action, &form, checkout).await;

    store_checkout(&session, &outcome.session).await?;
    if let Some(message) = &outcome.message {
        push_flash(&session, message.as_str()).await?;
    }

    if let CheckoutStep::Completed { order_id, replayed } = outcome.step {
        add_breadcrumb(
            "checkout",
            "Order placed",
            &[("order_id", order_id.to_string()), ("replayed", replayed.to_string())],
        );
    }

    Ok(Redirect::to(&outcome.redirect))
}

/// Order confirmation.
#[instrument(skip(state, _user))]
pub async fn success(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Path(id): Path<i32>,
) -> Result<Json<OrderSummary>> {
    let id = OrderId::new(id);
    state
        .orders()
        .order_summary(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use streetlab_core::RegionCode;

    #[test]
    fn test_view_before_shipping() {
        let view = CheckoutView::new(&CheckoutSession::default(), Vec::new());
        assert!(!view.payment_selectable);
        assert_eq!(view.shipping, None);
        assert_eq!(view.totals.total, Money::ZERO);
    }

    #[test]
    fn test_view_after_shipping() {
        let mut session = CheckoutSession::default();
        session.apply_shipping(&RegionCode::parse("SP").unwrap());
        let view = CheckoutView::new(&session, vec!["hello".to_owned()]);
        assert!(view.payment_selectable);
        assert_eq!(view.shipping, Some(Money::from_cents(1500)));
        assert_eq!(view.totals.total, Money::from_cents(1500));
    }
}
