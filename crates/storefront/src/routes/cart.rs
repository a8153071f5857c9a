//! Cart route handlers.
//!
//! The cart lives in the session's checkout state. Every view reconciles it
//! against the catalog first and stores the cleaned cart back.

use axum::{
    Form, Json,
    extract::{Path, State},
    response::Redirect,
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use streetlab_core::{AddOutcome, Cart, Money, ProductId, Size};

use super::redirect_with_flash;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{RequireAuth, load_checkout, store_checkout, take_flash};
use crate::services::CartError;
use crate::state::AppState;

const CART_PATH: &str = "/cart";

// =============================================================================
// Views
// =============================================================================

/// One cart line as displayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLineView {
    /// Position used by the increase/decrease/remove actions.
    pub index: usize,
    pub product_id: ProductId,
    pub name: String,
    pub image: Option<String>,
    pub size: Size,
    pub quantity: u32,
    pub unit_price: Money,
    pub line_total: Money,
}

/// Cart page data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub item_count: u32,
    pub subtotal: Money,
    pub messages: Vec<String>,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            lines: cart
                .lines()
                .iter()
                .enumerate()
                .map(|(index, line)| CartLineView {
                    index,
                    product_id: line.product_id,
                    name: line.name.clone(),
                    image: line.image.clone(),
                    size: line.size.clone(),
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                    line_total: line.line_total(),
                })
                .collect(),
            item_count: cart.item_count(),
            subtotal: cart.subtotal(),
            messages: Vec::new(),
        }
    }
}

/// Add-to-cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub size: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Show the reconciled cart.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
) -> Result<Json<CartView>> {
    let mut checkout = load_checkout(&session).await?;
    let cleaned = state.cart_reconciler().reconcile(&checkout.cart).await?;
    if cleaned != checkout.cart {
        checkout.cart = cleaned;
        store_checkout(&session, &checkout).await?;
    }

    let mut view = CartView::from(&checkout.cart);
    view.messages = take_flash(&session).await?.into_messages();
    Ok(Json(view))
}

/// Add one unit of a product in the posted size.
#[instrument(skip(state, session, user, form), fields(user_id = %user.id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Path(slug): Path<String>,
    Form(form): Form<AddToCartForm>,
) -> Result<Redirect> {
    let product_path = format!("/product/{slug}");
    let mut checkout = load_checkout(&session).await?;

    let outcome = state
        .cart_reconciler()
        .add(&mut checkout.cart, &slug, form.size.as_deref())
        .await;

    match outcome {
        Ok(outcome) => {
            if outcome != AddOutcome::AtStockLimit {
                store_checkout(&session, &checkout).await?;
            }
            add_breadcrumb(
                "cart",
                "Added to cart",
                &[("slug", slug), ("items", checkout.cart.item_count().to_string())],
            );
            redirect_with_flash(&session, &product_path, "Product added to cart").await
        }
        Err(CartError::ProductNotFound) => Ok(Redirect::to("/shop")),
        Err(CartError::Store(err)) => Err(AppError::Store(err)),
        Err(err @ (CartError::MissingSize | CartError::OutOfStock(_))) => {
            redirect_with_flash(&session, &product_path, err.to_string()).await
        }
    }
}

/// One more unit of the line at `index`, if stock allows.
#[instrument(skip(state, session, _user))]
pub async fn increase(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    session: Session,
    Path(index): Path<usize>,
) -> Result<Redirect> {
    let mut checkout = load_checkout(&session).await?;
    if state
        .cart_reconciler()
        .increase(&mut checkout.cart, index)
        .await?
    {
        store_checkout(&session, &checkout).await?;
    }
    Ok(Redirect::to(CART_PATH))
}

/// One less unit of the line at `index`; the line goes away at zero.
#[instrument(skip(session, _user))]
pub async fn decrease(
    RequireAuth(_user): RequireAuth,
    session: Session,
    Path(index): Path<usize>,
) -> Result<Redirect> {
    let mut checkout = load_checkout(&session).await?;
    if checkout.cart.decrease(index) {
        store_checkout(&session, &checkout).await?;
    }
    Ok(Redirect::to(CART_PATH))
}

/// Drop the line at `index`.
#[instrument(skip(session, _user))]
pub async fn remove(
    RequireAuth(_user): RequireAuth,
    session: Session,
    Path(index): Path<usize>,
) -> Result<Redirect> {
    let mut checkout = load_checkout(&session).await?;
    if checkout.cart.remove(index).is_some() {
        store_checkout(&session, &checkout).await?;
    }
    Ok(Redirect::to(CART_PATH))
}
