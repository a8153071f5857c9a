//! HTTP route handlers for the storefront.
//!
//! Pages answer with JSON view models; form posts answer with redirects and
//! leave user-facing messages in the session flash.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                           - Featured products
//! GET  /shop?category=             - Active products
//! GET  /product/{slug}             - Product detail with stock per size
//!
//! # Auth
//! GET  /register, POST /register   - Create account
//! GET  /login, POST /login         - Password login (honours ?next=)
//! GET  /logout                     - End session
//!
//! # Cart (login required)
//! GET  /cart                       - Reconciled cart
//! POST /cart/add/{slug}            - Add one unit of `size`
//! POST /cart/increase/{index}      - One more unit
//! POST /cart/decrease/{index}      - One less unit
//! POST /cart/remove/{index}        - Drop line
//!
//! # Checkout (login required)
//! GET  /checkout                   - Checkout view
//! POST /checkout                   - action=calc_shipping | finish_order
//! GET  /order/{id}/success         - Order confirmation
//!
//! # Admin (admin role required)
//! GET  /admin                      - Dashboard counters
//! POST /admin/products             - Create product
//! POST /admin/products/{id}        - Update product and stock
//! POST /admin/products/{id}/delete - Delete product
//! POST /admin/orders/{id}/status   - Change order status
//! ```

pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;

use axum::{
    Router,
    response::Redirect,
    routing::{get, post},
};
use tower_sessions::Session;

use crate::error::Result;
use crate::middleware::push_flash;
use crate::state::AppState;

/// Queue `message` for the next page and redirect to `to`.
pub(crate) async fn redirect_with_flash(
    session: &Session,
    to: &str,
    message: impl Into<String>,
) -> Result<Redirect> {
    push_flash(session, message).await?;
    Ok(Redirect::to(to))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", get(auth::logout))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add/{slug}", post(cart::add))
        .route("/increase/{index}", post(cart::increase))
        .route("/decrease/{index}", post(cart::decrease))
        .route("/remove/{index}", post(cart::remove))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(admin::dashboard))
        .route("/products", post(admin::create_product))
        .route("/products/{id}", post(admin::update_product))
        .route("/products/{id}/delete", post(admin::delete_product))
        .route("/orders/{id}/status", post(admin::update_order_status))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(catalog::home))
        .route("/shop", get(catalog::shop))
        .route("/product/{slug}", get(catalog::product))
        .merge(auth_routes())
        .nest("/cart", cart_routes())
        .route("/checkout", get(checkout::show).post(checkout::submit))
        .route("/order/{id}/success", get(checkout::success))
        .nest("/admin", admin_routes())
}
