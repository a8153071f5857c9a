//! Session middleware configuration and typed session accessors.
//!
//! Sets up `PostgreSQL`-backed sessions using tower-sessions. The checkout
//! state and flash messages are stored as serialized values under the keys
//! in [`crate::models::session_keys`].

use sqlx::PgPool;
use tower_sessions::{Expiry, Session, SessionManagerLayer, session};
use tower_sessions_sqlx_store::PostgresStore;

use streetlab_core::CheckoutSession;

use crate::config::StorefrontConfig;
use crate::models::{Flash, session_keys};

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "streetlab_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Create the session layer with `PostgreSQL` store.
///
/// The `tower_sessions.session` table is created by the migrations, not here.
#[must_use]
pub fn create_session_layer(
    pool: &PgPool,
    config: &StorefrontConfig,
) -> SessionManagerLayer<PostgresStore> {
    let store = PostgresStore::new(pool.clone());

    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

// =============================================================================
// Checkout State
// =============================================================================

/// Read the visitor's checkout state, empty if none was stored yet.
///
/// # Errors
///
/// Returns an error if the session store fails or the stored value no longer
/// deserializes.
pub async fn load_checkout(session: &Session) -> Result<CheckoutSession, session::Error> {
    Ok(session
        .get::<CheckoutSession>(session_keys::CHECKOUT)
        .await?
        .unwrap_or_default())
}

/// Replace the visitor's checkout state.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn store_checkout(
    session: &Session,
    checkout: &CheckoutSession,
) -> Result<(), session::Error> {
    session.insert(session_keys::CHECKOUT, checkout).await
}

/// Units in the visitor's cart, for the cart badge.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn cart_count(session: &Session) -> Result<u32, session::Error> {
    Ok(load_checkout(session).await?.cart.item_count())
}

// =============================================================================
// Flash Messages
// =============================================================================

/// Queue a message for the next page view.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn push_flash(session: &Session, message: impl Into<String>) -> Result<(), session::Error> {
    let mut flash = session
        .get::<Flash>(session_keys::FLASH)
        .await?
        .unwrap_or_default();
    flash.push(message);
    session.insert(session_keys::FLASH, flash).await
}

/// Take all queued messages, leaving none behind.
///
/// The session is only written when there was something to take.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn take_flash(session: &Session) -> Result<Flash, session::Error> {
    let flash = session
        .get::<Flash>(session_keys::FLASH)
        .await?
        .unwrap_or_default();
    if !flash.is_empty() {
        session.remove_value(session_keys::FLASH).await?;
    }
    Ok(flash)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use streetlab_core::{Cart, CartLine, Money, ProductId, RegionCode, Size};
    use tower_sessions::MemoryStore;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn test_checkout_defaults_to_empty() {
        let session = session();
        let checkout = load_checkout(&session).await.unwrap();
        assert_eq!(checkout, CheckoutSession::default());
    }

    #[tokio::test]
    async fn test_checkout_round_trips_shipping() {
        let session = session();
        let mut checkout = CheckoutSession::default();
        checkout.apply_shipping(&RegionCode::parse("rj").unwrap());
        store_checkout(&session, &checkout).await.unwrap();

        let loaded = load_checkout(&session).await.unwrap();
        assert_eq!(loaded.shipping, Some(Money::from_cents(2900)));
    }

    #[tokio::test]
    async fn test_cart_count_sums_quantities() {
        let session = session();
        assert_eq!(cart_count(&session).await.unwrap(), 0);

        let line = |size: &str, quantity| CartLine {
            product_id: ProductId::new(7),
            name: "Box Tee".to_owned(),
            unit_price: Money::from_cents(8990),
            image: None,
            size: Size::parse(size).unwrap(),
            quantity,
        };
        let checkout = CheckoutSession {
            cart: Cart::from_lines(vec![line("M", 2), line("G", 1)]),
            ..CheckoutSession::default()
        };
        store_checkout(&session, &checkout).await.unwrap();

        assert_eq!(cart_count(&session).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_flash_is_taken_once() {
        let session = session();
        push_flash(&session, "Your cart is empty.").await.unwrap();
        push_flash(&session, "Select a size").await.unwrap();

        let flash = take_flash(&session).await.unwrap();
        assert_eq!(flash.messages(), ["Your cart is empty.", "Select a size"]);
        assert!(take_flash(&session).await.unwrap().is_empty());
    }
}
