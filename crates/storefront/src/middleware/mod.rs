//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Session layer (tower-sessions with `PostgreSQL` store)
//!
//! Authentication is enforced per handler by the [`RequireAuth`] and
//! [`RequireAdmin`] extractors rather than by a layer.

pub mod auth;
pub mod request_id;
pub mod session;

pub use auth::{
    OptionalAuth, RequireAdmin, RequireAuth, clear_current_user, local_path, login_redirect,
    set_current_user,
};
pub use request_id::request_id_middleware;
pub use session::{
    cart_count, create_session_layer, load_checkout, push_flash, store_checkout, take_flash,
};
