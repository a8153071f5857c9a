//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Password accounts (argon2)
//! - `cart` - Cart reconciliation and mutations against the catalog
//! - `checkout` - Shipping, validation and transactional order commit

pub mod auth;
pub mod cart;
pub mod checkout;

pub use auth::{AuthError, AuthService};
pub use cart::{CartError, CartReconciler};
pub use checkout::{CheckoutError, CheckoutOutcome, CheckoutService, CheckoutStep};
