//! Domain models for the storefront.
//!
//! - [`session`] - What is kept in the tower-sessions store
//! - [`user`] - Accounts
//! - [`order`] - Order read models for confirmation and the back-office

pub mod order;
pub mod session;
pub mod user;

pub use order::{DashboardCounts, OrderSummary, OrderSummaryLine};
pub use session::{CurrentUser, Flash, keys as session_keys};
pub use user::User;
