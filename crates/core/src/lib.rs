//! Streetlab Core - domain types and checkout rules.
//!
//! This crate holds everything about the storefront that can be decided
//! without I/O:
//! - `storefront` - HTTP server, persistence adapters and admin back-office
//! - `cli` - Command-line tools for migrations, seeding and admin accounts
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no database
//! access, no HTTP. Cart reconciliation works against a
//! [`CatalogSnapshot`] loaded by the caller, and shipping is a static table.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, money, emails, sizes and statuses
//! - [`cart`] - Session cart, its mutations and reconciliation
//! - [`shipping`] - Flat-rate shipping by region
//! - [`checkout`] - Checkout session state, form validation, order assembly

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod checkout;
pub mod shipping;
pub mod types;

pub use cart::{AddOutcome, Cart, CartLine, CatalogSnapshot, OutOfStock};
pub use checkout::{
    CheckoutAction, CheckoutForm, CheckoutSession, CustomerDetails, NewOrder, NewOrderLine,
    OrderToken, Totals, ValidationError,
};
pub use shipping::{ShippingZone, shipping_fee};
pub use types::*;
