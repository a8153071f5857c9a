//! Core value types for the storefront.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod money;
pub mod product;
pub mod region;
pub mod size;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use money::Money;
pub use product::{Product, StockLevel};
pub use region::{EmptyRegion, RegionCode};
pub use size::{EmptySize, Size};
pub use status::*;
