//! Core types for the quoting layer.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod catalog;
pub mod email;
pub mod id;
pub mod price;
pub mod region;

pub use cart::{CartItem, ItemKind};
pub use catalog::CatalogItem;
pub use email::{Email, EmailError};
pub use id::*;
pub use price::Money;
pub use region::{PricingRegion, RegionParseError};
