//! Guindaste Core - Shared domain types for crane quoting.
//!
//! This crate provides the types shared by every component of the quoting
//! layer:
//! - `quoting` - Catalog cache, region pricing, cart consistency, login throttling
//! - `cli` - Operator tools for inspecting the catalog and repricing carts
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no clocks.
//! This keeps it lightweight and lets it be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, money, pricing regions, catalog and cart records

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
