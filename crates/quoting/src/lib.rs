//! Guindaste quoting layer.
//!
//! Client-side caching and regional-pricing consistency for crane quotes:
//!
//! - [`cache`] - in-memory TTL cache with background sweeping
//! - [`rate_limit`] - sliding-window login limiter, wrapped by [`auth`]
//! - [`catalog`] - cached catalog with capacity and model indexes
//! - [`region`] - vendor region label normalization
//! - [`cart`] - cart state with atomic regional repricing
//!
//! Components are plain values; construct them once and share them (usually
//! behind `Arc`) with whatever drives the quote flow.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod auth;
pub mod cache;
pub mod cart;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod error;
pub mod rate_limit;
pub mod region;
pub mod store;

pub use error::QuotingError;
