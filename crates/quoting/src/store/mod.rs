//! Backing store access.
//!
//! The quoting layer never talks to the record store directly; it goes
//! through two narrow traits so the optimizer and the cart can be exercised
//! against in-memory fakes:
//!
//! - [`CatalogSource`] - bulk catalog fetch
//! - [`PriceLookup`] - one price per `(equipment, region)` pair
//!
//! [`RestStore`] implements both over a PostgREST-style HTTP API.

mod rest;

pub use rest::RestStore;

use guindaste_core::{CatalogItem, EquipmentId, Money, PricingRegion};
use thiserror::Error;

/// Errors that can occur when talking to the backing store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The store answered with a non-success status.
    #[error("store returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// First part of the response body.
        body: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A request URL could not be built.
    #[error("invalid store URL: {0}")]
    Url(#[from] url::ParseError),

    /// Rate limited by the store.
    #[error("rate limited, retry after {0} seconds")]
    RateLimited(u64),
}

/// One page of a catalog fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogPage {
    /// Records on this page.
    pub data: Vec<CatalogItem>,
    /// Total records matching the query, across all pages.
    pub count: usize,
}

/// Source of equipment catalog records.
#[trait_variant::make(CatalogSource: Send)]
pub trait LocalCatalogSource {
    /// Fetch one page of the catalog.
    ///
    /// `page` is 1-based. With `no_pagination` the store returns every
    /// record in one response and `page`/`page_size` are ignored.
    async fn fetch_catalog(
        &self,
        page: u32,
        page_size: u32,
        no_pagination: bool,
    ) -> Result<CatalogPage, StoreError>;
}

/// Regional price table.
#[trait_variant::make(PriceLookup: Send)]
pub trait LocalPriceLookup {
    /// The price of one crane in one region, or `None` if the table has no row.
    async fn price_for(
        &self,
        equipment: EquipmentId,
        region: PricingRegion,
    ) -> Result<Option<Money>, StoreError>;
}
