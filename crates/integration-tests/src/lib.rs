//! Shared fixtures for the cross-component tests under `tests/`.
//!
//! [`InMemoryStore`] stands in for the backing store: it serves a catalog
//! and a regional price table, counts requests, and can be told to fail.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p guindaste-integration-tests
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, TimeZone, Utc};
use guindaste_core::{CatalogItem, EquipmentId, Money, PricingRegion};
use guindaste_quoting::clock::ManualClock;
use guindaste_quoting::store::{CatalogPage, CatalogSource, PriceLookup, StoreError};

/// Backing store held in memory.
///
/// Cheap to clone; clones share the same tables and counters.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<StoreState>,
}

#[derive(Debug, Default)]
struct StoreState {
    catalog: Mutex<Vec<CatalogItem>>,
    prices: Mutex<HashMap<(EquipmentId, PricingRegion), Money>>,
    failing_prices: Mutex<HashSet<EquipmentId>>,
    catalog_down: AtomicBool,
    catalog_requests: AtomicUsize,
    price_requests: AtomicUsize,
}

impl InMemoryStore {
    /// A store whose catalog holds `names`, with ids starting at 1.
    #[must_use]
    pub fn with_catalog(names: &[&str]) -> Self {
        let store = Self::default();
        {
            let mut catalog = store.inner.catalog.lock().unwrap_or_else(PoisonError::into_inner);
            for (name, id) in names.iter().zip(1..) {
                catalog.push(CatalogItem::new(EquipmentId::new(id), *name));
            }
        }
        store
    }

    pub fn set_price(&self, id: i32, region: PricingRegion, centavos: i64) {
        self.inner
            .prices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((EquipmentId::new(id), region), Money::from_centavos(centavos));
    }

    /// Make price lookups for `id` fail.
    pub fn fail_price(&self, id: i32) {
        self.inner
            .failing_prices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(EquipmentId::new(id));
    }

    pub fn set_catalog_down(&self, down: bool) {
        self.inner.catalog_down.store(down, Ordering::SeqCst);
    }

    #[must_use]
    pub fn catalog_requests(&self) -> usize {
        self.inner.catalog_requests.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn price_requests(&self) -> usize {
        self.inner.price_requests.load(Ordering::SeqCst)
    }
}

fn unavailable() -> StoreError {
    StoreError::Status {
        status: 503,
        body: "service unavailable".to_string(),
    }
}

impl CatalogSource for InMemoryStore {
    async fn fetch_catalog(
        &self,
        page: u32,
        page_size: u32,
        no_pagination: bool,
    ) -> Result<CatalogPage, StoreError> {
        self.inner.catalog_requests.fetch_add(1, Ordering::SeqCst);
        if self.inner.catalog_down.load(Ordering::SeqCst) {
            return Err(unavailable());
        }

        let catalog = self.inner.catalog.lock().unwrap_or_else(PoisonError::into_inner).clone();
        let count = catalog.len();
        if no_pagination {
            return Ok(CatalogPage { data: catalog, count });
        }
        let skip = usize::try_from(page.saturating_sub(1) * page_size).unwrap_or(usize::MAX);
        let take = usize::try_from(page_size).unwrap_or(usize::MAX);
        Ok(CatalogPage {
            data: catalog.into_iter().skip(skip).take(take).collect(),
            count,
        })
    }
}

impl PriceLookup for InMemoryStore {
    async fn price_for(
        &self,
        equipment: EquipmentId,
        region: PricingRegion,
    ) -> Result<Option<Money>, StoreError> {
        self.inner.price_requests.fetch_add(1, Ordering::SeqCst);
        if self
            .inner
            .failing_prices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&equipment)
        {
            return Err(unavailable());
        }
        Ok(self
            .inner
            .prices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(equipment, region))
            .copied())
    }
}

/// A fixed starting instant for manual clocks.
#[must_use]
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0)
        .single()
        .unwrap_or_default()
}

/// A manual clock at [`epoch`].
#[must_use]
pub fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(epoch()))
}
