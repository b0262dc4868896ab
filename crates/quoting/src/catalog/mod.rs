//! Catalog optimizer.
//!
//! Loads the equipment catalog through the TTL cache and derives two
//! indexes from it: capacity → items and model → items. The indexes live
//! inside the cached [`CatalogProjection`] so they are rebuilt on every
//! load and can never disagree with the item list they were built from.
//!
//! A failed fetch never surfaces as an error. The last good projection is
//! served (even if its cache entry has expired) with the failure attached,
//! or an empty projection when nothing was ever loaded.

mod extract;

pub use extract::{extract_capacity, extract_model};

use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use guindaste_core::{CatalogItem, EquipmentId};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::cache::{TtlCache, cache_key, spawn_cleanup};
use crate::clock::{Clock, SystemClock};
use crate::config::CatalogConfig;
use crate::store::{CatalogSource, StoreError};

/// Cache namespace for catalog projections.
pub const CATALOG_DATASET: &str = "guindastes";

/// Parameters that distinguish one cached catalog from another.
#[derive(Debug, Serialize)]
struct CatalogQuery {
    page_size: u32,
    no_pagination: bool,
}

/// An immutable, indexed view of the catalog.
#[derive(Debug, Clone, Default)]
pub struct CatalogProjection {
    items: Vec<CatalogItem>,
    capacity_index: HashMap<String, Vec<usize>>,
    model_index: HashMap<String, Vec<usize>>,
    unindexed: Vec<EquipmentId>,
    loaded_at: Option<DateTime<Utc>>,
}

impl CatalogProjection {
    /// Index a list of catalog items.
    #[must_use]
    pub fn build(items: Vec<CatalogItem>, loaded_at: DateTime<Utc>) -> Self {
        let mut capacity_index: HashMap<String, Vec<usize>> = HashMap::new();
        let mut model_index: HashMap<String, Vec<usize>> = HashMap::new();
        let mut unindexed = Vec::new();

        for (pos, item) in items.iter().enumerate() {
            match (extract_capacity(&item.name), extract_model(&item.name)) {
                (Some(capacity), Some(model)) => {
                    capacity_index.entry(capacity).or_default().push(pos);
                    model_index.entry(model).or_default().push(pos);
                }
                _ => unindexed.push(item.id),
            }
        }

        Self {
            items,
            capacity_index,
            model_index,
            unindexed,
            loaded_at: Some(loaded_at),
        }
    }

    /// Every catalog item, in fetch order.
    #[must_use]
    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// When the underlying items were fetched; `None` for the empty fallback.
    #[must_use]
    pub const fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.loaded_at
    }

    /// Items whose name yielded no capacity.
    #[must_use]
    pub fn unindexed(&self) -> &[EquipmentId] {
        &self.unindexed
    }

    /// Items with exactly this capacity string.
    #[must_use]
    pub fn by_capacity(&self, capacity: &str) -> Vec<&CatalogItem> {
        self.resolve(self.capacity_index.get(capacity))
    }

    /// Items with exactly this model key.
    #[must_use]
    pub fn by_model(&self, model: &str) -> Vec<&CatalogItem> {
        self.resolve(self.model_index.get(model))
    }

    #[must_use]
    pub fn by_id(&self, id: EquipmentId) -> Option<&CatalogItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Distinct capacities, smallest first.
    #[must_use]
    pub fn capacities(&self) -> Vec<String> {
        let mut capacities: Vec<String> = self.capacity_index.keys().cloned().collect();
        capacities.sort_by_cached_key(|c| (Decimal::from_str(c).unwrap_or(Decimal::MAX), c.clone()));
        capacities
    }

    /// Distinct model keys offered at a capacity, sorted.
    #[must_use]
    pub fn models_for_capacity(&self, capacity: &str) -> Vec<String> {
        self.by_capacity(capacity)
            .into_iter()
            .filter_map(|item| extract_model(&item.name))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    fn resolve(&self, positions: Option<&Vec<usize>>) -> Vec<&CatalogItem> {
        positions
            .into_iter()
            .flatten()
            .filter_map(|&pos| self.items.get(pos))
            .collect()
    }
}

/// Result of [`CatalogOptimizer::load`].
#[derive(Debug, Clone)]
pub struct CatalogLoad {
    pub projection: Arc<CatalogProjection>,
    /// No network fetch produced this projection.
    pub from_cache: bool,
    /// Wall time spent fetching and indexing; `None` when nothing was fetched.
    pub load_time: Option<Duration>,
    /// The fetch failure behind a degraded result.
    pub error: Option<String>,
}

/// Read-through catalog loader with derived indexes.
pub struct CatalogOptimizer<S> {
    source: S,
    cache: Arc<TtlCache<Arc<CatalogProjection>>>,
    last: RwLock<Option<Arc<CatalogProjection>>>,
    config: CatalogConfig,
    clock: Arc<dyn Clock>,
}

impl<S> std::fmt::Debug for CatalogOptimizer<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogOptimizer")
            .field("cache", &self.cache)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S: CatalogSource> CatalogOptimizer<S> {
    /// Create an optimizer over `source`, caching in `cache`.
    #[must_use]
    pub fn new(
        source: S,
        cache: Arc<TtlCache<Arc<CatalogProjection>>>,
        config: CatalogConfig,
    ) -> Self {
        Self::with_clock(source, cache, config, Arc::new(SystemClock))
    }

    /// Create an optimizer stamping projections with `clock`.
    #[must_use]
    pub fn with_clock(
        source: S,
        cache: Arc<TtlCache<Arc<CatalogProjection>>>,
        config: CatalogConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            cache,
            last: RwLock::new(None),
            config,
            clock,
        }
    }

    /// Sweep expired entries from the shared cache every
    /// `sweep_interval`. Abort the handle on shutdown.
    pub fn spawn_sweep(&self) -> JoinHandle<()> {
        spawn_cleanup(Arc::clone(&self.cache), self.config.sweep_interval)
    }

    fn key(&self) -> String {
        cache_key(
            CATALOG_DATASET,
            &CatalogQuery {
                page_size: self.config.page_size,
                no_pagination: self.config.no_pagination,
            },
        )
    }

    /// Load the catalog, from cache unless expired or `force_refresh`.
    #[instrument(skip(self))]
    pub async fn load(&self, force_refresh: bool) -> CatalogLoad {
        let key = self.key();

        if !force_refresh && let Some(projection) = self.cache.get(&key) {
            debug!(items = projection.len(), "Catalog served from cache");
            self.remember(&projection);
            return CatalogLoad {
                projection,
                from_cache: true,
                load_time: None,
                error: None,
            };
        }

        self.cache.invalidate_pattern(&format!("{CATALOG_DATASET}:"));

        let started = Instant::now();
        match self.fetch_all().await {
            Ok(items) => {
                let projection = Arc::new(CatalogProjection::build(items, self.clock.now()));
                let load_time = started.elapsed();

                if !projection.unindexed.is_empty() {
                    warn!(
                        count = projection.unindexed.len(),
                        ids = ?projection.unindexed,
                        "Catalog items without a parseable capacity"
                    );
                }
                info!(
                    items = projection.len(),
                    capacities = projection.capacity_index.len(),
                    models = projection.model_index.len(),
                    elapsed_ms = load_time.as_millis(),
                    "Catalog loaded"
                );

                self.cache
                    .set(key, Arc::clone(&projection), Some(self.config.ttl));
                self.remember(&projection);

                CatalogLoad {
                    projection,
                    from_cache: false,
                    load_time: Some(load_time),
                    error: None,
                }
            }
            Err(e) => {
                let stale = self.current();
                warn!(error = %e, has_stale = stale.is_some(), "Catalog fetch failed");
                CatalogLoad {
                    from_cache: stale.is_some(),
                    projection: stale.unwrap_or_default(),
                    load_time: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Fetch every catalog page.
    async fn fetch_all(&self) -> Result<Vec<CatalogItem>, StoreError> {
        let CatalogConfig {
            page_size,
            no_pagination,
            ..
        } = self.config;

        let first = self.source.fetch_catalog(1, page_size, no_pagination).await?;
        let total = first.count;
        let mut items = first.data;
        if no_pagination {
            return Ok(items);
        }

        let mut page = 1;
        while items.len() < total {
            page += 1;
            let next = self.source.fetch_catalog(page, page_size, false).await?;
            if next.data.is_empty() {
                break;
            }
            debug!(page, rows = next.data.len(), "Fetched catalog page");
            items.extend(next.data);
        }
        Ok(items)
    }

    fn remember(&self, projection: &Arc<CatalogProjection>) {
        let mut last = self.last.write().unwrap_or_else(PoisonError::into_inner);
        *last = Some(Arc::clone(projection));
    }

    /// The last projection handed out by [`load`](Self::load), if any.
    #[must_use]
    pub fn current(&self) -> Option<Arc<CatalogProjection>> {
        self.last
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Items with this capacity in the last-loaded catalog.
    #[must_use]
    pub fn get_by_capacity(&self, capacity: &str) -> Vec<CatalogItem> {
        self.current()
            .map(|p| p.by_capacity(capacity).into_iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Items with this model key in the last-loaded catalog.
    #[must_use]
    pub fn get_by_model(&self, model: &str) -> Vec<CatalogItem> {
        self.current()
            .map(|p| p.by_model(model).into_iter().cloned().collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn get_by_id(&self, id: EquipmentId) -> Option<CatalogItem> {
        self.current().and_then(|p| p.by_id(id).cloned())
    }

    /// Distinct capacities in the last-loaded catalog, smallest first.
    #[must_use]
    pub fn capacities(&self) -> Vec<String> {
        self.current().map(|p| p.capacities()).unwrap_or_default()
    }

    #[must_use]
    pub fn models_for_capacity(&self, capacity: &str) -> Vec<String> {
        self.current()
            .map(|p| p.models_for_capacity(capacity))
            .unwrap_or_default()
    }
}
