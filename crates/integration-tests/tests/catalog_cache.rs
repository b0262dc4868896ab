//! Catalog loading through a shared TTL cache.

use std::sync::Arc;
use std::time::Duration;

use guindaste_integration_tests::{InMemoryStore, manual_clock};
use guindaste_quoting::cache::{TtlCache, cache_key};
use guindaste_quoting::catalog::{CATALOG_DATASET, CatalogOptimizer, CatalogProjection};
use guindaste_quoting::clock::Clock;
use guindaste_quoting::config::CatalogConfig;

const CATALOG: &[&str] = &["Guindaste GSI 6.5 3h1m", "Guindaste GSE 8.0 4h2m"];

type ProjectionCache = TtlCache<Arc<CatalogProjection>>;

#[tokio::test]
async fn test_capacity_index_and_cached_reload() {
    let store = InMemoryStore::with_catalog(CATALOG);
    let clock = manual_clock();
    let shared: Arc<dyn Clock> = clock.clone();
    let cache: Arc<ProjectionCache> = Arc::new(TtlCache::with_clock(
        CatalogConfig::default().ttl,
        Arc::clone(&shared),
    ));
    let optimizer =
        CatalogOptimizer::with_clock(store.clone(), cache, CatalogConfig::default(), shared);

    let first = optimizer.load(false).await;
    assert!(!first.from_cache);
    assert_eq!(optimizer.capacities(), vec!["6.5", "8.0"]);
    assert_eq!(optimizer.get_by_capacity("6.5").len(), 1);
    assert_eq!(optimizer.get_by_capacity("8.0").len(), 1);

    clock.advance(Duration::from_secs(60));
    let second = optimizer.load(false).await;
    assert!(second.from_cache);
    assert_eq!(store.catalog_requests(), 1);
}

#[tokio::test]
async fn test_optimizers_share_one_cache() {
    let store = InMemoryStore::with_catalog(CATALOG);
    let cache: Arc<ProjectionCache> = Arc::new(TtlCache::new(CatalogConfig::default().ttl));

    let a = CatalogOptimizer::new(store.clone(), Arc::clone(&cache), CatalogConfig::default());
    let b = CatalogOptimizer::new(store.clone(), Arc::clone(&cache), CatalogConfig::default());

    assert!(!a.load(false).await.from_cache);
    assert!(b.load(false).await.from_cache);
    assert_eq!(b.get_by_model("GSE 8.0").len(), 1);
    assert_eq!(store.catalog_requests(), 1);
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn test_invalidating_dataset_forces_fetch() {
    let store = InMemoryStore::with_catalog(CATALOG);
    let cache: Arc<ProjectionCache> = Arc::new(TtlCache::new(CatalogConfig::default().ttl));
    let optimizer = CatalogOptimizer::new(store.clone(), Arc::clone(&cache), CatalogConfig::default());

    optimizer.load(false).await;
    cache.set(cache_key("acessorios", &1), Arc::default(), None);

    assert_eq!(cache.invalidate_pattern(&format!("{CATALOG_DATASET}:")), 1);
    assert!(!optimizer.load(false).await.from_cache);
    assert_eq!(store.catalog_requests(), 2);
    assert_eq!(cache.len(), 2);
}

#[tokio::test]
async fn test_outage_keeps_serving_last_catalog() {
    let store = InMemoryStore::with_catalog(CATALOG);
    let clock = manual_clock();
    let shared: Arc<dyn Clock> = clock.clone();
    let cache: Arc<ProjectionCache> = Arc::new(TtlCache::with_clock(
        CatalogConfig::default().ttl,
        Arc::clone(&shared),
    ));
    let optimizer =
        CatalogOptimizer::with_clock(store.clone(), cache, CatalogConfig::default(), shared);

    optimizer.load(false).await;
    store.set_catalog_down(true);
    clock.advance(Duration::from_secs(10 * 60));

    let degraded = optimizer.load(false).await;
    assert!(degraded.error.is_some());
    assert_eq!(degraded.projection.len(), 2);
    assert_eq!(optimizer.get_by_capacity("8.0").len(), 1);

    store.set_catalog_down(false);
    let recovered = optimizer.load(false).await;
    assert!(recovered.error.is_none());
    assert!(!recovered.from_cache);
}
