//! Catalog commands.
//!
//! # Environment Variables
//!
//! - `GQ_STORE_URL` / `GQ_STORE_API_KEY` - backing store
//! - `GQ_CATALOG_TABLE`, `GQ_CATALOG_PAGE_SIZE`, `GQ_CATALOG_NO_PAGINATION`

use std::sync::Arc;

use guindaste_core::CatalogItem;
use guindaste_quoting::QuotingError;
use guindaste_quoting::cache::TtlCache;
use guindaste_quoting::catalog::{CatalogLoad, CatalogOptimizer};
use guindaste_quoting::config::QuotingConfig;
use guindaste_quoting::store::RestStore;

async fn load_catalog(
    config: &QuotingConfig,
    refresh: bool,
) -> Result<(CatalogOptimizer<RestStore>, CatalogLoad), QuotingError> {
    let store = RestStore::new(&config.store)?;
    let cache = Arc::new(TtlCache::new(config.catalog.ttl));
    let optimizer = CatalogOptimizer::new(store, cache, config.catalog);

    let load = optimizer.load(refresh).await;
    if let Some(error) = &load.error {
        if load.projection.is_empty() {
            return Err(QuotingError::Unavailable(error.clone()));
        }
        tracing::warn!(%error, "Using previously loaded catalog");
    }
    Ok((optimizer, load))
}

/// Load the catalog and print one line per capacity.
///
/// # Errors
///
/// Returns an error if the store client cannot be built or the catalog
/// cannot be fetched.
#[allow(clippy::print_stdout)]
pub async fn load(config: &QuotingConfig, refresh: bool) -> Result<(), QuotingError> {
    let (optimizer, load) = load_catalog(config, refresh).await?;
    let projection = &load.projection;

    tracing::info!(
        items = projection.len(),
        from_cache = load.from_cache,
        load_time = ?load.load_time,
        "Catalog ready"
    );

    for capacity in optimizer.capacities() {
        let models = optimizer.models_for_capacity(&capacity);
        println!(
            "{capacity} t\t{} item(s)\t{}",
            optimizer.get_by_capacity(&capacity).len(),
            models.join(", ")
        );
    }
    if !projection.unindexed().is_empty() {
        println!("{} item(s) without capacity", projection.unindexed().len());
    }
    Ok(())
}

/// Print the cranes offered at a capacity.
///
/// # Errors
///
/// Returns `QuotingError::NotFound` if no crane has that capacity.
pub async fn capacity(config: &QuotingConfig, value: &str) -> Result<(), QuotingError> {
    let (optimizer, _) = load_catalog(config, false).await?;
    print_items(&optimizer.get_by_capacity(value), || format!("capacity {value}"))
}

/// Print the cranes with a model key.
///
/// # Errors
///
/// Returns `QuotingError::NotFound` if no crane has that model key.
pub async fn model(config: &QuotingConfig, name: &str) -> Result<(), QuotingError> {
    let (optimizer, _) = load_catalog(config, false).await?;
    print_items(&optimizer.get_by_model(name), || format!("model {name}"))
}

#[allow(clippy::print_stdout)]
fn print_items(items: &[CatalogItem], what: impl FnOnce() -> String) -> Result<(), QuotingError> {
    if items.is_empty() {
        return Err(QuotingError::NotFound(what()));
    }
    for item in items {
        println!(
            "{}\t{}\t{}",
            item.id,
            item.name,
            item.reference_code.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}
