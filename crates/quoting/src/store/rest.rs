//! PostgREST-style HTTP client for the backing store.
//!
//! Tables are read with `GET {base}/rest/v1/{table}` and filters in the
//! query string. The total row count comes back in the `Content-Range`
//! header when `Prefer: count=exact` is sent.

use std::sync::Arc;

use guindaste_core::{CatalogItem, EquipmentId, Money, PricingRegion};
use reqwest::header::{AUTHORIZATION, HeaderMap};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error, instrument};
use url::Url;

use super::{CatalogPage, CatalogSource, PriceLookup, StoreError};
use crate::config::StoreConfig;

/// Client for the REST interface of the backing store.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct RestStore {
    inner: Arc<RestStoreInner>,
}

struct RestStoreInner {
    client: reqwest::Client,
    rest_base: Url,
    api_key: SecretString,
    catalog_table: String,
    price_table: String,
}

impl std::fmt::Debug for RestStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestStore")
            .field("rest_base", &self.inner.rest_base.as_str())
            .field("api_key", &"[REDACTED]")
            .field("catalog_table", &self.inner.catalog_table)
            .field("price_table", &self.inner.price_table)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct PriceRow {
    preco: Option<Money>,
}

impl RestStore {
    /// Create a client for the configured store.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Url` if the base URL cannot take a path.
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let mut base = config.url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let rest_base = base.join("rest/v1/")?;

        Ok(Self {
            inner: Arc::new(RestStoreInner {
                client: reqwest::Client::new(),
                rest_base,
                api_key: config.api_key.clone(),
                catalog_table: config.catalog_table.clone(),
                price_table: config.price_table.clone(),
            }),
        })
    }

    /// Build the URL for a table read.
    fn table_url(&self, table: &str, params: &[(&str, String)]) -> Result<Url, StoreError> {
        let mut url = self.inner.rest_base.join(table)?;
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in params {
                query.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// Execute a GET and decode the JSON array body.
    async fn select<T: DeserializeOwned>(
        &self,
        url: Url,
        count: bool,
    ) -> Result<(Vec<T>, Option<usize>), StoreError> {
        let key = self.inner.api_key.expose_secret();
        let mut request = self
            .inner
            .client
            .get(url)
            .header("apikey", key)
            .header(AUTHORIZATION, format!("Bearer {key}"))
            .header("Accept", "application/json");
        if count {
            request = request.header("Prefer", "count=exact");
        }

        let response = request.send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(StoreError::RateLimited(retry_after));
        }

        let total = parse_content_range(response.headers());
        let body = response.text().await?;

        if !status.is_success() {
            error!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "Backing store returned non-success status"
            );
            return Err(StoreError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let rows: Vec<T> = serde_json::from_str(&body).map_err(|e| {
            error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse backing store response"
            );
            StoreError::Parse(e)
        })?;

        Ok((rows, total))
    }
}

impl CatalogSource for RestStore {
    #[instrument(skip(self))]
    async fn fetch_catalog(
        &self,
        page: u32,
        page_size: u32,
        no_pagination: bool,
    ) -> Result<CatalogPage, StoreError> {
        let mut params = vec![
            ("select", "*".to_string()),
            ("order", "id.asc".to_string()),
        ];
        if !no_pagination {
            let offset = u64::from(page.saturating_sub(1)) * u64::from(page_size);
            params.push(("offset", offset.to_string()));
            params.push(("limit", page_size.to_string()));
        }

        let url = self.table_url(&self.inner.catalog_table, &params)?;
        let (data, total): (Vec<CatalogItem>, _) = self.select(url, true).await?;
        let count = total.unwrap_or(data.len());

        debug!(rows = data.len(), count, "Fetched catalog page");
        Ok(CatalogPage { data, count })
    }
}

impl PriceLookup for RestStore {
    #[instrument(skip(self))]
    async fn price_for(
        &self,
        equipment: EquipmentId,
        region: PricingRegion,
    ) -> Result<Option<Money>, StoreError> {
        let params = [
            ("select", "preco".to_string()),
            ("guindaste_id", format!("eq.{equipment}")),
            ("regiao", format!("eq.{}", region.as_code())),
            ("limit", "1".to_string()),
        ];
        let url = self.table_url(&self.inner.price_table, &params)?;
        let (rows, _): (Vec<PriceRow>, _) = self.select(url, false).await?;

        Ok(rows.into_iter().next().and_then(|row| row.preco))
    }
}

/// Extract the total from a `Content-Range: 0-24/3573` header.
fn parse_content_range(headers: &HeaderMap) -> Option<usize> {
    headers
        .get("Content-Range")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.rsplit_once('/'))
        .and_then(|(_, total)| total.parse().ok())
}
