//! Quoting layer configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `GQ_STORE_URL` - Base URL of the backing store (e.g., `https://xyz.supabase.co`)
//! - `GQ_STORE_API_KEY` - API key sent as `apikey` and bearer token
//!
//! ## Optional
//! - `GQ_CATALOG_TABLE` - Catalog table (default: guindastes)
//! - `GQ_PRICE_TABLE` - Regional price table (default: `precos_guindaste_regiao`)
//! - `GQ_CATALOG_TTL_SECS` - Catalog cache lifetime (default: 300)
//! - `GQ_CACHE_SWEEP_SECS` - Expired-entry sweep interval (default: 120)
//! - `GQ_CATALOG_PAGE_SIZE` - Rows per catalog request (default: 500)
//! - `GQ_CATALOG_NO_PAGINATION` - Fetch the whole catalog in one request (default: false)
//! - `GQ_LOGIN_MAX_ATTEMPTS` - Failed logins tolerated per window (default: 5)
//! - `GQ_LOGIN_WINDOW_SECS` - Failed-login window (default: 900)
//! - `GQ_LOGIN_BLOCK_SECS` - Block length once the limit is hit (default: 900)
//! - `GQ_CART_DIR` - Directory holding the persisted cart (default: .)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use crate::cache::{DEFAULT_SWEEP_INTERVAL, DEFAULT_TTL};
use crate::rate_limit::RateLimitConfig;

/// Default catalog table name.
pub const DEFAULT_CATALOG_TABLE: &str = "guindastes";
/// Default regional price table name.
pub const DEFAULT_PRICE_TABLE: &str = "precos_guindaste_regiao";
/// Default rows per catalog request.
pub const DEFAULT_PAGE_SIZE: u32 = 500;

/// Fragments that mark a copied-in example value rather than a real key.
const PLACEHOLDER_PATTERNS: &[&str] = &["your-", "changeme", "placeholder", "put-your"];

/// Words that mark a placeholder only when they stand alone between
/// separators, as in `replace-me` or `<insert key>`.
const PLACEHOLDER_WORDS: &[&str] = &["replace", "insert", "xxx"];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Complete quoting layer configuration.
#[derive(Debug, Clone)]
pub struct QuotingConfig {
    /// Backing store connection
    pub store: StoreConfig,
    /// Catalog cache and fetch settings
    pub catalog: CatalogConfig,
    /// Login throttling thresholds
    pub login: RateLimitConfig,
    /// Directory holding the persisted cart
    pub cart_dir: PathBuf,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Backing store connection settings.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct StoreConfig {
    /// Base URL of the store
    pub url: Url,
    /// API key (sent on every request)
    pub api_key: SecretString,
    /// Catalog table name
    pub catalog_table: String,
    /// Regional price table name
    pub price_table: String,
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("url", &self.url.as_str())
            .field("api_key", &"[REDACTED]")
            .field("catalog_table", &self.catalog_table)
            .field("price_table", &self.price_table)
            .finish()
    }
}

/// Catalog cache and fetch settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogConfig {
    /// How long a loaded catalog is served from cache
    pub ttl: Duration,
    /// How often expired cache entries are swept
    pub sweep_interval: Duration,
    /// Rows per catalog request
    pub page_size: u32,
    /// Ask the store for every row in one request
    pub no_pagination: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            page_size: DEFAULT_PAGE_SIZE,
            no_pagination: false,
        }
    }
}

impl QuotingConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the API key looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(lookup);

        let url = env.required("GQ_STORE_URL")?;
        let url = Url::parse(&url)
            .map_err(|e| ConfigError::InvalidEnvVar("GQ_STORE_URL".to_string(), e.to_string()))?;
        let api_key = env.required("GQ_STORE_API_KEY")?;
        validate_api_key(&api_key, "GQ_STORE_API_KEY")?;

        let store = StoreConfig {
            url,
            api_key: SecretString::from(api_key),
            catalog_table: env.or_default("GQ_CATALOG_TABLE", DEFAULT_CATALOG_TABLE),
            price_table: env.or_default("GQ_PRICE_TABLE", DEFAULT_PRICE_TABLE),
        };

        let defaults = CatalogConfig::default();
        let catalog = CatalogConfig {
            ttl: env.seconds("GQ_CATALOG_TTL_SECS", defaults.ttl)?,
            sweep_interval: env.seconds("GQ_CACHE_SWEEP_SECS", defaults.sweep_interval)?,
            page_size: env.parsed("GQ_CATALOG_PAGE_SIZE", defaults.page_size)?,
            no_pagination: env.parsed("GQ_CATALOG_NO_PAGINATION", defaults.no_pagination)?,
        };
        if catalog.page_size == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "GQ_CATALOG_PAGE_SIZE".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        let limits = RateLimitConfig::default();
        let login = RateLimitConfig {
            max_attempts: env.parsed("GQ_LOGIN_MAX_ATTEMPTS", limits.max_attempts)?,
            window: env.seconds("GQ_LOGIN_WINDOW_SECS", limits.window)?,
            block_duration: env.seconds("GQ_LOGIN_BLOCK_SECS", limits.block_duration)?,
        };

        Ok(Self {
            store,
            catalog,
            login,
            cart_dir: PathBuf::from(env.or_default("GQ_CART_DIR", ".")),
            sentry_dsn: env.optional("SENTRY_DSN"),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    /// Get an optional variable; blank values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Parse a variable, falling back to `default` when unset.
    fn parsed<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(key).map_or(Ok(default), |raw| {
            raw.trim()
                .parse()
                .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
        })
    }

    /// Parse a whole number of seconds.
    fn seconds(&self, key: &str, default: Duration) -> Result<Duration, ConfigError> {
        self.parsed(key, default.as_secs()).map(Duration::from_secs)
    }
}

/// Reject keys that are obviously copied from documentation.
fn validate_api_key(key: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = key.to_lowercase();
    let mut words = lower.split(|c: char| !c.is_ascii_alphanumeric());
    PLACEHOLDER_PATTERNS
        .iter()
        .find(|pattern| lower.contains(*pattern))
        .or_else(|| {
            words.find_map(|word| PLACEHOLDER_WORDS.iter().find(|p| **p == word))
        })
        .map_or(Ok(()), |pattern| {
            Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ))
        })
}
