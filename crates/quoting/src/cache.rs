//! In-memory TTL cache.
//!
//! Entries expire a fixed time after they are written. Expired entries are
//! dropped lazily when read and eagerly by [`TtlCache::cleanup`], which
//! [`spawn_cleanup`] runs on an interval. There is no size bound: key
//! cardinality is low (one key per distinct catalog query), so TTL alone
//! bounds memory.
//!
//! Keys are strings built by [`cache_key`], so a whole logical dataset can be
//! dropped with [`TtlCache::invalidate_pattern`] without knowing every
//! parameter combination that was cached.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::clock::{Clock, SystemClock, after};

/// Default entry lifetime.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Default interval between background sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(2 * 60);

/// Build a cache key from a logical name and query parameters.
///
/// Parameters are serialized to JSON. Struct fields serialize in declaration
/// order and `serde_json` maps are sorted, so equal parameters always give
/// equal keys and different parameters never collide.
///
/// ```
/// use guindaste_quoting::cache::cache_key;
///
/// #[derive(serde::Serialize)]
/// struct Page { page: u32, size: u32 }
///
/// assert_eq!(cache_key("guindastes", &Page { page: 1, size: 50 }), r#"guindastes:{"page":1,"size":50}"#);
/// ```
pub fn cache_key<P: Serialize + ?Sized>(name: &str, params: &P) -> String {
    let params = serde_json::to_string(params).unwrap_or_default();
    format!("{name}:{params}")
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Snapshot of cache occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Entries currently held, live or not.
    pub entries: usize,
    /// Entries past their expiry that no read or sweep has removed yet.
    pub expired: usize,
}

/// A string-keyed cache whose entries expire after a time-to-live.
///
/// Values are cloned out on read; wrap large values in `Arc`.
pub struct TtlCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    default_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<V> std::fmt::Debug for TtlCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("entries", &self.lock().len())
            .field("default_ttl", &self.default_ttl)
            .finish_non_exhaustive()
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl<V: Clone> TtlCache<V> {
    /// Create a cache on the system clock.
    #[must_use]
    pub fn new(default_ttl: Duration) -> Self {
        Self::with_clock(default_ttl, Arc::new(SystemClock))
    }

    /// Create a cache on an explicit clock.
    #[must_use]
    pub fn with_clock(default_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            default_ttl,
            clock,
        }
    }

    /// The lifetime used when [`set`](Self::set) is given no TTL.
    #[must_use]
    pub const fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Store a value, replacing any existing entry for the key.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        let now = self.clock.now();
        let entry = CacheEntry {
            value,
            created_at: now,
            expires_at: after(now, ttl.unwrap_or(self.default_ttl)),
        };
        self.lock().insert(key.into(), entry);
    }

    /// Get a live value. An expired entry is removed as a side effect.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self.lock();
        let written = match entries.get(key) {
            None => return None,
            Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
            Some(entry) => entry.created_at,
        };
        entries.remove(key);
        trace!(key, %written, "Cache entry expired on read");
        None
    }

    /// Whether a live value exists for the key.
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Remove one key.
    pub fn invalidate(&self, key: &str) {
        self.lock().remove(key);
    }

    /// Remove every key starting with `prefix`. Returns how many were removed.
    pub fn invalidate_pattern(&self, prefix: &str) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        let removed = before - entries.len();
        debug!(prefix, removed, "Invalidated cache prefix");
        removed
    }

    /// Remove every expired entry. Returns how many were removed.
    pub fn cleanup(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    /// Remove everything.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of entries held, including expired ones not yet swept.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no entries are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Occupancy counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now();
        let entries = self.lock();
        CacheStats {
            entries: entries.len(),
            expired: entries.values().filter(|e| e.is_expired(now)).count(),
        }
    }
}

impl<V> TtlCache<V> {
    // No critical section leaves the map half-updated; poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Run [`TtlCache::cleanup`] every `interval` on the current Tokio runtime.
///
/// The task runs until the returned handle is aborted.
pub fn spawn_cleanup<V>(cache: Arc<TtlCache<V>>, interval: Duration) -> JoinHandle<()>
where
    V: Clone + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = cache.cleanup();
            if removed > 0 {
                debug!(removed, "Swept expired cache entries");
            }
        }
    })
}
