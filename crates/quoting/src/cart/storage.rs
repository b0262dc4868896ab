//! Durable cart storage.
//!
//! The whole cart is one JSON array under a fixed key, read once when the
//! cart manager starts and rewritten wholesale after every mutation.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use guindaste_core::CartItem;
use thiserror::Error;

/// Storage key of the persisted cart.
pub const CART_STORAGE_KEY: &str = "guindaste_cart";

/// Errors reading or writing the persisted cart.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("cart storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cart storage holds invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Where the cart is persisted.
pub trait CartStorage: Send + Sync {
    /// Read the stored cart; `Ok(None)` when nothing was ever saved.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the stored value cannot be read or decoded.
    fn load(&self) -> Result<Option<Vec<CartItem>>, StorageError>;

    /// Replace the stored cart.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be written.
    fn save(&self, items: &[CartItem]) -> Result<(), StorageError>;
}

/// Cart persisted as `<dir>/guindaste_cart.json`.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    #[must_use]
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(format!("{CART_STORAGE_KEY}.json")),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CartStorage for JsonFileStorage {
    fn load(&self) -> Result<Option<Vec<CartItem>>, StorageError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, items: &[CartItem]) -> Result<(), StorageError> {
        let raw = serde_json::to_string_pretty(items)?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}

/// In-process storage holding the serialized cart.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    raw: Mutex<Option<String>>,
    writes: AtomicUsize,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-filled with a raw stored value, valid or not.
    #[must_use]
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            raw: Mutex::new(Some(raw.into())),
            writes: AtomicUsize::new(0),
        }
    }

    /// The stored value as written.
    #[must_use]
    pub fn raw(&self) -> Option<String> {
        self.raw.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of saves so far.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl CartStorage for MemoryStorage {
    fn load(&self) -> Result<Option<Vec<CartItem>>, StorageError> {
        self.raw()
            .map(|raw| serde_json::from_str(&raw))
            .transpose()
            .map_err(StorageError::from)
    }

    fn save(&self, items: &[CartItem]) -> Result<(), StorageError> {
        let raw = serde_json::to_string(items)?;
        *self.raw.lock().unwrap_or_else(PoisonError::into_inner) = Some(raw);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use guindaste_core::{ItemId, ItemKind, Money};

    use super::*;

    fn sample() -> Vec<CartItem> {
        vec![
            CartItem::new(ItemId::new(7), ItemKind::Equipment, "Guindaste GSI 6.5 3h1m")
                .with_price(Money::from_centavos(10_000)),
            CartItem::new(ItemId::new(31), ItemKind::Accessory, "Cesto aéreo").with_quantity(2),
        ]
    }

    #[test]
    fn test_file_storage_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path());
        assert!(storage.load().unwrap().is_none());
    }

    #[test]
    fn test_file_storage_persists() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path());
        storage.save(&sample()).unwrap();

        assert!(storage.path().ends_with("guindaste_cart.json"));
        let reopened = JsonFileStorage::new(dir.path());
        assert_eq!(reopened.load().unwrap().unwrap(), sample());
    }

    #[test]
    fn test_file_storage_corrupt_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path());
        std::fs::write(storage.path(), "{not json").unwrap();

        assert!(matches!(storage.load(), Err(StorageError::Json(_))));
    }

    #[test]
    fn test_memory_storage_counts_writes() {
        let storage = MemoryStorage::new();
        assert!(storage.load().unwrap().is_none());

        storage.save(&sample()).unwrap();
        storage.save(&[]).unwrap();

        assert_eq!(storage.writes(), 2);
        assert_eq!(storage.raw().as_deref(), Some("[]"));
        assert!(storage.load().unwrap().unwrap().is_empty());
    }

    #[test]
    fn test_prices_stored_as_strings() {
        let storage = MemoryStorage::new();
        storage.save(&sample()).unwrap();
        assert!(storage.raw().unwrap().contains(r#""unit_price":"100.00""#));
    }
}
