//! Crate-level error type.
//!
//! Each component has its own error enum. [`QuotingError`] wraps them for
//! callers, such as the CLI, that drive several components and only need
//! one error to report.

use thiserror::Error;

use crate::auth::AuthError;
use crate::cart::StorageError;
use crate::config::ConfigError;
use crate::store::StoreError;

/// Any error the quoting layer can surface.
#[derive(Debug, Error)]
pub enum QuotingError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Backing store request failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Cart storage could not be read or written.
    #[error("Cart storage error: {0}")]
    Storage(#[from] StorageError),

    /// Login was refused.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// The catalog could not be loaded and nothing was held to fall back on.
    #[error("Catalog unavailable: {0}")]
    Unavailable(String),

    /// A catalog lookup found nothing.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl QuotingError {
    /// Whether retrying later may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Store(StoreError::Http(_) | StoreError::RateLimited(_))
                | Self::Auth(AuthError::RateLimited { .. })
                | Self::Unavailable(_)
        )
    }
}
