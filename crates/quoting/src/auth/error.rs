//! Login error types.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::rate_limit::LimitReason;

/// Errors that can occur on the login path.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] guindaste_core::EmailError),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Too many failed attempts for this caller and email.
    #[error("too many login attempts, try again after {reset_time}")]
    RateLimited {
        reset_time: DateTime<Utc>,
        reason: LimitReason,
    },
}
