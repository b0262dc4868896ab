//! Login throttling.
//!
//! [`LoginGuard`] runs a credential check between the two halves of the
//! limiter protocol: check the key, run the check, record the outcome.

mod error;

pub use error::AuthError;

use std::future::Future;
use std::sync::Arc;

use guindaste_core::Email;
use tokio::task::JoinHandle;
use tracing::{instrument, warn};

use crate::rate_limit::{LimitReason, RateLimitConfig, RateLimiter, login_key, spawn_cleanup};

/// Wraps login attempts in the sliding-window limiter.
#[derive(Debug, Clone)]
pub struct LoginGuard {
    limiter: Arc<RateLimiter>,
    config: RateLimitConfig,
}

impl LoginGuard {
    #[must_use]
    pub const fn new(limiter: Arc<RateLimiter>, config: RateLimitConfig) -> Self {
        Self { limiter, config }
    }

    #[must_use]
    pub const fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Sweep idle login records once per window. Abort the handle on
    /// shutdown.
    pub fn spawn_sweep(&self) -> JoinHandle<()> {
        spawn_cleanup(Arc::clone(&self.limiter), self.config, self.config.window)
    }

    /// Run `verify` unless the caller is throttled, and record its outcome.
    ///
    /// Any `Ok` from `verify` counts as a successful login and clears the
    /// caller's history; any `Err` counts as a failure. A malformed email is
    /// rejected before the limiter is consulted.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::RateLimited` while the caller is blocked,
    /// `AuthError::InvalidEmail` for a malformed email, or whatever error
    /// `verify` returns.
    #[instrument(skip(self, email, verify))]
    pub async fn attempt<T, F, Fut>(&self, ip: &str, email: &str, verify: F) -> Result<T, AuthError>
    where
        F: FnOnce(Email) -> Fut,
        Fut: Future<Output = Result<T, AuthError>>,
    {
        let email = Email::parse(email)?;
        let key = login_key(ip, email.as_str());

        let check = self.limiter.check_limit(&key, &self.config);
        if !check.allowed {
            let reason = check.reason.unwrap_or(LimitReason::Blocked);
            warn!(ip, reset_time = %check.reset_time, ?reason, "Login throttled");
            return Err(AuthError::RateLimited {
                reset_time: check.reset_time,
                reason,
            });
        }

        let result = verify(email).await;
        self.limiter
            .record_attempt(&key, result.is_ok(), &self.config);
        result
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::clock::{Clock, ManualClock};

    const PASSWORD: &str = "guindaste123";

    async fn verify(email: Email, password: &str) -> Result<String, AuthError> {
        if password == PASSWORD {
            Ok(email.to_string())
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }

    fn guard(clock: &Arc<ManualClock>) -> LoginGuard {
        let clock: Arc<dyn Clock> = clock.clone();
        LoginGuard::new(
            Arc::new(RateLimiter::with_clock(clock)),
            RateLimitConfig::default(),
        )
    }

    fn start() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, 8, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_success_passes_through() {
        let clock = Arc::new(ManualClock::new(start()));
        let guard = guard(&clock);

        let user = guard
            .attempt("10.0.0.1", "Vendas@Empresa.com", |e| verify(e, PASSWORD))
            .await
            .unwrap();
        assert_eq!(user, "vendas@empresa.com");
    }

    #[tokio::test]
    async fn test_blocks_after_max_failures() {
        let clock = Arc::new(ManualClock::new(start()));
        let guard = guard(&clock);

        for _ in 0..5 {
            let err = guard
                .attempt("10.0.0.1", "vendas@empresa.com", |e| verify(e, "wrong"))
                .await
                .unwrap_err();
            assert!(matches!(err, AuthError::InvalidCredentials));
        }

        let err = guard
            .attempt("10.0.0.1", "vendas@empresa.com", |e| verify(e, PASSWORD))
            .await
            .unwrap_err();
        match err {
            AuthError::RateLimited { reset_time, reason } => {
                assert_eq!(reason, LimitReason::LimitExceeded);
                assert_eq!(reset_time, start() + chrono::Duration::minutes(15));
            }
            other => panic!("expected RateLimited, got {other:?}"),
        }

        // Different caller, same email: separate key.
        assert!(
            guard
                .attempt("10.0.0.2", "vendas@empresa.com", |e| verify(e, PASSWORD))
                .await
                .is_ok()
        );

        clock.advance(Duration::from_secs(15 * 60));
        assert!(
            guard
                .attempt("10.0.0.1", "vendas@empresa.com", |e| verify(e, PASSWORD))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_blocked_attempt_does_not_run_verify() {
        let clock = Arc::new(ManualClock::new(start()));
        let guard = guard(&clock);
        for _ in 0..6 {
            let _ = guard
                .attempt("10.0.0.1", "vendas@empresa.com", |e| verify(e, "wrong"))
                .await;
        }

        let mut ran = false;
        let result = guard
            .attempt("10.0.0.1", "vendas@empresa.com", |_| {
                ran = true;
                async { Ok(()) }
            })
            .await;
        assert!(matches!(
            result,
            Err(AuthError::RateLimited {
                reason: LimitReason::Blocked,
                ..
            })
        ));
        assert!(!ran);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_forgets_expired_failures() {
        let clock = Arc::new(ManualClock::new(start()));
        let guard = guard(&clock);
        let _ = guard
            .attempt("10.0.0.1", "vendas@empresa.com", |e| verify(e, "wrong"))
            .await;
        assert_eq!(guard.limiter.tracked_keys(), 1);

        clock.advance(guard.config().window);
        let sweep = guard.spawn_sweep();
        tokio::time::sleep(guard.config().window + Duration::from_secs(1)).await;
        assert_eq!(guard.limiter.tracked_keys(), 0);
        sweep.abort();
    }

    #[tokio::test]
    async fn test_invalid_email_is_not_counted() {
        let clock = Arc::new(ManualClock::new(start()));
        let guard = guard(&clock);

        let err = guard
            .attempt("10.0.0.1", "not-an-email", |e| verify(e, PASSWORD))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidEmail(_)));
        assert_eq!(guard.limiter.tracked_keys(), 0);
    }
}
