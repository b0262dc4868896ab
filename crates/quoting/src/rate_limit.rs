//! Sliding-window login throttling.
//!
//! Each key (caller IP plus login email) tracks the timestamps of its recent
//! failed attempts. Callers use a two-step protocol:
//!
//! 1. [`RateLimiter::check_limit`] before the protected operation,
//! 2. [`RateLimiter::record_attempt`] after it, for success and failure alike.
//!
//! The split lets the caller verify the password between the two calls. A
//! check that is never followed by a record leaves no trace.
//!
//! ```text
//!   Open ──success──▶ Open (history cleared)
//!   Open ──check finds count >= max──▶ Blocked
//!   Blocked ──first check at/after blocked_until──▶ Open (history cleared)
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock, after, to_delta};

/// Limiter thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Failures tolerated inside one window.
    pub max_attempts: u32,
    /// How far back failures are counted.
    pub window: Duration,
    /// How long a key stays blocked once the threshold is reached.
    pub block_duration: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window: Duration::from_secs(15 * 60),
            block_duration: Duration::from_secs(15 * 60),
        }
    }
}

/// Why a check was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitReason {
    /// The key is inside an earlier block.
    Blocked,
    /// This check found the threshold reached and started a block.
    LimitExceeded,
}

/// Outcome of [`RateLimiter::check_limit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitResult {
    pub allowed: bool,
    /// Failures still tolerated in the current window.
    pub remaining: u32,
    /// When the block lifts, or when the oldest counted failure leaves the window.
    pub reset_time: DateTime<Utc>,
    pub reason: Option<LimitReason>,
}

#[derive(Debug, Default)]
struct AttemptRecord {
    attempts: VecDeque<DateTime<Utc>>,
    blocked_until: Option<DateTime<Utc>>,
}

impl AttemptRecord {
    fn prune(&mut self, now: DateTime<Utc>, window: Duration) {
        let window = to_delta(window);
        while self
            .attempts
            .front()
            .is_some_and(|at| now.signed_duration_since(*at) >= window)
        {
            self.attempts.pop_front();
        }
    }

    fn count(&self) -> u32 {
        u32::try_from(self.attempts.len()).unwrap_or(u32::MAX)
    }

    fn is_blocked(&self, now: DateTime<Utc>) -> bool {
        self.blocked_until.is_some_and(|until| now < until)
    }
}

/// Build the limiter key for a login attempt.
///
/// ```
/// use guindaste_quoting::rate_limit::login_key;
///
/// assert_eq!(login_key("10.0.0.1", "Vendas@Empresa.com"), "10.0.0.1:vendas@empresa.com");
/// ```
#[must_use]
pub fn login_key(ip: &str, email: &str) -> String {
    format!("{}:{}", ip.trim(), email.trim()).to_lowercase()
}

/// Tracks failed attempts per key.
pub struct RateLimiter {
    records: Mutex<HashMap<String, AttemptRecord>>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("keys", &self.lock().len())
            .finish_non_exhaustive()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    /// Create a limiter on the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a limiter on an explicit clock.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Decide whether the key may attempt the protected operation now.
    ///
    /// A key that reaches the threshold is blocked by this call, not by
    /// [`record_attempt`](Self::record_attempt).
    pub fn check_limit(&self, key: &str, config: &RateLimitConfig) -> RateLimitResult {
        let now = self.clock.now();
        let mut records = self.lock();

        let Some(record) = records.get_mut(key) else {
            return RateLimitResult {
                allowed: true,
                remaining: config.max_attempts,
                reset_time: after(now, config.window),
                reason: None,
            };
        };

        if let Some(until) = record.blocked_until {
            if now < until {
                return RateLimitResult {
                    allowed: false,
                    remaining: 0,
                    reset_time: until,
                    reason: Some(LimitReason::Blocked),
                };
            }
            debug!(key, "Login block elapsed");
            record.blocked_until = None;
            record.attempts.clear();
        }

        record.prune(now, config.window);
        let count = record.count();

        if count >= config.max_attempts {
            let until = after(now, config.block_duration);
            record.blocked_until = Some(until);
            warn!(key, attempts = count, blocked_until = %until, "Login limit exceeded");
            return RateLimitResult {
                allowed: false,
                remaining: 0,
                reset_time: until,
                reason: Some(LimitReason::LimitExceeded),
            };
        }

        let reset_time = record
            .attempts
            .front()
            .map_or(now, |oldest| *oldest);
        RateLimitResult {
            allowed: true,
            remaining: config.max_attempts - count,
            reset_time: after(reset_time, config.window),
            reason: None,
        }
    }

    /// Record the outcome of a protected operation.
    ///
    /// Success forgets the key entirely. Failure appends the current time
    /// after pruning. Failures reported while the key is blocked are ignored.
    pub fn record_attempt(&self, key: &str, success: bool, config: &RateLimitConfig) {
        let mut records = self.lock();

        if success {
            records.remove(key);
            return;
        }

        let now = self.clock.now();
        let record = records.entry(key.to_owned()).or_default();
        if record.is_blocked(now) {
            debug!(key, "Ignoring failure recorded while blocked");
            return;
        }
        record.prune(now, config.window);
        record.attempts.push_back(now);
    }

    /// Forget a key, lifting any block.
    pub fn reset(&self, key: &str) {
        self.lock().remove(key);
    }

    /// Drop records with no failures left in the window and no active block.
    /// Returns how many keys were removed.
    ///
    /// Keys that only ever fail are kept until this runs; owners schedule it
    /// with [`spawn_cleanup`].
    pub fn cleanup(&self, config: &RateLimitConfig) -> usize {
        let now = self.clock.now();
        let mut records = self.lock();
        let before = records.len();
        records.retain(|_, record| {
            record.prune(now, config.window);
            record.is_blocked(now) || !record.attempts.is_empty()
        });
        before - records.len()
    }

    /// Number of keys currently tracked.
    #[must_use]
    pub fn tracked_keys(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, AttemptRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Run [`RateLimiter::cleanup`] every `interval` on the current Tokio
/// runtime until the returned handle is aborted.
pub fn spawn_cleanup(
    limiter: Arc<RateLimiter>,
    config: RateLimitConfig,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = limiter.cleanup(&config);
            if removed > 0 {
                debug!(removed, "Swept idle login records");
            }
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    const KEY: &str = "10.0.0.1:vendas@empresa.com";

    fn limiter() -> (Arc<ManualClock>, RateLimiter) {
        let clock = Arc::new(ManualClock::default());
        let limiter = RateLimiter::with_clock(clock.clone());
        (clock, limiter)
    }

    fn fail(limiter: &RateLimiter, times: u32, config: &RateLimitConfig) {
        for _ in 0..times {
            limiter.record_attempt(KEY, false, config);
        }
    }

    #[test]
    fn test_fresh_key_is_allowed_with_full_budget() {
        let (_clock, limiter) = limiter();
        let config = RateLimitConfig::default();
        let result = limiter.check_limit(KEY, &config);
        assert!(result.allowed);
        assert_eq!(result.remaining, 5);
        assert_eq!(result.reason, None);
        // checking alone leaves no trace
        assert_eq!(limiter.tracked_keys(), 0);
    }

    #[test]
    fn test_remaining_counts_down() {
        let (_clock, limiter) = limiter();
        let config = RateLimitConfig::default();
        fail(&limiter, 3, &config);
        let result = limiter.check_limit(KEY, &config);
        assert!(result.allowed);
        assert_eq!(result.remaining, 2);
    }

    #[test]
    fn test_max_failures_exceed_limit() {
        let (clock, limiter) = limiter();
        let config = RateLimitConfig::default();
        fail(&limiter, 5, &config);

        let result = limiter.check_limit(KEY, &config);
        assert!(!result.allowed);
        assert_eq!(result.reason, Some(LimitReason::LimitExceeded));
        assert_eq!(result.reset_time, after(clock.now(), config.block_duration));

        let again = limiter.check_limit(KEY, &config);
        assert!(!again.allowed);
        assert_eq!(again.reason, Some(LimitReason::Blocked));
        assert_eq!(again.reset_time, result.reset_time);
    }

    #[test]
    fn test_success_resets_count() {
        let (_clock, limiter) = limiter();
        let config = RateLimitConfig::default();
        fail(&limiter, 4, &config);
        limiter.record_attempt(KEY, true, &config);
        fail(&limiter, 4, &config);

        let result = limiter.check_limit(KEY, &config);
        assert!(result.allowed);
        assert_eq!(result.remaining, 1);
    }

    #[test]
    fn test_check_after_block_elapses_is_allowed() {
        let (clock, limiter) = limiter();
        let config = RateLimitConfig::default();
        fail(&limiter, 5, &config);
        assert!(!limiter.check_limit(KEY, &config).allowed);

        clock.advance(config.block_duration);
        let result = limiter.check_limit(KEY, &config);
        assert!(result.allowed);
        assert_eq!(result.remaining, 5);
    }

    #[test]
    fn test_old_failures_leave_the_window() {
        let (clock, limiter) = limiter();
        let config = RateLimitConfig::default();
        fail(&limiter, 3, &config);
        clock.advance(Duration::from_secs(10 * 60));
        fail(&limiter, 2, &config);
        clock.advance(Duration::from_secs(5 * 60));

        // the first three are now exactly one window old
        let result = limiter.check_limit(KEY, &config);
        assert!(result.allowed);
        assert_eq!(result.remaining, 3);
    }

    #[test]
    fn test_failures_while_blocked_are_ignored() {
        let (clock, limiter) = limiter();
        let config = RateLimitConfig {
            max_attempts: 2,
            window: Duration::from_secs(60),
            block_duration: Duration::from_secs(30),
        };
        fail(&limiter, 2, &config);
        assert!(!limiter.check_limit(KEY, &config).allowed);
        fail(&limiter, 10, &config);

        clock.advance(Duration::from_secs(30));
        assert_eq!(limiter.check_limit(KEY, &config).remaining, 2);
    }

    #[test]
    fn test_keys_are_independent() {
        let (_clock, limiter) = limiter();
        let config = RateLimitConfig::default();
        fail(&limiter, 5, &config);
        assert!(!limiter.check_limit(KEY, &config).allowed);
        assert!(limiter.check_limit("10.0.0.2:vendas@empresa.com", &config).allowed);
    }

    #[test]
    fn test_reset_lifts_block() {
        let (_clock, limiter) = limiter();
        let config = RateLimitConfig::default();
        fail(&limiter, 5, &config);
        assert!(!limiter.check_limit(KEY, &config).allowed);
        limiter.reset(KEY);
        assert!(limiter.check_limit(KEY, &config).allowed);
    }

    #[test]
    fn test_cleanup_drops_idle_keys() {
        let (clock, limiter) = limiter();
        let config = RateLimitConfig::default();
        fail(&limiter, 1, &config);
        limiter.record_attempt("other", false, &config);
        clock.advance(config.window);
        assert_eq!(limiter.cleanup(&config), 2);
        assert_eq!(limiter.tracked_keys(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawn_cleanup_drops_failing_only_keys() {
        let (clock, limiter) = limiter();
        let limiter = Arc::new(limiter);
        let config = RateLimitConfig::default();
        fail(&limiter, 2, &config);
        clock.advance(config.window);

        let handle = spawn_cleanup(Arc::clone(&limiter), config, Duration::from_secs(60));
        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(limiter.tracked_keys(), 0);
        handle.abort();
    }

    #[test]
    fn test_login_key_lowercases() {
        assert_eq!(login_key(" ::1 ", "A@B.COM"), "::1:a@b.com");
    }
}
