//! # Fixed-Window Rate Limiting
//!
//! Counts attempts per key within discrete, non-overlapping windows. Keys
//! are hashed client addresses — raw addresses must be hashed with
//! [`attesta_crypto::hash_address`] before they reach this module.
//!
//! Enforcement is approximate: counters live behind a single process-local
//! lock, and a small overshoot under concurrency is acceptable. This is
//! abuse mitigation, not a security boundary.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Prune expired windows once the table grows past this many keys.
const PRUNE_THRESHOLD: usize = 4096;

/// The outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitDecision {
    /// Whether this attempt is within the limit.
    pub allowed: bool,
    /// Attempts remaining in the current window after this one.
    pub remaining: u64,
    /// When the current window ends and the counter resets.
    pub reset_at: DateTime<Utc>,
}

/// Per-key state for the current window.
#[derive(Debug, Clone)]
struct WindowRecord {
    count: u64,
    window_start: DateTime<Utc>,
}

/// Fixed-window counter keyed by hashed client address.
#[derive(Debug, Default)]
pub struct RateLimiter {
    windows: RwLock<HashMap<String, WindowRecord>>,
}

impl RateLimiter {
    /// Create an empty limiter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an attempt for `key` and decide whether it is allowed.
    ///
    /// A missing or expired window resets to `count = 1`; otherwise the
    /// count is incremented. The attempt is allowed while
    /// `count <= limit`. Rejected attempts keep counting, so a client
    /// hammering the endpoint does not roll its own window forward.
    pub fn check_and_increment(
        &self,
        key: &str,
        limit: u64,
        window_secs: u64,
    ) -> RateLimitDecision {
        let now = Utc::now();
        let window = Duration::seconds(window_secs as i64);
        let mut windows = self.windows.write();

        if windows.len() > PRUNE_THRESHOLD {
            windows.retain(|_, record| now - record.window_start < window);
        }

        let record = windows.entry(key.to_string()).or_insert(WindowRecord {
            count: 0,
            window_start: now,
        });

        if now - record.window_start >= window {
            record.count = 0;
            record.window_start = now;
        }

        record.count += 1;

        RateLimitDecision {
            allowed: record.count <= limit,
            remaining: limit.saturating_sub(record.count),
            reset_at: record.window_start + window,
        }
    }

    /// Number of tracked keys. Metrics helper.
    pub fn tracked_keys(&self) -> usize {
        self.windows.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_attempt_allowed() {
        let limiter = RateLimiter::new();
        let decision = limiter.check_and_increment("key-a", 5, 60);
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 4);
    }

    #[test]
    fn sixth_attempt_rejected_with_limit_five() {
        let limiter = RateLimiter::new();
        for _ in 0..5 {
            assert!(limiter.check_and_increment("key-a", 5, 60).allowed);
        }
        let sixth = limiter.check_and_increment("key-a", 5, 60);
        assert!(!sixth.allowed);
        assert_eq!(sixth.remaining, 0);
    }

    #[test]
    fn keys_are_independent() {
        let limiter = RateLimiter::new();
        for _ in 0..5 {
            limiter.check_and_increment("key-a", 5, 60);
        }
        assert!(!limiter.check_and_increment("key-a", 5, 60).allowed);
        assert!(limiter.check_and_increment("key-b", 5, 60).allowed);
    }

    #[test]
    fn expired_window_resets() {
        let limiter = RateLimiter::new();
        for _ in 0..6 {
            limiter.check_and_increment("key-a", 5, 0);
        }
        // window_secs = 0 → every attempt starts a fresh window.
        let next = limiter.check_and_increment("key-a", 5, 0);
        assert!(next.allowed);
        assert_eq!(next.remaining, 4);
    }

    #[test]
    fn remaining_counts_down() {
        let limiter = RateLimiter::new();
        let remaining: Vec<u64> = (0..5)
            .map(|_| limiter.check_and_increment("key-a", 5, 60).remaining)
            .collect();
        assert_eq!(remaining, vec![4, 3, 2, 1, 0]);
    }

    #[test]
    fn reset_at_is_window_start_plus_window() {
        let limiter = RateLimiter::new();
        let before = Utc::now();
        let decision = limiter.check_and_increment("key-a", 5, 60);
        let after = Utc::now();
        assert!(decision.reset_at >= before + Duration::seconds(60));
        assert!(decision.reset_at <= after + Duration::seconds(60));
    }

    #[test]
    fn reset_at_stable_within_window() {
        let limiter = RateLimiter::new();
        let first = limiter.check_and_increment("key-a", 5, 60);
        let second = limiter.check_and_increment("key-a", 5, 60);
        assert_eq!(first.reset_at, second.reset_at);
    }

    #[test]
    fn concurrent_attempts_are_counted() {
        use std::sync::Arc;

        let limiter = Arc::new(RateLimiter::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                std::thread::spawn(move || {
                    (0..25)
                        .filter(|_| limiter.check_and_increment("shared", 100, 60).allowed)
                        .count()
                })
            })
            .collect();

        let allowed: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(allowed, 100, "exactly the limit is admitted");
    }

    #[test]
    fn tracked_keys_counts_distinct_keys() {
        let limiter = RateLimiter::new();
        limiter.check_and_increment("a", 5, 60);
        limiter.check_and_increment("b", 5, 60);
        limiter.check_and_increment("a", 5, 60);
        assert_eq!(limiter.tracked_keys(), 2);
    }
}
