//! In-memory rate limiter.

use dashmap::DashMap;
use tokio::time::Instant;
use tracing::{debug, trace};

use super::counter::{Decision, Quota, WindowCounter};
use super::key::RateLimitKey;

/// The in-memory store of window counters for one guard.
///
/// This struct is thread-safe and can be shared across multiple tasks.
#[derive(Debug, Default)]
pub struct RateLimiter {
    /// Window counters indexed by key
    counters: DashMap<RateLimitKey, WindowCounter>,
}

impl RateLimiter {
    /// Create a new, empty rate limiter.
    pub fn new() -> Self {
        Self {
            counters: DashMap::new(),
        }
    }

    /// Count one request for `key` against `quota` at the current time.
    pub fn check(&self, key: &RateLimitKey, quota: Quota) -> Decision {
        self.check_at(key, quota, Instant::now())
    }

    /// Count one request for `key` against `quota` at `now`.
    pub fn check_at(&self, key: &RateLimitKey, quota: Quota, now: Instant) -> Decision {
        trace!(key = %key, limit = quota.limit, "Checking rate limit");

        let decision = self
            .counters
            .entry(key.clone())
            .or_insert_with(|| {
                debug!(
                    key = %key,
                    limit = quota.limit,
                    per = ?quota.per,
                    "Creating new window counter"
                );
                WindowCounter::new()
            })
            .hit(now, quota);

        if !decision.allowed {
            debug!(
                key = %key,
                count = decision.count,
                limit = decision.limit,
                "Rate limit exceeded"
            );
        }

        decision
    }

    /// Drop every counter whose window has elapsed as of `now`.
    ///
    /// Returns the number of counters removed.
    pub fn evict_expired(&self, now: Instant) -> usize {
        let mut evicted = 0;
        self.counters.retain(|_, counter| {
            let expired = counter.is_expired(now);
            if expired {
                evicted += 1;
            }
            !expired
        });

        if evicted > 0 {
            debug!(evicted, remaining = self.counters.len(), "Evicted expired counters");
        }
        evicted
    }

    /// Get the current counter value for a key.
    ///
    /// Returns `None` if no counter exists for the key.
    pub fn counter_value(&self, key: &RateLimitKey) -> Option<u64> {
        self.counters.get(key).map(|c| c.count())
    }

    /// Clear all counters.
    pub fn clear(&self) {
        self.counters.clear();
    }

    /// Get the number of active counters.
    pub fn counter_count(&self) -> usize {
        self.counters.len()
    }
}
