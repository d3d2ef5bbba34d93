//! Counter store trait for abstracting where window counters live.

use async_trait::async_trait;

use super::counter::{Decision, Quota};
use super::key::RateLimitKey;
use super::limiter::RateLimiter;

/// Trait for counter store implementations.
///
/// The guards only talk to this trait, so a store backed by something other
/// than process memory can be slotted in without touching the middleware.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Count one request for `key` and judge it against `quota`.
    async fn hit(&self, key: &RateLimitKey, quota: Quota) -> Decision;

    /// Drop counters whose window has elapsed. Returns how many were dropped.
    async fn sweep(&self) -> usize;
}

#[async_trait]
impl RateLimitStore for RateLimiter {
    async fn hit(&self, key: &RateLimitKey, quota: Quota) -> Decision {
        self.check(key, quota)
    }

    async fn sweep(&self) -> usize {
        self.evict_expired(tokio::time::Instant::now())
    }
}
