//! Shared, live-adjustable quota.

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::ratelimit::Quota;

/// A handle onto the quota a guard enforces.
///
/// Every clone points at the same quota, so updating it through any handle
/// changes what the guard enforces from the next request on. Counters that are
/// mid-window keep their reset time and are judged against the new limit.
#[derive(Debug, Clone)]
pub struct QuotaHandle {
    quota: Arc<RwLock<Quota>>,
}

impl QuotaHandle {
    pub fn new(quota: Quota) -> Self {
        Self {
            quota: Arc::new(RwLock::new(quota)),
        }
    }

    /// Get the quota currently enforced.
    pub fn get(&self) -> Quota {
        *self.quota.read()
    }

    /// Replace the quota with `max_requests` per `per_seconds` seconds.
    pub fn set(&self, max_requests: u64, per_seconds: u64) {
        self.set_quota(Quota::new(max_requests, Duration::from_secs(per_seconds)));
    }

    /// Replace the quota.
    pub fn set_quota(&self, quota: Quota) {
        let mut current = self.quota.write();
        info!(
            old_limit = current.limit,
            old_per = ?current.per,
            new_limit = quota.limit,
            new_per = ?quota.per,
            "Quota updated"
        );
        *current = quota;
    }
}
