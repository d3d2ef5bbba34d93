//! Fixed-window request counter.

use std::time::Duration;
use tokio::time::Instant;

/// Furthest a window may reach past its start.
///
/// Windows longer than this would overflow the clock and are cut short here.
const MAX_WINDOW: Duration = Duration::from_secs(86400 * 365 * 30);

/// Time unit used by rule files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    /// Per-second rate limiting
    Second,
    /// Per-minute rate limiting
    Minute,
    /// Per-hour rate limiting
    Hour,
    /// Per-day rate limiting
    Day,
}

impl TimeUnit {
    /// Get the duration of one unit.
    pub fn duration(&self) -> Duration {
        match self {
            TimeUnit::Second => Duration::from_secs(1),
            TimeUnit::Minute => Duration::from_secs(60),
            TimeUnit::Hour => Duration::from_secs(3600),
            TimeUnit::Day => Duration::from_secs(86400),
        }
    }
}

impl From<TimeUnit> for Duration {
    fn from(unit: TimeUnit) -> Self {
        unit.duration()
    }
}

/// How many requests a key may make inside one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
    /// Maximum accepted requests per window
    pub limit: u64,
    /// Window length
    pub per: Duration,
}

impl Quota {
    pub fn new(limit: u64, per: Duration) -> Self {
        Self { limit, per }
    }

    pub fn per_second(limit: u64) -> Self {
        Self::new(limit, TimeUnit::Second.duration())
    }

    pub fn per_minute(limit: u64) -> Self {
        Self::new(limit, TimeUnit::Minute.duration())
    }

    pub fn per_hour(limit: u64) -> Self {
        Self::new(limit, TimeUnit::Hour.duration())
    }

    pub fn per_day(limit: u64) -> Self {
        Self::new(limit, TimeUnit::Day.duration())
    }
}

/// Outcome of counting one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// Whether the request is within the quota
    pub allowed: bool,
    /// Requests counted in the current window, this one included
    pub count: u64,
    /// The limit the request was judged against
    pub limit: u64,
    /// Time left until the current window resets
    pub reset_after: Duration,
}

impl Decision {
    /// Requests still available in the current window.
    pub fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.count)
    }
}

/// A counter for a single key.
///
/// The window opens on the first request and closes `per` later. Rejected
/// requests are counted too, so a client hammering a closed window does not
/// get its quota back until the window resets.
#[derive(Debug, Clone, Default)]
pub struct WindowCounter {
    count: u64,
    reset_at: Option<Instant>,
}

impl WindowCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one request at `now` and judge it against `quota`.
    pub fn hit(&mut self, now: Instant, quota: Quota) -> Decision {
        let reset_after = match self.reset_at {
            Some(reset_at) if now <= reset_at => {
                self.count += 1;
                reset_at - now
            }
            _ => {
                let per = quota.per.min(MAX_WINDOW);
                let reset_at = now.checked_add(per).unwrap_or(now);
                self.count = 1;
                self.reset_at = Some(reset_at);
                reset_at - now
            }
        };

        Decision {
            allowed: self.count <= quota.limit,
            count: self.count,
            limit: quota.limit,
            reset_after,
        }
    }

    /// Whether the window has elapsed as of `now`.
    pub fn is_expired(&self, now: Instant) -> bool {
        match self.reset_at {
            Some(reset_at) => now > reset_at,
            None => true,
        }
    }

    /// Requests counted in the current window.
    pub fn count(&self) -> u64 {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_unit_duration() {
        assert_eq!(TimeUnit::Second.duration(), Duration::from_secs(1));
        assert_eq!(TimeUnit::Minute.duration(), Duration::from_secs(60));
        assert_eq!(TimeUnit::Hour.duration(), Duration::from_secs(3600));
        assert_eq!(TimeUnit::Day.duration(), Duration::from_secs(86400));
    }

    #[test]
    fn test_first_hit_opens_window() {
        let mut counter = WindowCounter::new();
        let now = Instant::now();

        let decision = counter.hit(now, Quota::per_minute(3));

        assert!(decision.allowed);
        assert_eq!(decision.count, 1);
        assert_eq!(decision.remaining(), 2);
        assert_eq!(decision.reset_after, Duration::from_secs(60));
    }

    #[test]
    fn test_hits_over_limit_are_rejected() {
        let mut counter = WindowCounter::new();
        let now = Instant::now();
        let quota = Quota::per_second(5);

        for _ in 0..5 {
            assert!(counter.hit(now, quota).allowed);
        }

        // The 6th request should be rejected
        let decision = counter.hit(now, quota);
        assert!(!decision.allowed);
        assert_eq!(decision.count, 6);
        assert_eq!(decision.remaining(), 0);
    }

    #[test]
    fn test_reset_after_shrinks_inside_window() {
        let mut counter = WindowCounter::new();
        let start = Instant::now();
        let quota = Quota::new(10, Duration::from_secs(30));

        counter.hit(start, quota);
        let decision = counter.hit(start + Duration::from_secs(12), quota);

        assert_eq!(decision.reset_after, Duration::from_secs(18));
    }

    #[test]
    fn test_window_resets_after_expiry() {
        let mut counter = WindowCounter::new();
        let start = Instant::now();
        let quota = Quota::new(1, Duration::from_secs(10));

        assert!(counter.hit(start, quota).allowed);
        assert!(!counter.hit(start + Duration::from_secs(5), quota).allowed);

        // Exactly at the boundary the window is still open
        assert!(!counter.hit(start + Duration::from_secs(10), quota).allowed);

        let decision = counter.hit(start + Duration::from_secs(11), quota);
        assert!(decision.allowed);
        assert_eq!(decision.count, 1);
    }

    #[test]
    fn test_zero_limit_rejects_everything() {
        let mut counter = WindowCounter::new();
        let decision = counter.hit(Instant::now(), Quota::per_second(0));
        assert!(!decision.allowed);
    }

    #[test]
    fn test_oversized_window_is_capped() {
        let mut counter = WindowCounter::new();
        let now = Instant::now();
        let quota = Quota::new(1, Duration::from_secs(u64::MAX));

        let decision = counter.hit(now, quota);
        assert!(decision.allowed);
        assert_eq!(decision.reset_after, MAX_WINDOW);

        assert!(!counter.hit(now + Duration::from_secs(86400), quota).allowed);
        assert!(!counter.is_expired(now + Duration::from_secs(86400)));
    }

    #[test]
    fn test_is_expired() {
        let mut counter = WindowCounter::new();
        let start = Instant::now();
        assert!(counter.is_expired(start));

        counter.hit(start, Quota::new(1, Duration::from_secs(2)));
        assert!(!counter.is_expired(start + Duration::from_secs(2)));
        assert!(counter.is_expired(start + Duration::from_secs(3)));
    }
}
