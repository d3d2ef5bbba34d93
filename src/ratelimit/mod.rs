//! Rate limiting logic and state management.

mod backend;
mod counter;
mod key;
mod limiter;
pub mod rules;

pub use backend::RateLimitStore;
pub use counter::{Decision, Quota, TimeUnit, WindowCounter};
pub use key::RateLimitKey;
pub use limiter::RateLimiter;
pub use rules::{HeaderRule, LimitRule, RouteRule, RouteRules};
