//! Rate limit guards for axum routes.
//!
//! Each guard is a [`tower::Layer`]. Attach it to a single route with
//! `get(handler).layer(..)` or to a whole router with `Router::route_layer`:
//!
//! ```no_run
//! use axum::{routing::get, Router};
//! use ratelimit_guard::middleware::{rate_limit, rate_limit_with_header};
//! use std::time::Duration;
//!
//! # fn build() -> ratelimit_guard::error::Result<Router> {
//! let app = Router::new()
//!     .route("/items", get(|| async { "items" }).layer(rate_limit(10, Duration::from_secs(60))))
//!     .route(
//!         "/tenant",
//!         get(|| async { "tenant" })
//!             .layer(rate_limit_with_header(5, Duration::from_secs(30), "x-api-key", Some("[a-z0-9]+"))?),
//!     );
//! # Ok(app)
//! # }
//! ```

mod client;
mod layer;
mod quota;
pub mod response;

use std::time::Duration;

pub use client::{client_address, UNKNOWN_CLIENT};
pub use layer::{HeaderGuard, KeyStrategy, RateLimitLayer, RateLimitMiddleware, ResponseHook};
pub use quota::QuotaHandle;

use crate::error::Result;
use crate::ratelimit::Quota;

/// Limit each client to `limit` requests every `per`.
///
/// Every response, allowed or rejected, carries `X-RateLimit-Remaining` with
/// the whole seconds left in the client's window.
pub fn rate_limit(limit: u64, per: Duration) -> RateLimitLayer {
    RateLimitLayer::new(Quota::new(limit, per), KeyStrategy::Client)
}

/// Limit each client and `header_name` value pair to `limit` requests every `per`.
///
/// Requests without the header are turned away with 400 before any counting,
/// as are requests whose value does not match `header_value_pattern` from its
/// first byte. Only rejections carry `X-RateLimit-Remaining`.
pub fn rate_limit_with_header(
    limit: u64,
    per: Duration,
    header_name: &str,
    header_value_pattern: Option<&str>,
) -> Result<RateLimitLayer> {
    let guard = HeaderGuard::new(header_name, header_value_pattern)?;
    Ok(RateLimitLayer::new(Quota::new(limit, per), KeyStrategy::Header(guard)))
}

/// Limit a route to `max_requests` every `per_seconds`, shared by all clients.
///
/// The returned handle changes the quota while the guard is serving.
pub fn dynamic_rate_limit(max_requests: u64, per_seconds: u64) -> (RateLimitLayer, QuotaHandle) {
    let layer = RateLimitLayer::new(
        Quota::new(max_requests, Duration::from_secs(per_seconds)),
        KeyStrategy::Route,
    );
    let handle = layer.quota_handle();
    (layer, handle)
}
