//! ratelimit-guard - Route-level rate limiting for axum
//!
//! This crate provides guards that wrap request handlers and count requests
//! per key in a fixed window. A guard keys its counters by client, by client
//! and header value, or by route, and short-circuits with a rejection response
//! once the window's limit is spent.

pub mod config;
pub mod error;
pub mod http;
pub mod middleware;
pub mod ratelimit;
