//! Client address extraction.

use axum::extract::{ConnectInfo, Request};
use std::net::SocketAddr;

/// Rendered address used when nothing identifies the client.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Work out which client sent `req`.
///
/// The socket address recorded by the server wins. Without it, the first
/// `X-Forwarded-For` entry is used, then `X-Real-IP`.
pub fn client_address(req: &Request) -> String {
    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    req.headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .or_else(|| {
            req.headers()
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        })
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}
