//! Rate limit middleware layer.

use axum::{
    extract::Request,
    http::HeaderName,
    response::Response,
};
use futures::future::BoxFuture;
use regex::bytes::Regex;
use std::{
    sync::Arc,
    task::{Context, Poll},
};
use tower::{Layer, Service};
use tracing::{debug_span, warn, Instrument};

use super::client::client_address;
use super::quota::QuotaHandle;
use super::response;
use crate::error::{GuardError, Result};
use crate::ratelimit::{Quota, RateLimitKey, RateLimitStore, RateLimiter};

/// Builds a response for a request the guard turned away.
pub type ResponseHook = Arc<dyn Fn(&Request) -> Response + Send + Sync>;

/// How a guard keys its counters.
#[derive(Debug, Clone)]
pub enum KeyStrategy {
    /// One counter per client address.
    Client,
    /// One counter per client address and header value.
    Header(HeaderGuard),
    /// One counter per request path.
    Route,
}

/// Header requirements for header-keyed guards.
#[derive(Debug, Clone)]
pub struct HeaderGuard {
    name: HeaderName,
    pattern: Option<Regex>,
    require_not_empty: bool,
}

impl HeaderGuard {
    /// Create a header guard.
    ///
    /// `pattern` must match starting at the first byte of the header value;
    /// it does not have to consume the whole value.
    pub fn new(name: &str, pattern: Option<&str>) -> Result<Self> {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|source| {
            GuardError::InvalidHeaderName {
                name: name.to_string(),
                source,
            }
        })?;
        let pattern = pattern
            .map(|p| Regex::new(&format!("^(?:{})", p)))
            .transpose()?;

        Ok(Self {
            name,
            pattern,
            require_not_empty: true,
        })
    }
}

/// Why a header-keyed request never reached the counter.
enum HeaderRejection {
    Missing,
    Mismatch,
}

/// Per-guard state shared by every service the layer produces.
#[derive(Clone)]
struct GuardState {
    store: Arc<dyn RateLimitStore>,
    quota: QuotaHandle,
    strategy: KeyStrategy,
    annotate_allowed: bool,
    on_rejected: Option<ResponseHook>,
    on_header_missing: Option<ResponseHook>,
    on_header_mismatch: Option<ResponseHook>,
}

impl GuardState {
    fn key_for(&self, req: &Request) -> std::result::Result<RateLimitKey, HeaderRejection> {
        match &self.strategy {
            KeyStrategy::Client => Ok(RateLimitKey::client(client_address(req))),
            KeyStrategy::Route => Ok(RateLimitKey::route(req.uri().path())),
            KeyStrategy::Header(guard) => {
                let value = match req.headers().get(&guard.name) {
                    None => return Err(HeaderRejection::Missing),
                    Some(value) if value.is_empty() && guard.require_not_empty => {
                        return Err(HeaderRejection::Missing)
                    }
                    Some(value) => value,
                };

                if let Some(pattern) = &guard.pattern {
                    if !pattern.is_match(value.as_bytes()) {
                        return Err(HeaderRejection::Mismatch);
                    }
                }

                Ok(RateLimitKey::client_header(client_address(req), value.as_bytes()))
            }
        }
    }

    fn header_rejection(&self, rejection: HeaderRejection, req: &Request) -> Response {
        match rejection {
            HeaderRejection::Missing => {
                warn!(path = %req.uri().path(), "Rate limit header missing");
                match (&self.on_header_missing, &self.on_rejected) {
                    (Some(hook), _) | (None, Some(hook)) => hook(req),
                    (None, None) => response::header_missing(),
                }
            }
            HeaderRejection::Mismatch => {
                warn!(path = %req.uri().path(), "Rate limit header does not match pattern");
                match &self.on_header_mismatch {
                    Some(hook) => hook(req),
                    None => response::header_mismatch(),
                }
            }
        }
    }
}

/// Rate limit layer.
///
/// Every service the layer produces shares one counter store, so a layer
/// attached to a route limits that route no matter how often the router
/// clones it. Distinct layers never share counters.
#[derive(Clone)]
pub struct RateLimitLayer {
    state: GuardState,
}

impl RateLimitLayer {
    pub fn new(quota: Quota, strategy: KeyStrategy) -> Self {
        Self {
            state: GuardState {
                store: Arc::new(RateLimiter::new()),
                quota: QuotaHandle::new(quota),
                annotate_allowed: matches!(strategy, KeyStrategy::Client),
                strategy,
                on_rejected: None,
                on_header_missing: None,
                on_header_mismatch: None,
            },
        }
    }

    /// Use a different counter store.
    pub fn with_store(mut self, store: Arc<dyn RateLimitStore>) -> Self {
        self.state.store = store;
        self
    }

    /// Respond to requests over the limit with `hook` instead of the default 429.
    pub fn with_rejection<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Request) -> Response + Send + Sync + 'static,
    {
        self.state.on_rejected = Some(Arc::new(hook));
        self
    }

    /// Respond to requests without the guarded header with `hook`.
    pub fn with_header_missing_response<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Request) -> Response + Send + Sync + 'static,
    {
        self.state.on_header_missing = Some(Arc::new(hook));
        self
    }

    /// Respond to requests whose header fails the pattern with `hook`.
    pub fn with_header_mismatch_response<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Request) -> Response + Send + Sync + 'static,
    {
        self.state.on_header_mismatch = Some(Arc::new(hook));
        self
    }

    /// Whether an empty header value counts as missing. Defaults to `true`.
    ///
    /// Has no effect on guards that are not header keyed.
    pub fn require_not_empty(mut self, require: bool) -> Self {
        if let KeyStrategy::Header(guard) = &mut self.state.strategy {
            guard.require_not_empty = require;
        }
        self
    }

    /// Whether allowed responses carry `X-RateLimit-Remaining` as well as
    /// rejections.
    pub fn annotate_allowed(mut self, annotate: bool) -> Self {
        self.state.annotate_allowed = annotate;
        self
    }

    /// The counter store behind this guard.
    pub fn store(&self) -> Arc<dyn RateLimitStore> {
        self.state.store.clone()
    }

    /// A handle onto the quota this guard enforces.
    pub fn quota_handle(&self) -> QuotaHandle {
        self.state.quota.clone()
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitMiddleware {
            inner,
            state: Arc::new(self.state.clone()),
        }
    }
}

#[derive(Clone)]
pub struct RateLimitMiddleware<S> {
    inner: S,
    state: Arc<GuardState>,
}

impl<S> Service<Request> for RateLimitMiddleware<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, std::result::Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let state = self.state.clone();
        let mut inner = self.inner.clone();
        let span = debug_span!("rate_limit", path = %req.uri().path());

        Box::pin(
            async move {
                let key = match state.key_for(&req) {
                    Ok(key) => key,
                    Err(rejection) => return Ok(state.header_rejection(rejection, &req)),
                };

                let decision = state.store.hit(&key, state.quota.get()).await;

                if !decision.allowed {
                    let mut response = match &state.on_rejected {
                        Some(hook) => hook(&req),
                        None => response::rate_limit_exceeded(),
                    };
                    response::add_remaining_header(&mut response, &decision);
                    response::add_retry_after(&mut response, &decision);
                    return Ok(response);
                }

                let mut response = inner.call(req).await?;
                if state.annotate_allowed {
                    response::add_remaining_header(&mut response, &decision);
                }

                Ok(response)
            }
            .instrument(span),
        )
    }
}
