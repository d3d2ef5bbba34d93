//! Router assembly from route rules.

use axum::{
    extract::Request,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::error::Result;
use crate::middleware::{self, QuotaHandle, RateLimitLayer};
use crate::ratelimit::{RateLimitStore, RouteRule, RouteRules};

/// A router together with the state its guards hold.
pub struct GuardedRoutes {
    /// The assembled router
    pub router: Router,
    /// Counter stores of every guard, for sweeping
    pub stores: Vec<Arc<dyn RateLimitStore>>,
    /// Quota handles of dynamic routes, by path
    pub quotas: HashMap<String, QuotaHandle>,
}

/// Build a router with one guarded echo route per rule, plus `/health`.
pub fn build_router(rules: &RouteRules) -> Result<GuardedRoutes> {
    let mut router = Router::new().route("/health", get(health_handler));
    let mut stores = Vec::with_capacity(rules.routes.len());
    let mut quotas = HashMap::new();

    for rule in &rules.routes {
        let layer = layer_for(rule)?;

        info!(
            path = %rule.path,
            name = rule.rate_limit.name.as_deref(),
            limit = rule.rate_limit.requests_per_unit,
            header = rule.header.as_ref().map(|h| h.name.as_str()),
            dynamic = rule.dynamic,
            "Guarding route"
        );

        stores.push(layer.store());
        if rule.dynamic {
            quotas.insert(rule.path.clone(), layer.quota_handle());
        }
        router = router.route(&rule.path, get(echo_handler).post(echo_handler).layer(layer));
    }

    Ok(GuardedRoutes {
        router,
        stores,
        quotas,
    })
}

fn layer_for(rule: &RouteRule) -> Result<RateLimitLayer> {
    let quota = rule.rate_limit.quota()?;

    if rule.dynamic {
        let (layer, _) = middleware::dynamic_rate_limit(quota.limit, quota.per.as_secs());
        return Ok(layer);
    }

    match &rule.header {
        Some(header) => Ok(middleware::rate_limit_with_header(
            quota.limit,
            quota.per,
            &header.name,
            header.pattern.as_deref(),
        )?
        .require_not_empty(header.require_not_empty)),
        None => Ok(middleware::rate_limit(quota.limit, quota.per)),
    }
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn echo_handler(req: Request) -> impl IntoResponse {
    Json(json!({
        "path": req.uri().path(),
        "method": req.method().as_str(),
        "client": middleware::client_address(&req),
    }))
}
