//! Route rate limit rules configuration.
//!
//! This module handles loading route rules from YAML. Each rule names a path,
//! the quota guarding it, and which guard flavour keys its counters.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use super::counter::{Quota, TimeUnit};
use crate::error::{GuardError, Result};

/// A complete set of route rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteRules {
    /// Guarded routes, in declaration order
    #[serde(default)]
    pub routes: Vec<RouteRule>,
}

/// Configuration for a single guarded route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteRule {
    /// The exact request path
    pub path: String,
    /// Quota applied to the route
    pub rate_limit: LimitRule,
    /// Key counters by client and header value instead of client alone
    #[serde(default)]
    pub header: Option<HeaderRule>,
    /// Key counters by route and allow the quota to change at runtime
    #[serde(default)]
    pub dynamic: bool,
}

/// A rate limit rule specifying the limit and window.
///
/// The window is either a named `unit` or an explicit `per_seconds`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitRule {
    /// Number of requests allowed per window
    pub requests_per_unit: u64,
    /// The time unit
    #[serde(default)]
    pub unit: Option<TimeUnit>,
    /// Window length in seconds
    #[serde(default)]
    pub per_seconds: Option<u64>,
    /// Optional name/description for this limit
    #[serde(default)]
    pub name: Option<String>,
}

/// Header requirements for header-keyed routes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderRule {
    /// Header whose value keys the counter
    pub name: String,
    /// Pattern the value must match from its first byte
    #[serde(default)]
    pub pattern: Option<String>,
    /// Treat an empty header value as missing
    #[serde(default = "default_require_not_empty")]
    pub require_not_empty: bool,
}

fn default_require_not_empty() -> bool {
    true
}

impl LimitRule {
    /// Resolve the rule into a quota.
    pub fn quota(&self) -> Result<Quota> {
        let per = match (self.unit, self.per_seconds) {
            (Some(unit), None) => unit.duration(),
            (None, Some(0)) => {
                return Err(GuardError::Config("per_seconds must be greater than zero".into()))
            }
            (None, Some(secs)) => Duration::from_secs(secs),
            (Some(_), Some(_)) => {
                return Err(GuardError::Config(
                    "rate_limit takes either unit or per_seconds, not both".into(),
                ))
            }
            (None, None) => {
                return Err(GuardError::Config(
                    "rate_limit requires unit or per_seconds".into(),
                ))
            }
        };
        Ok(Quota::new(self.requests_per_unit, per))
    }
}

impl RouteRules {
    /// Create an empty rule set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load rules from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading route rules");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load rules from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let rules: RouteRules = serde_yaml::from_str(yaml)
            .map_err(|e| GuardError::Config(format!("Failed to parse route rules: {}", e)))?;
        rules.validate()?;
        Ok(rules)
    }

    /// Check that every rule can be turned into a guard.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();

        for route in &self.routes {
            if !route.path.starts_with('/') {
                return Err(GuardError::Config(format!(
                    "route path {:?} must start with '/'",
                    route.path
                )));
            }
            if !seen.insert(route.path.as_str()) {
                return Err(GuardError::Config(format!(
                    "route {} is declared more than once",
                    route.path
                )));
            }

            route.rate_limit.quota()?;

            if let Some(header) = &route.header {
                if route.dynamic {
                    return Err(GuardError::Config(format!(
                        "route {} cannot be both dynamic and header keyed",
                        route.path
                    )));
                }
                axum::http::HeaderName::from_bytes(header.name.as_bytes()).map_err(|source| {
                    GuardError::InvalidHeaderName {
                        name: header.name.clone(),
                        source,
                    }
                })?;
                if let Some(pattern) = &header.pattern {
                    regex::bytes::Regex::new(pattern)?;
                }
            }
        }

        Ok(())
    }

    /// Find the rule for an exact path.
    pub fn find(&self, path: &str) -> Option<&RouteRule> {
        self.routes.iter().find(|route| route.path == path)
    }
}
