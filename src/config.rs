//! Configuration management for the guard server.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::{GuardError, Result};

/// Prefix of environment variables that override file settings.
///
/// Nested keys are separated by `__`, e.g. `RATELIMIT_GUARD__SERVER__HTTP_ADDR`.
pub const ENV_PREFIX: &str = "RATELIMIT_GUARD";

/// Main configuration for the guard server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limiting: RateLimitingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server address
    #[serde(default = "default_http_addr")]
    pub http_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
        }
    }
}

fn default_http_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    /// Path to the route rules file
    #[serde(default)]
    pub rules_path: Option<PathBuf>,

    /// Interval between expired-counter sweeps in seconds
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            rules_path: None,
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

fn default_sweep_interval() -> u64 {
    60
}

impl GuardConfig {
    /// Load configuration from an optional file, overridden by environment
    /// variables.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        }

        builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| GuardError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GuardConfig::default();
        assert_eq!(config.server.http_addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.rate_limiting.sweep_interval_secs, 60);
        assert!(config.rate_limiting.rules_path.is_none());
    }

    fn write_config(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("ratelimit-guard-{}-{}.yaml", name, std::process::id()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let path = write_config(
            "partial",
            r#"
rate_limiting:
  rules_path: /etc/guard/routes.yaml
"#,
        );

        let config = GuardConfig::load(path.to_str()).unwrap();

        assert_eq!(
            config.rate_limiting.rules_path,
            Some(PathBuf::from("/etc/guard/routes.yaml"))
        );
        assert_eq!(config.rate_limiting.sweep_interval_secs, 60);
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let path = write_config("invalid", "rate_limiting: { sweep_interval_secs: often }");

        let result = GuardConfig::load(path.to_str());

        assert!(matches!(result, Err(GuardError::Config(_))));
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let result = GuardConfig::load(Some("/nonexistent/ratelimit-guard.yaml"));
        assert!(matches!(result, Err(GuardError::Config(_))));
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = GuardConfig::load(None).unwrap();
        assert_eq!(config.rate_limiting.sweep_interval_secs, 60);
    }

    // Only this test sets the address variable, so the others never assert on it.
    #[test]
    fn test_environment_overrides_file() {
        let path = write_config(
            "env",
            r#"
server:
  http_addr: 127.0.0.1:7000
"#,
        );
        std::env::set_var("RATELIMIT_GUARD__SERVER__HTTP_ADDR", "0.0.0.0:9999");

        let config = GuardConfig::load(path.to_str()).unwrap();

        std::env::remove_var("RATELIMIT_GUARD__SERVER__HTTP_ADDR");
        std::fs::remove_file(path).unwrap();
        assert_eq!(config.server.http_addr, "0.0.0.0:9999".parse().unwrap());
    }
}
