use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ratelimit_guard::config::GuardConfig;
use ratelimit_guard::http::{build_router, HttpServer};
use ratelimit_guard::ratelimit::RouteRules;

/// Serve rule-configured, rate limited routes.
#[derive(Parser, Debug)]
#[command(name = "ratelimit-guard", version, about)]
struct Args {
    /// Configuration file (YAML, TOML or JSON)
    #[arg(short, long)]
    config: Option<String>,

    /// Route rules file, overriding the configured one
    #[arg(short, long)]
    rules: Option<PathBuf>,

    /// Listen address, overriding the configured one
    #[arg(short, long)]
    addr: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(true)
        .init();

    info!("Starting ratelimit-guard");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();

    let mut config = GuardConfig::load(args.config.as_deref())?;
    if let Some(rules) = args.rules {
        config.rate_limiting.rules_path = Some(rules);
    }
    if let Some(addr) = args.addr {
        config.server.http_addr = addr;
    }
    info!(http_addr = %config.server.http_addr, "Configuration loaded");

    let rules = match &config.rate_limiting.rules_path {
        Some(path) => RouteRules::from_file(path)?,
        None => {
            warn!("No route rules configured, only /health will be served");
            RouteRules::new()
        }
    };

    let routes = build_router(&rules)?;
    info!(routes = rules.routes.len(), "Guards initialized");

    let server = HttpServer::new(config.server.http_addr, routes.router).with_sweeper(
        routes.stores,
        Duration::from_secs(config.rate_limiting.sweep_interval_secs),
    );

    // Run the server with graceful shutdown on Ctrl+C
    server.serve_with_shutdown(shutdown_signal()).await?;

    info!("ratelimit-guard stopped");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
