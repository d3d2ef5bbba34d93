//! HTTP server implementation.

use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::error::{GuardError, Result};
use crate::ratelimit::RateLimitStore;

/// HTTP server for guarded routes.
pub struct HttpServer {
    /// Address to bind to
    addr: SocketAddr,
    /// The guarded router
    router: Router,
    /// Counter stores to sweep
    stores: Vec<Arc<dyn RateLimitStore>>,
    /// How often expired counters are swept
    sweep_interval: Duration,
}

impl HttpServer {
    /// Create a new HTTP server.
    pub fn new(addr: SocketAddr, router: Router) -> Self {
        Self {
            addr,
            router,
            stores: Vec::new(),
            sweep_interval: Duration::from_secs(60),
        }
    }

    /// Sweep expired counters out of `stores` every `interval` while serving.
    pub fn with_sweeper(mut self, stores: Vec<Arc<dyn RateLimitStore>>, interval: Duration) -> Self {
        self.stores = stores;
        self.sweep_interval = interval;
        self
    }

    /// Start the HTTP server with graceful shutdown.
    ///
    /// The server will shut down when the provided signal resolves.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        info!(addr = %local_addr, "Starting HTTP server with graceful shutdown");

        let (stop_tx, stop_rx) = watch::channel(false);
        let sweeper = tokio::spawn(run_sweeper(self.stores, self.sweep_interval, stop_rx));

        let result = axum::serve(
            listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(signal)
        .await
        .map_err(|e| {
            error!(error = %e, "HTTP server failed");
            GuardError::Io(e)
        });

        let _ = stop_tx.send(true);
        if let Err(e) = sweeper.await {
            error!(error = %e, "Counter sweeper task failed");
        }

        result
    }
}

/// Periodically evict expired counters until `stop` flips.
async fn run_sweeper(
    stores: Vec<Arc<dyn RateLimitStore>>,
    interval: Duration,
    mut stop: watch::Receiver<bool>,
) {
    if stores.is_empty() || interval.is_zero() {
        return;
    }

    let mut ticker = tokio::time::interval(interval);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let mut evicted = 0;
                for store in &stores {
                    evicted += store.sweep().await;
                }
                debug!(evicted, stores = stores.len(), "Swept expired counters");
            }
            _ = stop.changed() => break,
        }
    }

    debug!("Counter sweeper stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::{Quota, RateLimitKey, RateLimiter};

    #[test]
    fn test_server_creation() {
        let addr: SocketAddr = "127.0.0.1:8080".parse().unwrap();
        let _server = HttpServer::new(addr, Router::new());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_evicts_expired_counters() {
        let limiter = Arc::new(RateLimiter::new());
        limiter.check(&RateLimitKey::client("a"), Quota::new(1, Duration::from_secs(1)));

        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(run_sweeper(
            vec![limiter.clone() as Arc<dyn RateLimitStore>],
            Duration::from_secs(5),
            stop_rx,
        ));

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(limiter.counter_count(), 0);

        stop_tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_serve_until_shutdown() {
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let server = HttpServer::new(addr, Router::new());

        let result = server.serve_with_shutdown(async {}).await;
        assert!(result.is_ok());
    }
}
