//! HTTP server that serves rule-configured guarded routes.

mod routes;
mod server;

pub use routes::{build_router, GuardedRoutes};
pub use server::HttpServer;
