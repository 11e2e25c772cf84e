//! Dashboard API server
//!
//! Serves the seed snapshot for the dashboard client plus its demo fallback.
//! Run with: cargo run --bin dashboard_api
//!
//! Endpoints:
//!   GET /dashboard  - seed snapshot as JSON
//!   GET /health     - liveness and uptime
//!   GET /<file>     - static files (data.json fallback snapshot)

use anyhow::{Context, Result};
use std::net::TcpListener;

use opsdash::config::ServerConfig;
use opsdash::server::ApiServer;

fn main() -> Result<()> {
    let cfg = ServerConfig::from_env();
    let listener = TcpListener::bind(cfg.bind_addr())
        .with_context(|| format!("failed to bind {}", cfg.bind_addr()))?;

    println!("Dashboard API running at http://localhost:{}", cfg.port);
    ApiServer::from_config(&cfg).serve(listener)
}
