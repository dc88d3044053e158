//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Entry point for the matching engine service: initializes logging, loads
// configuration, and serves the HTTP API until a shutdown signal arrives.
//--------------------------------------------------------------------------------------------------

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use match_engine::{Api, AppState, Config};

fn init_logging(config: &Config) {
    let filter =
        EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    if config.log_format == "pretty" {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();
    init_logging(&config);

    info!("initializing order matching engine");

    let state = Arc::new(AppState::new(&config));
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let api = Api::new(addr, state);

    info!(port = config.port, "order matching engine started");
    info!(
        endpoints = ?[
            "POST   /api/v1/orders",
            "DELETE /api/v1/orders/:id",
            "GET    /api/v1/orders/:id",
            "GET    /api/v1/orderbook/:symbol",
            "GET    /health",
            "GET    /metrics",
        ],
        "api endpoints registered"
    );

    api.serve().await
}
