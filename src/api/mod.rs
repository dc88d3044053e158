//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module implements the REST API wrapping the matching engine, using Axum.
// It provides endpoints for order management, book snapshots, and system status.
//
// | Component      | Description                                                |
// |----------------|------------------------------------------------------------|
// | AppState       | Shared state: matcher, metrics, middleware handles         |
// | Api            | Router assembly and the serve loop                         |
// | Routes         | Handler functions for the endpoints                        |
// | DTOs           | Request/response bodies                                    |
//--------------------------------------------------------------------------------------------------

mod dto;
mod error;
mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post},
    Extension, Router,
};
use tokio::net::TcpListener;
use tracing::info;

use crate::config::Config;
use crate::matcher::Matcher;
use crate::metrics::EngineMetrics;
use crate::middleware::{
    availability_gate, rate_limit, request_logger, RateLimiter, ServiceAvailability,
};

pub use dto::*;
pub use error::{ApiError, ApiResult};

/// Shared application state accessible by every handler.
pub struct AppState {
    /// The matching engine.
    pub matcher: Arc<Matcher>,
    /// Service counters and latency tracking.
    pub metrics: Arc<EngineMetrics>,
    /// Maintenance / overload gate.
    pub availability: Arc<ServiceAvailability>,
    /// Per-client rate limiter; absent when disabled by configuration.
    pub rate_limiter: Option<Arc<RateLimiter>>,
    /// Snapshot depth when the caller does not ask for one.
    pub snapshot_default_depth: usize,
    /// Hard cap on caller-requested snapshot depth.
    pub snapshot_max_depth: usize,
}

impl AppState {
    /// Builds the application state from configuration.
    pub fn new(config: &Config) -> Self {
        let rate_limiter = if config.rate_limit_disabled {
            None
        } else {
            Some(Arc::new(RateLimiter::new(
                config.rate_limit_max,
                config.rate_limit_window,
            )))
        };

        Self {
            matcher: Arc::new(Matcher::new()),
            metrics: Arc::new(EngineMetrics::new(config.metrics_max_latencies)),
            availability: Arc::new(ServiceAvailability::new(
                config.maintenance_mode,
                config.max_concurrent_requests,
            )),
            rate_limiter,
            snapshot_default_depth: config.orderbook_default_depth,
            snapshot_max_depth: config.orderbook_max_depth,
        }
    }
}

/// The HTTP server for the matching engine.
pub struct Api {
    addr: SocketAddr,
    state: Arc<AppState>,
}

impl Api {
    /// Creates a server bound to `addr` over the given state.
    pub fn new(addr: SocketAddr, state: Arc<AppState>) -> Self {
        Self { addr, state }
    }

    /// Assembles the router. The availability gate is outermost so rejected
    /// requests never reach the logger or the handlers; the rate limiter
    /// applies to the /api/v1 group only.
    pub fn routes(&self) -> Router {
        let mut api = Router::new()
            .route("/orders", post(routes::submit_order))
            .route(
                "/orders/:id",
                delete(routes::cancel_order).get(routes::get_order_status),
            )
            .route("/orderbook/:symbol", get(routes::get_orderbook));

        if let Some(limiter) = &self.state.rate_limiter {
            api = api.layer(from_fn_with_state(Arc::clone(limiter), rate_limit));
        }

        Router::new()
            .nest("/api/v1", api)
            .route("/health", get(routes::health))
            .route("/metrics", get(routes::metrics))
            .layer(Extension(Arc::clone(&self.state)))
            .layer(from_fn(request_logger))
            .layer(from_fn_with_state(
                Arc::clone(&self.state.availability),
                availability_gate,
            ))
    }

    /// Serves the API until a shutdown signal arrives. Connections are
    /// served with their peer address attached so the rate limiter can
    /// identify direct clients that arrive without proxy headers.
    pub async fn serve(self) -> Result<(), Box<dyn std::error::Error>> {
        let app = self.routes();
        let listener = TcpListener::bind(self.addr).await?;
        info!(addr = %self.addr, "api listening");

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        info!("shutdown complete");
        Ok(())
    }
}

/// Resolves when SIGINT or SIGTERM arrives.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install ctrl-c handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => tracing::error!(error = %err, "failed to install sigterm handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("received shutdown signal, shutting down");
}
