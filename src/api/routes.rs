//--------------------------------------------------------------------------------------------------
// FUNCTIONS
//--------------------------------------------------------------------------------------------------
// | Name                  | Description                            | Return Type         |
// |-----------------------|----------------------------------------|---------------------|
// | submit_order          | Submit and match a new order           | ApiResult<Response> |
// | cancel_order          | Cancel a resting order                 | ApiResult<Response> |
// | get_order_status      | Live view of an order by id            | ApiResult<Response> |
// | get_orderbook         | Aggregated depth for a symbol          | Response            |
// | health                | Health check endpoint                  | Response            |
// | metrics               | Service counters and latencies         | Response            |
//--------------------------------------------------------------------------------------------------

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    AppState, ApiResult, CancelOrderResponse, HealthResponse, MetricsResponse, OrderBookResponse,
    OrderStatusResponse, SubmitOrderRequest, SubmitOrderResponse, TradeInfo,
};
use crate::matcher::EngineError;
use crate::types::OrderStatus;

/// Submit and match a new order.
///
/// Mints the order id, runs the order through the matching engine, and
/// answers 201 for an order resting untouched, 202 for a partial fill, and
/// 200 for a complete fill.
pub async fn submit_order(
    Extension(state): Extension<Arc<AppState>>,
    Json(req): Json<SubmitOrderRequest>,
) -> ApiResult<Response> {
    let order_id = Uuid::new_v4();
    let order = req.into_order(order_id)?;

    info!(
        order_id = %order_id,
        symbol = %order.symbol,
        side = ?order.side,
        order_type = ?order.order_type,
        price = order.price.unwrap_or(0),
        quantity = order.quantity,
        "order submitted"
    );

    state.metrics.record_order_received();
    let start = Instant::now();
    let result = state.matcher.submit(order);
    state.metrics.record_latency(start.elapsed());

    let result = match result {
        Ok(result) => result,
        Err(EngineError::InsufficientLiquidity {
            requested,
            available,
        }) => {
            warn!(
                order_id = %order_id,
                requested,
                available,
                "insufficient liquidity for market order"
            );
            return Err(EngineError::InsufficientLiquidity {
                requested,
                available,
            }
            .into());
        }
        Err(err) => {
            warn!(order_id = %order_id, error = %err, "order rejected");
            return Err(err.into());
        }
    };

    if matches!(result.status, OrderStatus::PartialFill | OrderStatus::Filled) {
        state.metrics.record_order_matched();
    }
    state.metrics.record_trades(result.trades.len() as i64);

    info!(
        order_id = %order_id,
        status = ?result.status,
        filled_quantity = result.filled_quantity,
        remaining_quantity = result.remaining_quantity,
        trades_count = result.trades.len(),
        "order processed"
    );

    let response = SubmitOrderResponse {
        order_id,
        status: result.status,
        message: (result.status == OrderStatus::Accepted)
            .then(|| "Order added to book".to_string()),
        filled_quantity: result.filled_quantity,
        remaining_quantity: result.remaining_quantity,
        trades: result.trades.iter().map(TradeInfo::from).collect(),
    };

    let code = match result.status {
        OrderStatus::Accepted => StatusCode::CREATED,
        OrderStatus::PartialFill => StatusCode::ACCEPTED,
        _ => StatusCode::OK,
    };
    Ok((code, Json(response)).into_response())
}

/// Cancel a resting order by id.
pub async fn cancel_order(
    Extension(state): Extension<Arc<AppState>>,
    Path(order_id): Path<Uuid>,
) -> ApiResult<Response> {
    let order = match state.matcher.cancel(order_id) {
        Ok(order) => order,
        Err(err) => {
            warn!(order_id = %order_id, error = %err, "cancel rejected");
            return Err(err.into());
        }
    };

    state.metrics.record_order_cancelled();
    info!(order_id = %order_id, symbol = %order.symbol, "order cancelled");

    let response = CancelOrderResponse {
        order_id,
        status: OrderStatus::Cancelled,
    };
    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Live view of an order by id.
pub async fn get_order_status(
    Extension(state): Extension<Arc<AppState>>,
    Path(order_id): Path<Uuid>,
) -> ApiResult<Response> {
    let order = state
        .matcher
        .order_status(order_id)
        .ok_or_else(|| EngineError::OrderNotFound(order_id))?;
    Ok((StatusCode::OK, Json(OrderStatusResponse::from(order))).into_response())
}

/// Aggregated depth for a symbol. `depth` defaults to the configured value
/// and is capped at the configured maximum.
pub async fn get_orderbook(
    Extension(state): Extension<Arc<AppState>>,
    Path(symbol): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let depth = params
        .get("depth")
        .and_then(|raw| raw.parse::<usize>().ok())
        .filter(|depth| *depth > 0)
        .unwrap_or(state.snapshot_default_depth)
        .min(state.snapshot_max_depth);

    let snapshot = state.matcher.book_snapshot(&symbol, depth);
    let response = OrderBookResponse::from_snapshot(symbol, snapshot);
    (StatusCode::OK, Json(response)).into_response()
}

/// Health check endpoint. Reachable even in maintenance mode.
pub async fn health(Extension(state): Extension<Arc<AppState>>) -> Response {
    let response = HealthResponse {
        status: "healthy".to_string(),
        uptime_seconds: state.metrics.uptime_seconds(),
        orders_processed: state.matcher.live_orders(),
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// Service counters and latency percentiles.
pub async fn metrics(Extension(state): Extension<Arc<AppState>>) -> Response {
    let percentiles = state.metrics.latency_percentiles();
    let response = MetricsResponse {
        orders_received: state.metrics.orders_received(),
        orders_matched: state.metrics.orders_matched(),
        orders_cancelled: state.metrics.orders_cancelled(),
        orders_in_book: state.matcher.live_orders(),
        trades_executed: state.metrics.trades_executed(),
        latency_p50_ms: percentiles.p50,
        latency_p99_ms: percentiles.p99,
        latency_p999_ms: percentiles.p999,
        throughput_orders_per_sec: state.metrics.throughput(),
    };
    (StatusCode::OK, Json(response)).into_response()
}
