//--------------------------------------------------------------------------------------------------
// STRUCTS
//--------------------------------------------------------------------------------------------------
// | Name                 | Description                               | Key Methods         |
// |----------------------|-------------------------------------------|---------------------|
// | SubmitOrderRequest   | Request to submit an order                | into_order          |
// | SubmitOrderResponse  | Submission outcome with executed trades   | -                   |
// | OrderStatusResponse  | Live view of a resting order              | from                |
// | OrderBookResponse    | Aggregated depth view of one book         | from_snapshot       |
// | MetricsResponse      | Service counters and latency percentiles  | -                   |
//--------------------------------------------------------------------------------------------------

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::orderbook::{BookLevel, BookSnapshot};
use crate::types::{Order, OrderStatus, OrderType, Side, Trade};

/// Request body for order submission. Side and type arrive as wire strings
/// and are mapped to the engine enums with explicit error messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitOrderRequest {
    /// Instrument key.
    pub symbol: String,
    /// "BUY" or "SELL".
    pub side: String,
    /// "LIMIT" or "MARKET".
    #[serde(rename = "type")]
    pub order_type: String,
    /// Price in ticks. Required for LIMIT, absent or zero for MARKET.
    #[serde(default)]
    pub price: i64,
    /// Quantity to trade.
    pub quantity: i64,
}

impl SubmitOrderRequest {
    /// Converts the request into an engine order carrying `id`.
    pub fn into_order(self, id: Uuid) -> Result<Order, ApiError> {
        let side = match self.side.as_str() {
            "BUY" => Side::Buy,
            "SELL" => Side::Sell,
            _ => {
                return Err(ApiError::BadRequest(
                    "Invalid order: side must be BUY or SELL".to_string(),
                ));
            }
        };
        let order_type = match self.order_type.as_str() {
            "LIMIT" => OrderType::Limit,
            "MARKET" => OrderType::Market,
            _ => {
                return Err(ApiError::BadRequest(
                    "Invalid order: type must be LIMIT or MARKET".to_string(),
                ));
            }
        };
        // zero means "no price"; the engine validates the rest
        let price = if self.price == 0 { None } else { Some(self.price) };

        Ok(Order::new(id, self.symbol, side, order_type, price, self.quantity))
    }
}

/// One executed trade in a submission response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeInfo {
    pub trade_id: Uuid,
    /// Print price in ticks.
    pub price: i64,
    pub quantity: i64,
    /// Unix timestamp in milliseconds.
    pub timestamp: i64,
}

impl From<&Trade> for TradeInfo {
    fn from(trade: &Trade) -> Self {
        Self {
            trade_id: trade.trade_id,
            price: trade.price,
            quantity: trade.quantity,
            timestamp: trade.timestamp.timestamp_millis(),
        }
    }
}

/// Response body for order submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitOrderResponse {
    pub order_id: Uuid,
    pub status: OrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub filled_quantity: i64,
    pub remaining_quantity: i64,
    pub trades: Vec<TradeInfo>,
}

/// Response body for order cancellation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelOrderResponse {
    pub order_id: Uuid,
    pub status: OrderStatus,
}

/// Live view of an order returned by the status endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStatusResponse {
    pub order_id: Uuid,
    pub symbol: String,
    pub side: Side,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    /// Price in ticks; 0 for market orders.
    pub price: i64,
    pub quantity: i64,
    pub filled_quantity: i64,
    pub status: OrderStatus,
    /// Creation time as unix milliseconds.
    pub timestamp: i64,
}

impl From<Order> for OrderStatusResponse {
    fn from(order: Order) -> Self {
        Self {
            order_id: order.id,
            symbol: order.symbol,
            side: order.side,
            order_type: order.order_type,
            price: order.price.unwrap_or(0),
            quantity: order.quantity,
            filled_quantity: order.filled_quantity,
            status: order.status,
            timestamp: order.created_at.timestamp_millis(),
        }
    }
}

/// One aggregated price level of a depth response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceLevelInfo {
    /// Price in ticks.
    pub price: i64,
    /// Aggregated remaining quantity at this price.
    pub quantity: i64,
}

impl From<BookLevel> for PriceLevelInfo {
    fn from(level: BookLevel) -> Self {
        Self {
            price: level.price,
            quantity: level.quantity,
        }
    }
}

/// Depth view of one book: bids descending, asks ascending.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBookResponse {
    pub symbol: String,
    /// Snapshot time as unix milliseconds.
    pub timestamp: i64,
    pub bids: Vec<PriceLevelInfo>,
    pub asks: Vec<PriceLevelInfo>,
}

impl OrderBookResponse {
    pub fn from_snapshot(symbol: String, snapshot: BookSnapshot) -> Self {
        Self {
            symbol,
            timestamp: Utc::now().timestamp_millis(),
            bids: snapshot.bids.into_iter().map(PriceLevelInfo::from).collect(),
            asks: snapshot.asks.into_iter().map(PriceLevelInfo::from).collect(),
        }
    }
}

/// Body of the health endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_seconds: i64,
    pub orders_processed: i64,
}

/// Body of the metrics endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsResponse {
    pub orders_received: i64,
    pub orders_matched: i64,
    pub orders_cancelled: i64,
    pub orders_in_book: i64,
    pub trades_executed: i64,
    pub latency_p50_ms: f64,
    pub latency_p99_ms: f64,
    pub latency_p999_ms: f64,
    pub throughput_orders_per_sec: f64,
}

/// Uniform error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
