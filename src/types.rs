//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module defines the core data types used throughout the matching engine:
// orders, trades, and the enums describing their side, type, and lifecycle status.
//
// | Section            | Description                                                      |
// |--------------------|------------------------------------------------------------------|
// | ENUMS              | Discrete sets of values (Side, OrderType, OrderStatus).          |
// | STRUCTS            | The Order and Trade records.                                     |
// | TESTS              | Unit tests for the defined types.                                |
//--------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

//--------------------------------------------------------------------------------------------------
//  ENUMS
//--------------------------------------------------------------------------------------------------
// | Name          | Description                                 |
// |---------------|---------------------------------------------|
// | Side          | Side of an order (Buy/Sell).                |
// | OrderType     | Execution type of an order (Limit/Market).  |
// | OrderStatus   | Lifecycle status of an order.               |
//--------------------------------------------------------------------------------------------------

/// Represents the side of an order (Buy or Sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    /// A buy order; rests on the bid side of the book.
    Buy,
    /// A sell order; rests on the ask side of the book.
    Sell,
}

impl Side {
    /// The side an order of this side matches against.
    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

/// Represents the type of an order, which determines its matching behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    /// Executes at the limit price or better; any residual rests in the book.
    Limit,
    /// Executes immediately against resting liquidity at any price, or is
    /// rejected outright when the opposing side cannot cover the quantity.
    Market,
}

/// Represents the lifecycle status of an order within the matching engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Admitted to the book with no fills yet.
    Accepted,
    /// Some quantity has traded; a residual remains live.
    PartialFill,
    /// The full quantity has traded. Terminal.
    Filled,
    /// Removed from the book before filling completely. Terminal.
    Cancelled,
}

//--------------------------------------------------------------------------------------------------
//  STRUCTS
//--------------------------------------------------------------------------------------------------
// | Name          | Description                                   |
// |---------------|-----------------------------------------------|
// | Order         | A trading order with its live fill state.     |
// | Trade         | An execution between two orders.              |
//--------------------------------------------------------------------------------------------------

/// A trading order. The header fields (`id`, `symbol`, `side`, `order_type`,
/// `price`, `quantity`, `created_at`) are immutable after creation; only
/// `filled_quantity`, `status`, and the book-assigned `sequence` change.
///
/// Prices are integers in the instrument's minimum tick (cents). Market
/// orders carry no price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Unique identifier, minted by the caller.
    pub id: Uuid,
    /// Instrument key. Opaque to the engine.
    pub symbol: String,
    /// Side of the order (Buy or Sell).
    pub side: Side,
    /// Type of the order (Limit or Market).
    pub order_type: OrderType,
    /// Limit price in ticks. `None` for Market orders.
    pub price: Option<i64>,
    /// Original quantity. Strictly positive on admission.
    pub quantity: i64,
    /// Quantity traded so far. Never decreases, never exceeds `quantity`.
    pub filled_quantity: i64,
    /// Current lifecycle status.
    pub status: OrderStatus,
    /// Admission sequence assigned by the book; the tie-break for time
    /// priority within a price level.
    pub sequence: u64,
    /// Wall-clock creation time. Informational only.
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Creates a new order in `Accepted` state with nothing filled.
    pub fn new(
        id: Uuid,
        symbol: impl Into<String>,
        side: Side,
        order_type: OrderType,
        price: Option<i64>,
        quantity: i64,
    ) -> Self {
        Self {
            id,
            symbol: symbol.into(),
            side,
            order_type,
            price,
            quantity,
            filled_quantity: 0,
            status: OrderStatus::Accepted,
            sequence: 0,
            created_at: Utc::now(),
        }
    }

    /// Quantity still available to trade.
    #[inline]
    pub fn remaining(&self) -> i64 {
        self.quantity - self.filled_quantity
    }

    /// True once the full quantity has traded.
    #[inline]
    pub fn is_filled(&self) -> bool {
        self.filled_quantity >= self.quantity
    }

    /// True for the terminal statuses (`Filled`, `Cancelled`).
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, OrderStatus::Filled | OrderStatus::Cancelled)
    }

    /// Records `qty` traded against this order and advances the status to
    /// `PartialFill` or `Filled` accordingly. Callers guarantee
    /// `0 < qty <= self.remaining()`; all fills happen under the owning
    /// book's write lock.
    pub fn fill(&mut self, qty: i64) {
        debug_assert!(qty > 0 && qty <= self.remaining());
        self.filled_quantity += qty;
        self.status = if self.is_filled() {
            OrderStatus::Filled
        } else {
            OrderStatus::PartialFill
        };
    }
}

/// An execution between a buy order and a sell order. Immutable once minted.
///
/// The price is always the resting order's limit price: the incoming order
/// crosses, the resting order sets the print.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Unique identifier for the trade, minted by the engine.
    pub trade_id: Uuid,
    /// Execution price in ticks.
    pub price: i64,
    /// Quantity exchanged.
    pub quantity: i64,
    /// Wall-clock time of the execution.
    pub timestamp: DateTime<Utc>,
    /// The buy-side order of this execution.
    pub buy_order_id: Uuid,
    /// The sell-side order of this execution.
    pub sell_order_id: Uuid,
}

impl Trade {
    /// Mints a trade record for an execution.
    pub fn new(price: i64, quantity: i64, buy_order_id: Uuid, sell_order_id: Uuid) -> Self {
        Self {
            trade_id: Uuid::new_v4(),
            price,
            quantity,
            timestamp: Utc::now(),
            buy_order_id,
            sell_order_id,
        }
    }
}

//--------------------------------------------------------------------------------------------------
//  TESTS
//--------------------------------------------------------------------------------------------------
// | Name                        | Description                                      |
// |-----------------------------|--------------------------------------------------|
// | test_order_creation         | Verify basic Order instantiation.                |
// | test_fill_progression       | Fill accounting and status transitions.          |
// | test_trade_creation         | Verify basic Trade instantiation.                |
// | test_serde_wire_names       | Enum wire names match the external protocol.     |
//--------------------------------------------------------------------------------------------------
