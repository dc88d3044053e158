//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module implements a limit order book for a single trading instrument.
// It maintains bid and ask orders in price-time priority (FIFO) order.
//
// | Component     | Description                                                               |
// |---------------|---------------------------------------------------------------------------|
// | OrderBook     | Main order book structure managing bids and asks                          |
// | PriceLevel    | Groups orders resting at the same price                                   |
// | BookSnapshot  | Aggregated depth view of both sides                                       |
//
// Both sides are ascending BTreeMaps; the bid side is iterated in reverse so
// the highest price comes first. An id index maps each live order to its
// (side, price) location for cheap cancellation and lookup.
//--------------------------------------------------------------------------------------------------

use std::collections::{BTreeMap, HashMap, VecDeque};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::types::{Order, Side};

/// Errors raised by order book mutations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderBookError {
    /// An order with this id is already indexed in the book.
    #[error("order {0} is already in the book")]
    DuplicateOrder(Uuid),

    /// Market orders have no price and cannot rest in the book.
    #[error("order {0} has no limit price")]
    MissingPrice(Uuid),

    /// Orders with nothing left to trade cannot rest in the book.
    #[error("order {0} has no remaining quantity")]
    NothingToRest(Uuid),
}

/// A price level: all live orders at one price on one side, in FIFO order.
#[derive(Debug, Clone)]
pub struct PriceLevel {
    /// The price for this level.
    pub price: i64,
    /// FIFO queue of orders at this price. Front of the queue has time priority.
    pub orders: VecDeque<Order>,
}

impl PriceLevel {
    fn new(price: i64) -> Self {
        Self {
            price,
            orders: VecDeque::with_capacity(4),
        }
    }

    /// True if no orders rest at this level. An empty level is removed from
    /// its side's index together with the removal of its last order, so a
    /// level reachable through the book is never empty.
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Number of orders at this level.
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    /// Sum of the remaining quantity of every order at this level.
    /// Computed on demand; the level carries no cached total.
    pub fn aggregate_quantity(&self) -> i64 {
        self.orders.iter().map(|o| o.remaining()).sum()
    }
}

/// One aggregated level of a depth snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookLevel {
    /// The price of the level in ticks.
    pub price: i64,
    /// Total remaining quantity across the level's queue.
    pub quantity: i64,
}

/// A point-in-time aggregated view of the book: up to `depth` levels per
/// side, bids descending and asks ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSnapshot {
    /// Bid levels, best (highest) first.
    pub bids: Vec<BookLevel>,
    /// Ask levels, best (lowest) first.
    pub asks: Vec<BookLevel>,
}

/// A single-instrument order book with price-time priority.
///
/// The book is a plain value; the matcher reaches it through one
/// reader-writer lock, and every mutation below assumes exclusive access.
#[derive(Debug)]
pub struct OrderBook {
    symbol: String,
    /// Bid levels keyed by price ascending; iterated in reverse for best-first.
    pub(crate) bids: BTreeMap<i64, PriceLevel>,
    /// Ask levels keyed by price ascending.
    pub(crate) asks: BTreeMap<i64, PriceLevel>,
    /// Order id -> (side, price) of the level holding it.
    pub(crate) index: HashMap<Uuid, (Side, i64)>,
    /// Admission counter; stamps each resting order for time priority.
    next_sequence: u64,
}

impl OrderBook {
    /// Creates an empty book for `symbol`.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            index: HashMap::new(),
            next_sequence: 1,
        }
    }

    /// The instrument this book manages.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Number of live orders in the book.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// True if no orders rest in the book.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// True if an order with this id is currently indexed.
    pub fn contains(&self, id: Uuid) -> bool {
        self.index.contains_key(&id)
    }

    /// Adds `order` at the tail of the queue for its `(side, price)`,
    /// creating the level if absent, and stamps its admission sequence.
    ///
    /// Fails without mutation when the id is already indexed, when the
    /// order carries no price, or when it has nothing left to trade.
    pub fn add(&mut self, mut order: Order) -> Result<(), OrderBookError> {
        let price = order.price.ok_or(OrderBookError::MissingPrice(order.id))?;
        if order.remaining() <= 0 {
            return Err(OrderBookError::NothingToRest(order.id));
        }
        if self.index.contains_key(&order.id) {
            return Err(OrderBookError::DuplicateOrder(order.id));
        }

        order.sequence = self.next_sequence;
        self.next_sequence += 1;

        self.index.insert(order.id, (order.side, price));
        let tree = match order.side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        tree.entry(price)
            .or_insert_with(|| PriceLevel::new(price))
            .orders
            .push_back(order);
        Ok(())
    }

    /// Unlinks the order with this id from its queue and the index,
    /// dropping the price level if it empties. Returns the removed order,
    /// or `None` when the id is unknown.
    pub fn remove(&mut self, id: Uuid) -> Option<Order> {
        let (side, price) = self.index.remove(&id)?;
        let tree = match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        let level = match tree.get_mut(&price) {
            Some(level) => level,
            None => {
                debug_assert!(false, "indexed order {id} has no price level");
                return None;
            }
        };
        let pos = level.orders.iter().position(|o| o.id == id);
        debug_assert!(pos.is_some(), "indexed order {id} missing from its queue");
        let order = pos.and_then(|p| level.orders.remove(p));
        if level.orders.is_empty() {
            tree.remove(&price);
        }
        order
    }

    /// Looks up a live order by id, including its current fill state.
    pub fn get(&self, id: Uuid) -> Option<&Order> {
        let (side, price) = self.index.get(&id)?;
        let tree = match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        };
        tree.get(price)
            .and_then(|level| level.orders.iter().find(|o| o.id == id))
    }

    /// Best resting price on `side`: the highest bid or the lowest ask.
    pub fn best_price(&self, side: Side) -> Option<i64> {
        match side {
            Side::Buy => self.bids.keys().next_back().copied(),
            Side::Sell => self.asks.keys().next().copied(),
        }
    }

    /// Top-of-book for the bid side as `(price, aggregate_quantity)`.
    pub fn best_bid(&self) -> Option<(i64, i64)> {
        self.bids
            .iter()
            .next_back()
            .map(|(price, level)| (*price, level.aggregate_quantity()))
    }

    /// Top-of-book for the ask side as `(price, aggregate_quantity)`.
    pub fn best_ask(&self) -> Option<(i64, i64)> {
        self.asks
            .iter()
            .next()
            .map(|(price, level)| (*price, level.aggregate_quantity()))
    }

    /// Total remaining quantity across every level of `side`. Used for the
    /// market-order liquidity pre-check.
    pub fn side_liquidity(&self, side: Side) -> i64 {
        let tree = match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        };
        tree.values().map(|level| level.aggregate_quantity()).sum()
    }

    /// Aggregated depth view: up to `depth` levels per side, bids
    /// descending and asks ascending.
    pub fn snapshot(&self, depth: usize) -> BookSnapshot {
        let bids = self
            .bids
            .iter()
            .rev()
            .take(depth)
            .map(|(price, level)| BookLevel {
                price: *price,
                quantity: level.aggregate_quantity(),
            })
            .collect();
        let asks = self
            .asks
            .iter()
            .take(depth)
            .map(|(price, level)| BookLevel {
                price: *price,
                quantity: level.aggregate_quantity(),
            })
            .collect();
        BookSnapshot { bids, asks }
    }
}

//--------------------------------------------------------------------------------------------------
//  TESTS
//--------------------------------------------------------------------------------------------------
// | Name                              | Description                                      |
// |-----------------------------------|--------------------------------------------------|
// | test_empty_book                   | Initial empty state                              |
// | test_add_and_best_prices          | Insertion and top-of-book queries                |
// | test_duplicate_rejected           | Duplicate id fails without mutation              |
// | test_remove_order                 | Removal and empty-level cleanup                  |
// | test_fifo_within_level            | Queue order equals arrival order                 |
// | test_snapshot_ordering            | Depth view ordering and aggregation              |
// | test_side_liquidity               | Whole-side remaining quantity                    |
//--------------------------------------------------------------------------------------------------
