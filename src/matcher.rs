//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module implements the matching engine on top of the per-symbol order books.
// Orders are matched under strict price-time priority: better prices first, FIFO within
// a price level.
//
// | Component      | Description                                                        |
// |----------------|--------------------------------------------------------------------|
// | Matcher        | Routes orders to per-symbol books and runs the matching algorithm  |
// | MatchResult    | Outcome of one submission: status, fill totals, trades             |
// | EngineError    | Failure taxonomy surfaced to callers                               |
//
// Concurrency: a reader-writer lock guards the symbol map; each book carries its own
// reader-writer lock. A submission executes its entire walk, including residual
// insertion, under a single acquisition of its book's write lock, so the state changes
// of one submission are observable only as a whole. At most one book lock is held at
// a time, and the symbol-map lock is always released before a book lock is taken.
//--------------------------------------------------------------------------------------------------

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;
use uuid::Uuid;

use crate::orderbook::{BookSnapshot, OrderBook};
use crate::types::{Order, OrderStatus, OrderType, Side, Trade};

/// Errors surfaced by the matching engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The order failed boundary validation; nothing was mutated.
    #[error("invalid order: {0}")]
    Validation(String),

    /// An order with this id is already live in the target book.
    #[error("order {0} already exists")]
    DuplicateOrder(Uuid),

    /// A market order asked for more quantity than the whole opposing side
    /// holds; nothing was mutated.
    #[error("insufficient liquidity: requested {requested}, available {available}")]
    InsufficientLiquidity { requested: i64, available: i64 },

    /// No live order carries this id.
    #[error("order {0} not found")]
    OrderNotFound(Uuid),

    /// The order already filled completely and cannot be cancelled.
    #[error("order {0} is already filled")]
    AlreadyFilled(Uuid),
}

/// Type alias for Result with EngineError.
pub type EngineResult<T> = Result<T, EngineError>;

/// The outcome of one submission.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    /// Final status of the incoming order.
    pub status: OrderStatus,
    /// Quantity that traded during this submission.
    pub filled_quantity: i64,
    /// Quantity left unfilled (resting in the book for limit orders).
    pub remaining_quantity: i64,
    /// One trade per execution, in execution order.
    pub trades: Vec<Trade>,
}

/// The multi-symbol matching engine.
///
/// Owns one [`OrderBook`] per symbol, created on first use. Once a book
/// exists for a symbol, every later lookup returns the same instance for
/// the life of the process.
#[derive(Debug, Default)]
pub struct Matcher {
    books: RwLock<HashMap<String, Arc<RwLock<OrderBook>>>>,
}

impl Matcher {
    /// Creates an empty matcher with no books.
    pub fn new() -> Self {
        Self::default()
    }

    /// Submits an order for matching.
    ///
    /// Validates the order at the boundary, resolves (or creates) the book
    /// for its symbol, and runs the price-time priority walk against the
    /// opposing side. Limit residuals are inserted at the tail of their
    /// level; market orders either fill completely or are rejected with
    /// [`EngineError::InsufficientLiquidity`] before any trade executes.
    pub fn submit(&self, order: Order) -> EngineResult<MatchResult> {
        validate(&order)?;

        let book = self.get_or_create_book(&order.symbol);
        let mut book = write_lock(&book);

        if book.contains(order.id) {
            return Err(EngineError::DuplicateOrder(order.id));
        }

        match order.order_type {
            OrderType::Limit => Ok(Self::match_limit(&mut book, order)),
            OrderType::Market => Self::match_market(&mut book, order),
        }
    }

    /// Cancels a live order by id.
    ///
    /// Returns the removed order with status `Cancelled`. Unknown ids fail
    /// with [`EngineError::OrderNotFound`]; an order observed in terminal
    /// `Filled` state fails with [`EngineError::AlreadyFilled`]. Once
    /// cancelled, the order is forgotten by the engine.
    pub fn cancel(&self, id: Uuid) -> EngineResult<Order> {
        for book in self.books_snapshot() {
            let mut book = write_lock(&book);
            match book.get(id) {
                None => continue,
                Some(order) if order.status == OrderStatus::Filled => {
                    return Err(EngineError::AlreadyFilled(id));
                }
                Some(_) => {}
            }
            let mut order = book.remove(id).ok_or(EngineError::OrderNotFound(id))?;
            order.status = OrderStatus::Cancelled;
            return Ok(order);
        }
        Err(EngineError::OrderNotFound(id))
    }

    /// Looks up a live order by id, returning a copy of its current state.
    pub fn order_status(&self, id: Uuid) -> Option<Order> {
        for book in self.books_snapshot() {
            let book = read_lock(&book);
            if let Some(order) = book.get(id) {
                return Some(order.clone());
            }
        }
        None
    }

    /// Aggregated depth view for a symbol, up to `depth` levels per side.
    /// An unknown symbol yields an empty book (and creates it, matching
    /// submission behavior).
    pub fn book_snapshot(&self, symbol: &str, depth: usize) -> BookSnapshot {
        let book = self.get_or_create_book(symbol);
        let book = read_lock(&book);
        book.snapshot(depth)
    }

    /// Top-of-book for one side of a symbol's book, if the book exists.
    pub fn best_of_book(&self, symbol: &str, side: Side) -> Option<(i64, i64)> {
        let book = {
            let books = read_lock(&self.books);
            books.get(symbol).cloned()
        }?;
        let book = read_lock(&book);
        match side {
            Side::Buy => book.best_bid(),
            Side::Sell => book.best_ask(),
        }
    }

    /// Symbols with a book, in no particular order.
    pub fn symbols(&self) -> Vec<String> {
        read_lock(&self.books).keys().cloned().collect()
    }

    /// Total count of live orders across every book.
    pub fn live_orders(&self) -> i64 {
        self.books_snapshot()
            .iter()
            .map(|book| read_lock(book).len() as i64)
            .sum()
    }

    //----------------------------------------------------------------------------------------------
    // Internal
    //----------------------------------------------------------------------------------------------

    /// Resolves the book for `symbol`, creating it on first use. The shared
    /// lookup is released before the exclusive one is taken; the insertion
    /// is double-checked to tolerate a racing creator.
    fn get_or_create_book(&self, symbol: &str) -> Arc<RwLock<OrderBook>> {
        {
            let books = read_lock(&self.books);
            if let Some(book) = books.get(symbol) {
                return Arc::clone(book);
            }
        }

        let mut books = write_lock(&self.books);
        if let Some(book) = books.get(symbol) {
            return Arc::clone(book);
        }
        let book = Arc::new(RwLock::new(OrderBook::new(symbol)));
        books.insert(symbol.to_string(), Arc::clone(&book));
        book
    }

    /// Clones the current set of book handles so callers can visit them
    /// without holding the symbol-map lock across book-lock acquisitions.
    fn books_snapshot(&self) -> Vec<Arc<RwLock<OrderBook>>> {
        read_lock(&self.books).values().cloned().collect()
    }

    fn match_limit(book: &mut OrderBook, mut order: Order) -> MatchResult {
        let limit = order.price;
        let trades = Self::walk(book, &mut order, limit);

        let status = order.status;
        let filled_quantity = order.filled_quantity;
        let remaining_quantity = order.remaining();
        if !order.is_filled() {
            book.add(order)
                .expect("residual cannot collide under the book lock");
        }

        MatchResult {
            status,
            filled_quantity,
            remaining_quantity,
            trades,
        }
    }

    fn match_market(book: &mut OrderBook, mut order: Order) -> EngineResult<MatchResult> {
        let available = book.side_liquidity(order.side.opposite());
        if available < order.quantity {
            return Err(EngineError::InsufficientLiquidity {
                requested: order.quantity,
                available,
            });
        }

        let trades = Self::walk(book, &mut order, None);
        debug_assert!(order.is_filled());

        Ok(MatchResult {
            status: OrderStatus::Filled,
            filled_quantity: order.filled_quantity,
            remaining_quantity: order.remaining(),
            trades,
        })
    }

    /// Walks the opposing side best-price first until the taker fills, the
    /// side empties, or (for limits) prices stop crossing.
    fn walk(book: &mut OrderBook, taker: &mut Order, limit: Option<i64>) -> Vec<Trade> {
        let mut trades = Vec::new();
        let opposing = taker.side.opposite();

        while !taker.is_filled() {
            let Some(level_price) = book.best_price(opposing) else {
                break;
            };
            if let Some(limit_price) = limit {
                let crosses = match taker.side {
                    Side::Buy => limit_price >= level_price,
                    Side::Sell => limit_price <= level_price,
                };
                if !crosses {
                    break;
                }
            }
            Self::consume_level(book, taker, opposing, level_price, &mut trades);
        }

        trades
    }

    /// Consumes one price level head-first. Every trade prints at the
    /// level's price for `min(taker.remaining, resting.remaining)`. Filled
    /// resting orders are unlinked immediately; a partially consumed
    /// resting order keeps the head of its queue.
    fn consume_level(
        book: &mut OrderBook,
        taker: &mut Order,
        opposing: Side,
        level_price: i64,
        trades: &mut Vec<Trade>,
    ) {
        loop {
            let tree = match opposing {
                Side::Buy => &mut book.bids,
                Side::Sell => &mut book.asks,
            };
            let Some(level) = tree.get_mut(&level_price) else {
                return;
            };
            if level.orders.is_empty() {
                tree.remove(&level_price);
                return;
            }
            let Some(resting) = level.orders.front_mut() else {
                return;
            };

            let exec_qty = taker.remaining().min(resting.remaining());
            let resting_id = resting.id;
            resting.fill(exec_qty);
            let resting_filled = resting.is_filled();

            trades.push(match taker.side {
                Side::Buy => Trade::new(level_price, exec_qty, taker.id, resting_id),
                Side::Sell => Trade::new(level_price, exec_qty, resting_id, taker.id),
            });

            let mut level_emptied = false;
            if resting_filled {
                level.orders.pop_front();
                level_emptied = level.orders.is_empty();
                if level_emptied {
                    tree.remove(&level_price);
                }
                book.index.remove(&resting_id);
            }

            taker.fill(exec_qty);
            if taker.is_filled() || level_emptied {
                return;
            }
        }
    }
}

/// Boundary validation. Rejected orders cause no mutation.
fn validate(order: &Order) -> EngineResult<()> {
    if order.symbol.trim().is_empty() {
        return Err(EngineError::Validation("symbol is required".into()));
    }
    if order.quantity <= 0 {
        return Err(EngineError::Validation("quantity must be positive".into()));
    }
    match order.order_type {
        OrderType::Limit => match order.price {
            Some(price) if price > 0 => {}
            Some(_) => {
                return Err(EngineError::Validation(
                    "price must be positive for LIMIT orders".into(),
                ));
            }
            None => {
                return Err(EngineError::Validation(
                    "price is required for LIMIT orders".into(),
                ));
            }
        },
        OrderType::Market => {
            if order.price.is_some() {
                return Err(EngineError::Validation(
                    "MARKET orders must not carry a price".into(),
                ));
            }
        }
    }
    Ok(())
}

fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

//--------------------------------------------------------------------------------------------------
//  TESTS
//--------------------------------------------------------------------------------------------------
// | Name                                | Description                                      |
// |-------------------------------------|--------------------------------------------------|
// | test_book_instance_is_stable        | Same symbol always resolves the same book        |
// | test_validation_rejections          | Boundary validation failure cases                |
// | test_no_cross_rests                 | Non-crossing limit order rests untouched         |
// | test_simple_cross                   | Crossing limit order trades at the resting price |
// | test_duplicate_submit_rejected      | Resubmitting a live id fails                     |
// | test_cancel_semantics               | Cancel of live, unknown, and repeated ids        |
//--------------------------------------------------------------------------------------------------
