//--------------------------------------------------------------------------------------------------
// TEST MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// End-to-end matching scenarios against the engine: full fills, walking the
// book, time priority, market-order execution and rejection, and
// cancellation of partially filled residuals.
//--------------------------------------------------------------------------------------------------

use uuid::Uuid;

use match_engine::{EngineError, Matcher, Order, OrderStatus, OrderType, Side};

fn limit(symbol: &str, side: Side, price: i64, quantity: i64) -> Order {
    Order::new(
        Uuid::new_v4(),
        symbol,
        side,
        OrderType::Limit,
        Some(price),
        quantity,
    )
}

fn market(symbol: &str, side: Side, quantity: i64) -> Order {
    Order::new(Uuid::new_v4(), symbol, side, OrderType::Market, None, quantity)
}

/// One ask at 15050x1000 and one bid at 15045x500; a limit buy at 15050x500
/// fills completely in a single trade at the resting price.
#[test]
fn test_simple_full_match() {
    let matcher = Matcher::new();
    matcher.submit(limit("AAPL", Side::Sell, 15050, 1000)).unwrap();
    matcher.submit(limit("AAPL", Side::Buy, 15045, 500)).unwrap();

    let result = matcher.submit(limit("AAPL", Side::Buy, 15050, 500)).unwrap();

    assert_eq!(result.status, OrderStatus::Filled);
    assert_eq!(result.filled_quantity, 500);
    assert_eq!(result.remaining_quantity, 0);
    assert_eq!(result.trades.len(), 1);
    assert_eq!(result.trades[0].price, 15050);
    assert_eq!(result.trades[0].quantity, 500);

    // the remaining ask shrank, the resting bid is untouched
    assert_eq!(matcher.best_of_book("AAPL", Side::Sell), Some((15050, 500)));
    assert_eq!(matcher.best_of_book("AAPL", Side::Buy), Some((15045, 500)));
}

/// Asks 15050x300, 15052x400, 15055x600; a limit buy at 15053x800 consumes
/// the two crossing levels in price order and rests its remainder.
#[test]
fn test_walk_the_book() {
    let matcher = Matcher::new();
    matcher.submit(limit("AAPL", Side::Sell, 15050, 300)).unwrap();
    matcher.submit(limit("AAPL", Side::Sell, 15052, 400)).unwrap();
    matcher.submit(limit("AAPL", Side::Sell, 15055, 600)).unwrap();

    let result = matcher.submit(limit("AAPL", Side::Buy, 15053, 800)).unwrap();

    assert_eq!(result.status, OrderStatus::PartialFill);
    assert_eq!(result.filled_quantity, 700);
    assert_eq!(result.remaining_quantity, 100);

    let executions: Vec<(i64, i64)> = result
        .trades
        .iter()
        .map(|t| (t.price, t.quantity))
        .collect();
    assert_eq!(executions, vec![(15050, 300), (15052, 400)]);

    // the residual rests as the new best bid; the far ask is untouched
    assert_eq!(matcher.best_of_book("AAPL", Side::Buy), Some((15053, 100)));
    assert_eq!(matcher.best_of_book("AAPL", Side::Sell), Some((15055, 600)));
}

/// Three asks at one price admitted in order; an incoming buy consumes them
/// in arrival order and leaves the third untouched at the head of the level.
#[test]
fn test_time_priority_within_level() {
    let matcher = Matcher::new();
    let first = limit("AAPL", Side::Sell, 15050, 200);
    let second = limit("AAPL", Side::Sell, 15050, 300);
    let third = limit("AAPL", Side::Sell, 15050, 400);
    let (first_id, second_id, third_id) = (first.id, second.id, third.id);
    matcher.submit(first).unwrap();
    matcher.submit(second).unwrap();
    matcher.submit(third).unwrap();

    let result = matcher.submit(limit("AAPL", Side::Buy, 15050, 500)).unwrap();

    assert_eq!(result.status, OrderStatus::Filled);
    let executions: Vec<(i64, i64)> = result
        .trades
        .iter()
        .map(|t| (t.price, t.quantity))
        .collect();
    assert_eq!(executions, vec![(15050, 200), (15050, 300)]);
    assert_eq!(result.trades[0].sell_order_id, first_id);
    assert_eq!(result.trades[1].sell_order_id, second_id);

    // the consumed makers are gone; the third keeps its full quantity
    assert!(matcher.order_status(first_id).is_none());
    assert!(matcher.order_status(second_id).is_none());
    let survivor = matcher.order_status(third_id).unwrap();
    assert_eq!(survivor.status, OrderStatus::Accepted);
    assert_eq!(survivor.filled_quantity, 0);
    assert_eq!(matcher.best_of_book("AAPL", Side::Sell), Some((15050, 400)));
}

/// A partially consumed maker keeps the head of its queue for later takers.
#[test]
fn test_partial_maker_keeps_priority() {
    let matcher = Matcher::new();
    let first = limit("AAPL", Side::Sell, 15050, 300);
    let second = limit("AAPL", Side::Sell, 15050, 300);
    let (first_id, second_id) = (first.id, second.id);
    matcher.submit(first).unwrap();
    matcher.submit(second).unwrap();

    // consumes 100 of the first maker only
    matcher.submit(limit("AAPL", Side::Buy, 15050, 100)).unwrap();
    let head = matcher.order_status(first_id).unwrap();
    assert_eq!(head.status, OrderStatus::PartialFill);
    assert_eq!(head.remaining(), 200);

    // the next taker still hits the first maker before the second
    let result = matcher.submit(limit("AAPL", Side::Buy, 15050, 250)).unwrap();
    assert_eq!(result.trades[0].sell_order_id, first_id);
    assert_eq!(result.trades[0].quantity, 200);
    assert_eq!(result.trades[1].sell_order_id, second_id);
    assert_eq!(result.trades[1].quantity, 50);
}

/// Bids 15050x200, 15048x300, 15045x400; a market sell for 600 fills across
/// three levels, leaving 300 at the deepest touched level.
#[test]
fn test_market_order_walks_levels() {
    let matcher = Matcher::new();
    matcher.submit(limit("AAPL", Side::Buy, 15050, 200)).unwrap();
    matcher.submit(limit("AAPL", Side::Buy, 15048, 300)).unwrap();
    matcher.submit(limit("AAPL", Side::Buy, 15045, 400)).unwrap();

    let result = matcher.submit(market("AAPL", Side::Sell, 600)).unwrap();

    assert_eq!(result.status, OrderStatus::Filled);
    assert_eq!(result.filled_quantity, 600);
    let executions: Vec<(i64, i64)> = result
        .trades
        .iter()
        .map(|t| (t.price, t.quantity))
        .collect();
    assert_eq!(executions, vec![(15050, 200), (15048, 300), (15045, 100)]);

    assert_eq!(matcher.best_of_book("AAPL", Side::Buy), Some((15045, 300)));
}

/// A market order larger than the whole opposing side is rejected without
/// touching the book.
#[test]
fn test_market_order_insufficient_liquidity() {
    let matcher = Matcher::new();
    matcher.submit(limit("AAPL", Side::Sell, 15050, 100)).unwrap();
    let before = matcher.book_snapshot("AAPL", 10);

    let result = matcher.submit(market("AAPL", Side::Buy, 500));

    assert_eq!(
        result,
        Err(EngineError::InsufficientLiquidity {
            requested: 500,
            available: 100
        })
    );
    // no partial fills, no admitted order, no book change
    assert_eq!(matcher.book_snapshot("AAPL", 10), before);
    assert_eq!(matcher.live_orders(), 1);
}

/// A limit buy below the best ask does not cross and rests untouched.
#[test]
fn test_limit_no_cross() {
    let matcher = Matcher::new();
    matcher.submit(limit("AAPL", Side::Sell, 15050, 1000)).unwrap();

    let result = matcher.submit(limit("AAPL", Side::Buy, 15049, 500)).unwrap();

    assert_eq!(result.status, OrderStatus::Accepted);
    assert!(result.trades.is_empty());
    assert_eq!(result.filled_quantity, 0);
    assert_eq!(matcher.best_of_book("AAPL", Side::Buy), Some((15049, 500)));
    assert_eq!(matcher.best_of_book("AAPL", Side::Sell), Some((15050, 1000)));
}

/// A partially filled residual can be cancelled, clearing its side of the book.
#[test]
fn test_cancel_partial_fill_residual() {
    let matcher = Matcher::new();
    matcher.submit(limit("AAPL", Side::Sell, 15050, 300)).unwrap();

    let buy = limit("AAPL", Side::Buy, 15050, 500);
    let buy_id = buy.id;
    let result = matcher.submit(buy).unwrap();
    assert_eq!(result.status, OrderStatus::PartialFill);
    assert_eq!(result.filled_quantity, 300);
    assert_eq!(matcher.best_of_book("AAPL", Side::Buy), Some((15050, 200)));

    let cancelled = matcher.cancel(buy_id).unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(cancelled.filled_quantity, 300);

    assert_eq!(matcher.best_of_book("AAPL", Side::Buy), None);
    let snapshot = matcher.book_snapshot("AAPL", 10);
    assert!(snapshot.bids.is_empty());
    assert!(snapshot.asks.is_empty());
}

/// Admitting and cancelling an order leaves the book exactly as it was.
#[test]
fn test_admit_then_cancel_round_trip() {
    let matcher = Matcher::new();
    matcher.submit(limit("AAPL", Side::Sell, 15055, 600)).unwrap();
    matcher.submit(limit("AAPL", Side::Buy, 15040, 250)).unwrap();
    let before = matcher.book_snapshot("AAPL", 10);

    let order = limit("AAPL", Side::Buy, 15042, 100);
    let id = order.id;
    matcher.submit(order).unwrap();
    matcher.cancel(id).unwrap();

    assert_eq!(matcher.book_snapshot("AAPL", 10), before);
}

/// Snapshots are a pure function of book state and agree with per-level sums.
#[test]
fn test_snapshot_deterministic() {
    let matcher = Matcher::new();
    for (price, qty) in [(15050, 300), (15050, 200), (15052, 400)] {
        matcher.submit(limit("AAPL", Side::Sell, price, qty)).unwrap();
    }
    matcher.submit(limit("AAPL", Side::Buy, 15045, 150)).unwrap();

    let first = matcher.book_snapshot("AAPL", 10);
    let second = matcher.book_snapshot("AAPL", 10);
    assert_eq!(first, second);

    assert_eq!(first.asks[0].price, 15050);
    assert_eq!(first.asks[0].quantity, 500);
    assert_eq!(first.asks[1].price, 15052);
    assert_eq!(first.asks[1].quantity, 400);
    assert_eq!(first.bids[0].price, 15045);
    assert_eq!(first.bids[0].quantity, 150);
}

/// Every print sits between the buyer's and the seller's limit prices.
#[test]
fn test_trade_price_within_limits() {
    let matcher = Matcher::new();
    matcher.submit(limit("AAPL", Side::Sell, 15048, 200)).unwrap();
    matcher.submit(limit("AAPL", Side::Sell, 15052, 200)).unwrap();

    let result = matcher.submit(limit("AAPL", Side::Buy, 15060, 400)).unwrap();
    for trade in &result.trades {
        assert!(trade.price <= 15060);
        assert!(trade.price >= 15048);
    }
    // the taker crossed both levels at the makers' prices
    let prices: Vec<i64> = result.trades.iter().map(|t| t.price).collect();
    assert_eq!(prices, vec![15048, 15052]);
}

/// Books for different symbols are independent.
#[test]
fn test_symbols_are_isolated() {
    let matcher = Matcher::new();
    matcher.submit(limit("AAPL", Side::Sell, 15050, 100)).unwrap();
    matcher.submit(limit("MSFT", Side::Sell, 40000, 700)).unwrap();

    let result = matcher.submit(limit("AAPL", Side::Buy, 15050, 100)).unwrap();
    assert_eq!(result.status, OrderStatus::Filled);

    assert_eq!(matcher.best_of_book("MSFT", Side::Sell), Some((40000, 700)));
    let mut symbols = matcher.symbols();
    symbols.sort();
    assert_eq!(symbols, vec!["AAPL".to_string(), "MSFT".to_string()]);
}
