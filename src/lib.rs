// Expose the modules
pub mod api;
pub mod config;
pub mod matcher;
pub mod metrics;
pub mod middleware;
pub mod orderbook;
pub mod types;

// Re-export key types for easier usage
pub use api::{Api, AppState};
pub use config::Config;
pub use matcher::{EngineError, EngineResult, MatchResult, Matcher};
pub use metrics::EngineMetrics;
pub use orderbook::{BookLevel, BookSnapshot, OrderBook, OrderBookError, PriceLevel};
pub use types::{Order, OrderStatus, OrderType, Side, Trade};
