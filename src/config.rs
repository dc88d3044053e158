//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Environment-driven service configuration. Every knob has a default, so the
// service starts with no environment at all. None of these settings alter
// matching semantics; they shape the HTTP surface around the engine.
//--------------------------------------------------------------------------------------------------

use std::env;
use std::time::Duration;

use dotenv::dotenv;

const PORT: &str = "PORT";
const LOG_LEVEL: &str = "LOG_LEVEL";
const LOG_FORMAT: &str = "LOG_FORMAT";
const RATE_LIMIT_DISABLED: &str = "RATE_LIMIT_DISABLED";
const RATE_LIMIT_MAX: &str = "RATE_LIMIT_MAX";
const RATE_LIMIT_WINDOW_MS: &str = "RATE_LIMIT_WINDOW_MS";
const MAINTENANCE_MODE: &str = "MAINTENANCE_MODE";
const MAX_CONCURRENT_REQUESTS: &str = "MAX_CONCURRENT_REQUESTS";
const ORDERBOOK_DEFAULT_DEPTH: &str = "ORDERBOOK_DEFAULT_DEPTH";
const ORDERBOOK_MAX_DEPTH: &str = "ORDERBOOK_MAX_DEPTH";
const METRICS_MAX_LATENCIES: &str = "METRICS_MAX_LATENCIES";

/// Service configuration assembled from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP port the HTTP server binds to.
    pub port: u16,
    /// Log level filter (trace, debug, info, warn, error).
    pub log_level: String,
    /// Log output format: "json" or "pretty".
    pub log_format: String,
    /// Disables the per-client rate limiter entirely.
    pub rate_limit_disabled: bool,
    /// Requests allowed per client per window.
    pub rate_limit_max: u32,
    /// Width of the rate-limit window.
    pub rate_limit_window: Duration,
    /// Rejects all non-health traffic with 503 when set.
    pub maintenance_mode: bool,
    /// Cap on simultaneously served requests; 0 disables the cap.
    pub max_concurrent_requests: i64,
    /// Depth used for book snapshots when the caller does not ask for one.
    pub orderbook_default_depth: usize,
    /// Hard cap applied to caller-requested snapshot depths.
    pub orderbook_max_depth: usize,
    /// Size of the rolling window of submit latencies kept for metrics.
    pub metrics_max_latencies: usize,
}

impl Config {
    /// Loads configuration from the environment, panicking on malformed values.
    pub fn from_env() -> Config {
        match Self::try_from_env() {
            Ok(config) => config,
            Err(err) => panic!("{}", err),
        }
    }

    /// Loads configuration from the environment. Unset variables fall back
    /// to defaults; set-but-malformed variables are an error.
    pub fn try_from_env() -> Result<Config, String> {
        dotenv().ok();

        let mut config = Config::default();

        if let Some(port) = parse_env::<u16>(PORT)? {
            config.port = port;
        }
        if let Ok(level) = env::var(LOG_LEVEL) {
            if !level.trim().is_empty() {
                config.log_level = level;
            }
        }
        if let Ok(format) = env::var(LOG_FORMAT) {
            if !format.trim().is_empty() {
                config.log_format = format;
            }
        }
        config.rate_limit_disabled = flag_set(RATE_LIMIT_DISABLED);
        if let Some(max) = parse_env::<u32>(RATE_LIMIT_MAX)? {
            if max > 0 {
                config.rate_limit_max = max;
            }
        }
        if let Some(window_ms) = parse_env::<u64>(RATE_LIMIT_WINDOW_MS)? {
            if window_ms > 0 {
                config.rate_limit_window = Duration::from_millis(window_ms);
            }
        }
        config.maintenance_mode = flag_set(MAINTENANCE_MODE);
        if let Some(max) = parse_env::<i64>(MAX_CONCURRENT_REQUESTS)? {
            if max > 0 {
                config.max_concurrent_requests = max;
            }
        }
        if let Some(depth) = parse_env::<usize>(ORDERBOOK_DEFAULT_DEPTH)? {
            if depth > 0 {
                config.orderbook_default_depth = depth;
            }
        }
        if let Some(depth) = parse_env::<usize>(ORDERBOOK_MAX_DEPTH)? {
            if depth > 0 {
                config.orderbook_max_depth = depth;
            }
        }
        if let Some(max) = parse_env::<usize>(METRICS_MAX_LATENCIES)? {
            if max > 0 {
                config.metrics_max_latencies = max;
            }
        }

        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Config {
        Config {
            port: 8080,
            log_level: "info".to_string(),
            log_format: "json".to_string(),
            rate_limit_disabled: false,
            rate_limit_max: 100,
            rate_limit_window: Duration::from_secs(1),
            maintenance_mode: false,
            max_concurrent_requests: 0,
            orderbook_default_depth: 10,
            orderbook_max_depth: 1000,
            metrics_max_latencies: 10_000,
        }
    }
}

/// Reads and parses an environment variable, treating "unset" as `None`.
fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>, String> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| format!("failed to parse environment variable {key}={raw}")),
        Err(_) => Ok(None),
    }
}

/// Boolean flags follow the "1" convention.
fn flag_set(key: &str) -> bool {
    env::var(key).map(|v| v == "1").unwrap_or(false)
}
