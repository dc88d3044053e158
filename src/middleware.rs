//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// HTTP middleware wrapping the trading API.
//
// | Component           | Description                                                      |
// |---------------------|------------------------------------------------------------------|
// | RateLimiter         | Fixed-window request counter per client address                  |
// | ServiceAvailability | Maintenance flag and in-flight request cap                       |
// | request_logger      | One structured log line per request                              |
//
// The limiter and the availability gate are plugged into the router with
// axum::middleware::from_fn_with_state; the logger with from_fn.
//--------------------------------------------------------------------------------------------------

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{info, warn};

//--------------------------------------------------------------------------------------------------
// Rate limiting
//--------------------------------------------------------------------------------------------------

/// Fixed-window rate limiter keyed by client address.
///
/// Each client gets `max_requests` per window; the window is identified by
/// integer division of the current time, so all clients roll over on the
/// same boundaries. A client's stale window counters are pruned when its
/// first request of a new window arrives.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    counters: Mutex<HashMap<String, u32>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            counters: Mutex::new(HashMap::new()),
        }
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Counts one request from `client` against the current window.
    /// Returns false when the window budget is exhausted.
    pub fn allow(&self, client: &str) -> bool {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_millis();
        let window_ms = self.window.as_millis().max(1);
        let key = format!("{client}_{}", now_ms / window_ms);

        let mut counters = self
            .counters
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match counters.get(&key).copied() {
            None => {
                let prefix = format!("{client}_");
                counters.retain(|k, _| k == &key || !k.starts_with(&prefix));
                counters.insert(key, 1);
                true
            }
            Some(count) if count >= self.max_requests => false,
            Some(count) => {
                counters.insert(key, count + 1);
                true
            }
        }
    }
}

/// Rate-limit layer: rejects over-budget clients with 429 and stamps the
/// window budget on allowed responses.
pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    let peer = connect_info.map(|ConnectInfo(addr)| addr);
    let client = client_address(request.headers(), peer);
    if !limiter.allow(&client) {
        warn!(
            client = %client,
            path = %request.uri().path(),
            max_requests = limiter.max_requests(),
            "rate limit exceeded"
        );
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "error": "Rate limit exceeded",
                "message": "Too many requests. Please try again later."
            })),
        )
            .into_response();
    }

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&limiter.max_requests().to_string()) {
        response.headers_mut().insert("x-ratelimit-limit", value);
    }
    response
}

/// Resolves the client address: X-Forwarded-For first, then X-Real-IP,
/// then the connection's peer address when neither proxy header is set.
fn client_address(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        let real_ip = real_ip.trim();
        if !real_ip.is_empty() {
            return real_ip.to_string();
        }
    }
    match peer {
        Some(addr) => addr.ip().to_string(),
        None => "unknown".to_string(),
    }
}

//--------------------------------------------------------------------------------------------------
// Service availability
//--------------------------------------------------------------------------------------------------

/// Gate for maintenance mode and request-concurrency limiting.
#[derive(Debug)]
pub struct ServiceAvailability {
    maintenance_mode: AtomicBool,
    max_in_flight: i64,
    in_flight: AtomicI64,
}

impl ServiceAvailability {
    /// `max_in_flight` of 0 disables the concurrency cap.
    pub fn new(maintenance_mode: bool, max_in_flight: i64) -> Self {
        if maintenance_mode {
            warn!("service starting in maintenance mode, all requests will return 503");
        }
        Self {
            maintenance_mode: AtomicBool::new(maintenance_mode),
            max_in_flight,
            in_flight: AtomicI64::new(0),
        }
    }

    pub fn set_maintenance_mode(&self, enabled: bool) {
        self.maintenance_mode.store(enabled, Ordering::Release);
        if enabled {
            warn!("service maintenance mode enabled");
        } else {
            info!("service maintenance mode disabled");
        }
    }

    pub fn is_maintenance_mode(&self) -> bool {
        self.maintenance_mode.load(Ordering::Acquire)
    }

    pub fn in_flight_requests(&self) -> i64 {
        self.in_flight.load(Ordering::Acquire)
    }

    fn try_acquire(&self) -> Option<InFlight<'_>> {
        if self.max_in_flight > 0 && self.in_flight.load(Ordering::Acquire) >= self.max_in_flight {
            return None;
        }
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        Some(InFlight(self))
    }
}

/// Decrements the in-flight counter when the request finishes, whichever
/// way it finishes.
struct InFlight<'a>(&'a ServiceAvailability);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Availability layer: 503 during maintenance or overload. The health
/// endpoint stays reachable in maintenance mode.
pub async fn availability_gate(
    State(gate): State<Arc<ServiceAvailability>>,
    request: Request,
    next: Next,
) -> Response {
    if request.uri().path() == "/health" {
        return next.run(request).await;
    }

    if gate.is_maintenance_mode() {
        warn!(
            path = %request.uri().path(),
            method = %request.method(),
            "request rejected: service in maintenance mode"
        );
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "error": "Service unavailable",
                "message": "The service is currently undergoing maintenance. Please try again later.",
                "code": 503
            })),
        )
            .into_response();
    }

    let Some(_in_flight) = gate.try_acquire() else {
        warn!(
            path = %request.uri().path(),
            method = %request.method(),
            in_flight = gate.in_flight_requests(),
            max_in_flight = gate.max_in_flight,
            "request rejected: server overload"
        );
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "error": "Service unavailable",
                "message": "The service is currently overloaded. Please try again later.",
                "code": 503
            })),
        )
            .into_response();
    };

    next.run(request).await
}

//--------------------------------------------------------------------------------------------------
// Request logging
//--------------------------------------------------------------------------------------------------

/// Logs one line per served request.
pub async fn request_logger(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        latency_ms = start.elapsed().as_millis() as u64,
        "http request"
    );
    response
}

//--------------------------------------------------------------------------------------------------
//  TESTS
//--------------------------------------------------------------------------------------------------
// | Name                              | Description                                      |
// |-----------------------------------|--------------------------------------------------|
// | test_allows_within_budget         | Requests under the cap pass                      |
// | test_rejects_over_budget          | Requests beyond the cap are denied               |
// | test_clients_are_independent      | One client's budget does not affect another      |
// | test_window_rollover              | A new window resets the budget                   |
// | test_client_address_precedence    | Header tiers, then the peer address              |
// | test_peers_rate_limited_independently | Direct clients get per-peer buckets          |
// | test_availability_gate            | Maintenance flag and in-flight accounting        |
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_within_budget() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        for _ in 0..3 {
            assert!(limiter.allow("10.0.0.1"));
        }
    }

    #[test]
    fn test_rejects_over_budget() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        assert!(limiter.allow("10.0.0.1"));
        assert!(limiter.allow("10.0.0.1"));
        assert!(!limiter.allow("10.0.0.1"));
        assert!(!limiter.allow("10.0.0.1"));
    }

    #[test]
    fn test_clients_are_independent() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.allow("10.0.0.1"));
        assert!(!limiter.allow("10.0.0.1"));
        assert!(limiter.allow("10.0.0.2"));
    }

    #[test]
    fn test_window_rollover() {
        let limiter = RateLimiter::new(1, Duration::from_millis(40));
        assert!(limiter.allow("10.0.0.1"));
        assert!(!limiter.allow("10.0.0.1"));

        std::thread::sleep(Duration::from_millis(60));
        assert!(limiter.allow("10.0.0.1"));
    }

    #[test]
    fn test_client_address_precedence() {
        let peer: SocketAddr = "192.168.1.7:54321".parse().unwrap();

        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "1.2.3.4, 5.6.7.8".parse().unwrap());
        headers.insert("x-real-ip", "9.9.9.9".parse().unwrap());
        assert_eq!(client_address(&headers, Some(peer)), "1.2.3.4");

        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "9.9.9.9".parse().unwrap());
        assert_eq!(client_address(&headers, Some(peer)), "9.9.9.9");

        // with no proxy headers the connection's own address identifies the client
        assert_eq!(client_address(&HeaderMap::new(), Some(peer)), "192.168.1.7");

        assert_eq!(client_address(&HeaderMap::new(), None), "unknown");
    }

    #[test]
    fn test_peers_rate_limited_independently() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let first: SocketAddr = "10.0.0.1:40001".parse().unwrap();
        let second: SocketAddr = "10.0.0.2:40002".parse().unwrap();

        let headers = HeaderMap::new();
        assert!(limiter.allow(&client_address(&headers, Some(first))));
        assert!(!limiter.allow(&client_address(&headers, Some(first))));
        // a different peer still has its own budget
        assert!(limiter.allow(&client_address(&headers, Some(second))));
        // the port does not split a peer into separate buckets
        let first_other_port: SocketAddr = "10.0.0.1:40003".parse().unwrap();
        assert!(!limiter.allow(&client_address(&headers, Some(first_other_port))));
    }

    #[test]
    fn test_availability_gate() {
        let gate = ServiceAvailability::new(false, 2);
        assert!(!gate.is_maintenance_mode());

        let first = gate.try_acquire().unwrap();
        let _second = gate.try_acquire().unwrap();
        assert_eq!(gate.in_flight_requests(), 2);
        assert!(gate.try_acquire().is_none());

        drop(first);
        assert_eq!(gate.in_flight_requests(), 1);
        assert!(gate.try_acquire().is_some());

        gate.set_maintenance_mode(true);
        assert!(gate.is_maintenance_mode());
    }

    #[test]
    fn test_unlimited_in_flight() {
        let gate = ServiceAvailability::new(false, 0);
        let guards: Vec<_> = (0..100).map(|_| gate.try_acquire().unwrap()).collect();
        assert_eq!(gate.in_flight_requests(), 100);
        drop(guards);
        assert_eq!(gate.in_flight_requests(), 0);
    }
}
