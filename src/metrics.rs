//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Service-level counters and latency tracking for the /metrics endpoint.
//
// | Component      | Description                                                        |
// |----------------|--------------------------------------------------------------------|
// | EngineMetrics  | Atomic counters plus a bounded rolling window of submit latencies  |
//
// Counters are updated with relaxed atomics from the request handlers. The
// latency window is a mutex-guarded buffer bounded by METRICS_MAX_LATENCIES;
// percentiles are computed over a sorted copy on read.
//--------------------------------------------------------------------------------------------------

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Counters and latency samples for the running service.
#[derive(Debug)]
pub struct EngineMetrics {
    start_time: Instant,
    orders_received: AtomicI64,
    orders_matched: AtomicI64,
    orders_cancelled: AtomicI64,
    trades_executed: AtomicI64,
    latencies: Mutex<Vec<Duration>>,
    max_latencies: usize,
}

/// Latency percentiles in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencyPercentiles {
    pub p50: f64,
    pub p99: f64,
    pub p999: f64,
}

impl EngineMetrics {
    /// Creates a metrics collector keeping at most `max_latencies` samples.
    pub fn new(max_latencies: usize) -> Self {
        Self {
            start_time: Instant::now(),
            orders_received: AtomicI64::new(0),
            orders_matched: AtomicI64::new(0),
            orders_cancelled: AtomicI64::new(0),
            trades_executed: AtomicI64::new(0),
            latencies: Mutex::new(Vec::with_capacity(max_latencies.min(4096))),
            max_latencies,
        }
    }

    /// Seconds since the collector (and the service) started.
    pub fn uptime_seconds(&self) -> i64 {
        self.start_time.elapsed().as_secs() as i64
    }

    pub fn record_order_received(&self) {
        self.orders_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_order_matched(&self) {
        self.orders_matched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_order_cancelled(&self) {
        self.orders_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_trades(&self, count: i64) {
        self.trades_executed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn orders_received(&self) -> i64 {
        self.orders_received.load(Ordering::Relaxed)
    }

    pub fn orders_matched(&self) -> i64 {
        self.orders_matched.load(Ordering::Relaxed)
    }

    pub fn orders_cancelled(&self) -> i64 {
        self.orders_cancelled.load(Ordering::Relaxed)
    }

    pub fn trades_executed(&self) -> i64 {
        self.trades_executed.load(Ordering::Relaxed)
    }

    /// Appends one submit latency, evicting the oldest samples beyond the
    /// window bound.
    pub fn record_latency(&self, latency: Duration) {
        let mut latencies = self
            .latencies
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        latencies.push(latency);
        if latencies.len() > self.max_latencies {
            let excess = latencies.len() - self.max_latencies;
            latencies.drain(..excess);
        }
    }

    /// p50/p99/p99.9 of the recorded latencies, in milliseconds. All zero
    /// when no samples exist yet.
    pub fn latency_percentiles(&self) -> LatencyPercentiles {
        let snapshot = {
            let latencies = self
                .latencies
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            latencies.clone()
        };
        if snapshot.is_empty() {
            return LatencyPercentiles {
                p50: 0.0,
                p99: 0.0,
                p999: 0.0,
            };
        }

        let mut sorted = snapshot;
        sorted.sort_unstable();

        let pick = |fraction: f64| -> f64 {
            let idx = ((sorted.len() as f64) * fraction) as usize;
            let idx = idx.min(sorted.len() - 1);
            sorted[idx].as_secs_f64() * 1_000.0
        };

        LatencyPercentiles {
            p50: pick(0.50),
            p99: pick(0.99),
            p999: pick(0.999),
        }
    }

    /// Orders received per second since start.
    pub fn throughput(&self) -> f64 {
        let uptime = self.start_time.elapsed().as_secs_f64();
        if uptime <= 0.0 {
            return 0.0;
        }
        self.orders_received() as f64 / uptime
    }
}
