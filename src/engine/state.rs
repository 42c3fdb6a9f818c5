//! Runtime counters and latency tracking

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Thread-safe per-session counters
pub struct RuntimeStats {
    total_requests: AtomicU64,
    not_found: AtomicU64,
    injected_errors: AtomicU64,
    injected_delays: AtomicU64,
    validation_rejections: AtomicU64,
    handler_failures: AtomicU64,
    latencies: RwLock<LatencyTracker>,
}

impl RuntimeStats {
    pub fn new() -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            not_found: AtomicU64::new(0),
            injected_errors: AtomicU64::new(0),
            injected_delays: AtomicU64::new(0),
            validation_rejections: AtomicU64::new(0),
            handler_failures: AtomicU64::new(0),
            latencies: RwLock::new(LatencyTracker::new()),
        }
    }

    pub fn record_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_not_found(&self) {
        self.not_found.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_injected_error(&self) {
        self.injected_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_injected_delay(&self) {
        self.injected_delays.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_validation_rejection(&self) {
        self.validation_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_handler_failure(&self) {
        self.handler_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record end-to-end handling time for one request
    pub fn record_latency(&self, latency: Duration) {
        self.latencies.write().record(latency);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            not_found: self.not_found.load(Ordering::Relaxed),
            injected_errors: self.injected_errors.load(Ordering::Relaxed),
            injected_delays: self.injected_delays.load(Ordering::Relaxed),
            validation_rejections: self.validation_rejections.load(Ordering::Relaxed),
            handler_failures: self.handler_failures.load(Ordering::Relaxed),
            latency: self.latencies.read().stats(),
        }
    }

    pub fn reset(&self) {
        self.total_requests.store(0, Ordering::Relaxed);
        self.not_found.store(0, Ordering::Relaxed);
        self.injected_errors.store(0, Ordering::Relaxed);
        self.injected_delays.store(0, Ordering::Relaxed);
        self.validation_rejections.store(0, Ordering::Relaxed);
        self.handler_failures.store(0, Ordering::Relaxed);
        *self.latencies.write() = LatencyTracker::new();
    }
}

impl Default for RuntimeStats {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RuntimeStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("RuntimeStats").field(&self.snapshot()).finish()
    }
}

/// Point-in-time copy of [`RuntimeStats`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub total_requests: u64,
    pub not_found: u64,
    pub injected_errors: u64,
    pub injected_delays: u64,
    pub validation_rejections: u64,
    pub handler_failures: u64,
    pub latency: LatencyStats,
}

impl StatsSnapshot {
    /// Share of requests that did not reach a successful response
    pub fn error_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            let failed = self.not_found
                + self.injected_errors
                + self.validation_rejections
                + self.handler_failures;
            failed as f64 / self.total_requests as f64
        }
    }
}

/// Tracks latency measurements with reservoir sampling
struct LatencyTracker {
    samples: Vec<Duration>,
    count: u64,
    max_samples: usize,
    sum: Duration,
    min: Option<Duration>,
    max: Option<Duration>,
}

impl LatencyTracker {
    fn new() -> Self {
        Self::with_capacity(4096)
    }

    fn with_capacity(max_samples: usize) -> Self {
        Self {
            samples: Vec::with_capacity(max_samples.min(256)),
            count: 0,
            max_samples,
            sum: Duration::ZERO,
            min: None,
            max: None,
        }
    }

    fn record(&mut self, latency: Duration) {
        self.count += 1;
        self.sum += latency;
        self.min = Some(self.min.map_or(latency, |m| m.min(latency)));
        self.max = Some(self.max.map_or(latency, |m| m.max(latency)));

        if self.samples.len() < self.max_samples {
            self.samples.push(latency);
        } else {
            let idx = rand::random::<usize>() % self.count as usize;
            if idx < self.max_samples {
                self.samples[idx] = latency;
            }
        }
    }

    fn stats(&self) -> LatencyStats {
        if self.count == 0 {
            return LatencyStats::default();
        }

        let mut sorted: Vec<f64> = self
            .samples
            .iter()
            .map(|d| d.as_secs_f64() * 1000.0)
            .collect();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let percentile = |p: f64| -> f64 {
            if sorted.is_empty() {
                return 0.0;
            }
            let idx = ((p / 100.0) * (sorted.len() - 1) as f64) as usize;
            sorted[idx.min(sorted.len() - 1)]
        };

        LatencyStats {
            count: self.count,
            mean_ms: self.sum.as_secs_f64() * 1000.0 / self.count as f64,
            min_ms: self.min.map_or(0.0, |d| d.as_secs_f64() * 1000.0),
            max_ms: self.max.map_or(0.0, |d| d.as_secs_f64() * 1000.0),
            p50_ms: percentile(50.0),
            p99_ms: percentile(99.0),
        }
    }
}

/// Latency statistics in milliseconds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    pub count: u64,
    pub mean_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub p50_ms: f64,
    pub p99_ms: f64,
}
