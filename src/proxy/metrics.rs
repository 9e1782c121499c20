//! Request counters exposed to the observability collector.
//!
//! The proxy only emits facts; formatting and shipping them is out of
//! scope. Counters are atomics so recording never contends with request
//! handling.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

/// Atomic counters recorded during request handling.
#[derive(Debug, Default)]
pub struct ProxyMetrics {
    searches_total: AtomicU64,
    degraded_searches: AtomicU64,
    backend_unreachable_total: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    tokenize_total: AtomicU64,
    dictionary_reloads: AtomicU64,
    search_latency_nanos: AtomicU64,
    max_search_latency_nanos: AtomicU64,
}

/// A point-in-time copy of the counters.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct MetricsSnapshot {
    /// Completed proxy searches (cache hits included).
    pub searches_total: u64,

    /// Searches where at least one variant failed or timed out.
    pub degraded_searches: u64,

    /// Searches rejected because the backend was entirely unreachable.
    pub backend_unreachable_total: u64,

    /// Cache hits.
    pub cache_hits: u64,

    /// Cache misses.
    pub cache_misses: u64,

    /// Tokenize-only requests.
    pub tokenize_total: u64,

    /// Dictionary snapshot reloads.
    pub dictionary_reloads: u64,

    /// Average end-to-end search latency in milliseconds.
    pub avg_search_latency_ms: f64,

    /// Maximum end-to-end search latency in milliseconds.
    pub max_search_latency_ms: f64,
}

impl ProxyMetrics {
    /// Create a zeroed collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed search.
    pub fn record_search(&self, latency: Duration, degraded: bool) {
        self.searches_total.fetch_add(1, Ordering::Relaxed);
        if degraded {
            self.degraded_searches.fetch_add(1, Ordering::Relaxed);
        }

        let nanos = latency.as_nanos() as u64;
        self.search_latency_nanos.fetch_add(nanos, Ordering::Relaxed);
        self.max_search_latency_nanos
            .fetch_max(nanos, Ordering::Relaxed);
    }

    /// Record a search that failed because the backend was unreachable.
    pub fn record_backend_unreachable(&self) {
        self.backend_unreachable_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a cache hit or miss.
    pub fn record_cache(&self, hit: bool) {
        if hit {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.cache_misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record one tokenize-only request.
    pub fn record_tokenize(&self) {
        self.tokenize_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one dictionary reload.
    pub fn record_reload(&self) {
        self.dictionary_reloads.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a snapshot of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let searches = self.searches_total.load(Ordering::Relaxed);
        let total_nanos = self.search_latency_nanos.load(Ordering::Relaxed);
        let avg_ms = if searches > 0 {
            total_nanos as f64 / searches as f64 / 1_000_000.0
        } else {
            0.0
        };

        MetricsSnapshot {
            searches_total: searches,
            degraded_searches: self.degraded_searches.load(Ordering::Relaxed),
            backend_unreachable_total: self.backend_unreachable_total.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            tokenize_total: self.tokenize_total.load(Ordering::Relaxed),
            dictionary_reloads: self.dictionary_reloads.load(Ordering::Relaxed),
            avg_search_latency_ms: avg_ms,
            max_search_latency_ms: self.max_search_latency_nanos.load(Ordering::Relaxed) as f64
                / 1_000_000.0,
        }
    }
}
