// src/metrics.rs
//! Fetch/cache counters.
//!
//! [`FeedMetrics`] is the in-process source of truth behind
//! `FeedAggregator::metrics()`. Every update is mirrored to the `metrics`
//! facade, so a Prometheus recorder (see [`PrometheusMetrics`]) sees the
//! same series when one is installed. Without a recorder those calls are
//! no-ops.

use axum::{routing::get, Router};
use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// One-time metrics registration (so series show up on /metrics/prometheus).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feed_requests_total", "HTTP attempts issued to feed URLs.");
        describe_counter!("feed_fetch_success_total", "Feed fetches that returned a payload.");
        describe_counter!(
            "feed_fetch_failed_total",
            "Feed fetches that failed after retries."
        );
        describe_counter!("feed_cache_hits_total", "Fetches served from the payload cache.");
        describe_counter!("feed_cache_misses_total", "Fetches that missed the payload cache.");
        describe_counter!(
            "feed_articles_found_total",
            "Qualifying articles produced by source tasks."
        );
        describe_histogram!("feed_fetch_duration_ms", "Successful fetch time in milliseconds.");
        describe_gauge!("feed_cache_entries", "Entries currently held in the payload cache.");
    });
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct SourceCounts {
    success: u64,
    total: u64,
}

#[derive(Debug)]
struct Counters {
    total_requests: u64,
    successful_requests: u64,
    failed_requests: u64,
    cache_hits: u64,
    cache_misses: u64,
    articles_found: u64,
    avg_response_time: Duration,
    per_source: BTreeMap<String, SourceCounts>,
    last_updated: DateTime<Utc>,
}

impl Default for Counters {
    fn default() -> Self {
        Self {
            total_requests: 0,
            successful_requests: 0,
            failed_requests: 0,
            cache_hits: 0,
            cache_misses: 0,
            articles_found: 0,
            avg_response_time: Duration::ZERO,
            per_source: BTreeMap::new(),
            last_updated: Utc::now(),
        }
    }
}

/// Process-lifetime counters, shared through `Arc`.
#[derive(Debug, Default)]
pub struct FeedMetrics {
    inner: Mutex<Counters>,
}

/// Per-source fetch outcome, rendered as `"s/t (x%)"`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeedSuccessRate {
    pub success: u64,
    pub total: u64,
    pub rate: f64,
}

impl fmt::Display for FeedSuccessRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({:.1}%)", self.success, self.total, self.rate)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub articles_found: u64,
    pub avg_response_time_secs: f64,
    /// successful fetches / attempts, percent
    pub success_rate: f64,
    pub cache_hit_rate: f64,
    pub feed_success_rates: BTreeMap<String, FeedSuccessRate>,
    pub last_updated: DateTime<Utc>,
    pub cache_size: usize,
    pub sources_available: usize,
}

fn percent(part: u64, whole: u64) -> f64 {
    part as f64 / whole.max(1) as f64 * 100.0
}

impl FeedMetrics {
    pub fn new() -> Self {
        ensure_metrics_described();
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Counters> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// One HTTP attempt (every retry and redirect hop counts).
    pub fn record_request(&self) {
        let mut c = self.lock();
        c.total_requests += 1;
        c.last_updated = Utc::now();
        counter!("feed_requests_total").increment(1);
    }

    pub fn record_cache_hit(&self) {
        self.lock().cache_hits += 1;
        counter!("feed_cache_hits_total").increment(1);
    }

    pub fn record_cache_miss(&self) {
        self.lock().cache_misses += 1;
        counter!("feed_cache_misses_total").increment(1);
    }

    pub fn record_success(&self, source_name: &str, elapsed: Duration) {
        let mut c = self.lock();
        c.successful_requests += 1;
        // running mean over successful fetches
        let n = c.successful_requests as u32;
        c.avg_response_time = if n <= 1 {
            elapsed
        } else {
            (c.avg_response_time * (n - 1) + elapsed) / n
        };
        let s = c.per_source.entry(source_name.to_string()).or_default();
        s.success += 1;
        s.total += 1;
        c.last_updated = Utc::now();
        drop(c);

        counter!("feed_fetch_success_total", "source" => source_name.to_string()).increment(1);
        histogram!("feed_fetch_duration_ms").record(elapsed.as_secs_f64() * 1_000.0);
    }

    pub fn record_failure(&self, source_name: &str) {
        let mut c = self.lock();
        c.failed_requests += 1;
        c.per_source.entry(source_name.to_string()).or_default().total += 1;
        c.last_updated = Utc::now();
        drop(c);

        counter!("feed_fetch_failed_total", "source" => source_name.to_string()).increment(1);
    }

    pub fn record_articles(&self, n: usize) {
        if n == 0 {
            return;
        }
        self.lock().articles_found += n as u64;
        counter!("feed_articles_found_total").increment(n as u64);
    }

    pub fn snapshot(&self, cache_size: usize, sources_available: usize) -> MetricsSnapshot {
        gauge!("feed_cache_entries").set(cache_size as f64);
        let c = self.lock();
        MetricsSnapshot {
            total_requests: c.total_requests,
            successful_requests: c.successful_requests,
            failed_requests: c.failed_requests,
            cache_hits: c.cache_hits,
            cache_misses: c.cache_misses,
            articles_found: c.articles_found,
            avg_response_time_secs: c.avg_response_time.as_secs_f64(),
            success_rate: percent(c.successful_requests, c.total_requests),
            cache_hit_rate: percent(c.cache_hits, c.cache_hits + c.cache_misses),
            feed_success_rates: c
                .per_source
                .iter()
                .map(|(name, s)| {
                    (
                        name.clone(),
                        FeedSuccessRate {
                            success: s.success,
                            total: s.total,
                            rate: percent(s.success, s.total),
                        },
                    )
                })
                .collect(),
            last_updated: c.last_updated,
            cache_size,
            sources_available,
        }
    }
}

/// Installed Prometheus recorder.
pub struct PrometheusMetrics {
    pub handle: PrometheusHandle,
}

impl PrometheusMetrics {
    /// Install the global recorder. Fails if another recorder is already installed.
    pub fn install() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| anyhow::anyhow!("prometheus: install recorder: {e}"))?;
        ensure_metrics_described();
        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics/prometheus` in the exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics/prometheus",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
