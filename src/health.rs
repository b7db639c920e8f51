// src/health.rs
//! Feed health probe.
//!
//! Fetches the first feed of a small sample of sources with a single
//! attempt, bypassing the payload cache, and grades the result.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::info;

use crate::config::{HealthSettings, SourceConfig};
use crate::ingest::FeedFetcher;

const MAX_ERROR_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallHealth {
    Excellent,
    Good,
    Degraded,
    Poor,
}

impl OverallHealth {
    /// ≥80% excellent, ≥60% good, ≥40% degraded, otherwise poor (including 0 of 0).
    pub fn from_ratio(healthy: usize, total: usize) -> Self {
        if total == 0 {
            return OverallHealth::Poor;
        }
        let ratio = healthy as f64 / total as f64;
        if ratio >= 0.8 {
            OverallHealth::Excellent
        } else if ratio >= 0.6 {
            OverallHealth::Good
        } else if ratio >= 0.4 {
            OverallHealth::Degraded
        } else {
            OverallHealth::Poor
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeStatus {
    Healthy,
    /// Payload came back but was too small to be a real feed.
    Degraded,
    Unhealthy(String),
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeStatus::Healthy => f.write_str("healthy"),
            ProbeStatus::Degraded => f.write_str("degraded"),
            ProbeStatus::Unhealthy(e) => write!(f, "unhealthy: {e}"),
        }
    }
}

impl Serialize for ProbeStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    /// "healthy" unless overall health is poor.
    pub status: String,
    pub timestamp: DateTime<Utc>,
    /// Keyed by source id.
    pub sources_status: BTreeMap<String, ProbeStatus>,
    pub overall_health: OverallHealth,
}

pub async fn probe_sources(
    fetcher: &FeedFetcher,
    sources: &[Arc<SourceConfig>],
    settings: &HealthSettings,
) -> HealthReport {
    let mut sources_status = BTreeMap::new();

    for source in sources.iter().take(settings.sample_size) {
        let Some(url) = source.all_feed_urls().next() else {
            continue;
        };
        let status = match fetcher
            .fetch_uncached(url, source, settings.probe_retries)
            .await
        {
            Ok(body) if body.len() > settings.min_healthy_bytes => ProbeStatus::Healthy,
            Ok(_) => ProbeStatus::Degraded,
            Err(e) => ProbeStatus::Unhealthy(e.to_string().chars().take(MAX_ERROR_CHARS).collect()),
        };
        sources_status.insert(source.id.clone(), status);
    }

    let healthy = sources_status
        .values()
        .filter(|s| **s == ProbeStatus::Healthy)
        .count();
    let overall_health = OverallHealth::from_ratio(healthy, sources_status.len());
    let status = if overall_health == OverallHealth::Poor {
        "unhealthy"
    } else {
        "healthy"
    };

    info!(
        target: "health",
        healthy,
        probed = sources_status.len(),
        overall = ?overall_health,
        "health check finished"
    );

    HealthReport {
        status: status.to_string(),
        timestamp: Utc::now(),
        sources_status,
        overall_health,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_bands() {
        assert_eq!(OverallHealth::from_ratio(3, 3), OverallHealth::Excellent);
        assert_eq!(OverallHealth::from_ratio(4, 5), OverallHealth::Excellent);
        assert_eq!(OverallHealth::from_ratio(2, 3), OverallHealth::Good);
        assert_eq!(OverallHealth::from_ratio(2, 5), OverallHealth::Degraded);
        assert_eq!(OverallHealth::from_ratio(1, 3), OverallHealth::Poor);
        assert_eq!(OverallHealth::from_ratio(0, 0), OverallHealth::Poor);
    }

    #[test]
    fn probe_status_serializes_as_text() {
        let s = serde_json::to_string(&ProbeStatus::Unhealthy("HTTP 503".into())).unwrap();
        assert_eq!(s, "\"unhealthy: HTTP 503\"");
        assert_eq!(
            serde_json::to_string(&OverallHealth::Excellent).unwrap(),
            "\"excellent\""
        );
    }
}
