// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod aggregator;
pub mod api;
pub mod config;
pub mod error;
pub mod health;
pub mod metrics;

// Feed fetching, caching and parsing
pub mod ingest;

// Keyword extraction and relevance scoring
pub mod analyze;

// ---- Re-exports for stable public API ----
pub use crate::aggregator::{FeedAggregator, ScoredArticle};
pub use crate::api::router;
pub use crate::config::{CredibilityTier, EngineConfig, SourceConfig};
pub use crate::error::{ConfigError, FetchError, TransportError};
pub use crate::health::{HealthReport, OverallHealth, ProbeStatus};
pub use crate::ingest::{FeedTransport, ReqwestTransport, TransportResponse};
pub use crate::metrics::MetricsSnapshot;
