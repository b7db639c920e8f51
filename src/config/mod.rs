// src/config/mod.rs
//! Engine configuration: fetch tuning, scoring weights, search and health
//! settings, and the source table.
//!
//! Resolution order for [`EngineConfig::from_toml`]:
//! 1) `$FEEDS_CONFIG_PATH` (must exist)
//! 2) `config/feeds.toml` relative to the working dir
//! 3) the built-in table compiled into the binary
//!
//! `$FEEDS_ACCEPTANCE_THRESHOLD` overrides `[scoring].acceptance_threshold`.

pub mod scoring;
pub mod sources;

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::ingest::retry::RetryPolicy;

pub use scoring::{MatchMode, ScoringWeights};
pub use sources::{CredibilityTier, SourceConfig};

// --- env defaults & names ---
pub const DEFAULT_FEEDS_CONFIG_PATH: &str = "config/feeds.toml";
pub const ENV_FEEDS_CONFIG_PATH: &str = "FEEDS_CONFIG_PATH";
pub const ENV_ACCEPTANCE_THRESHOLD: &str = "FEEDS_ACCEPTANCE_THRESHOLD";

const BUILTIN_FEEDS_TOML: &str = include_str!("../../config/feeds.toml");

pub const DEFAULT_ACCEPT: &str = "application/rss+xml, application/xml, text/xml";
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; NewsfeedRanker/1.0; +https://example.com/bot)";

/// HTTP and retry tuning shared by every fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    /// Total attempts per fetch, including the first.
    pub max_retries: u32,
    pub base_delay_ms: u64,
    /// Clamped to half of `base_delay_ms` when building the retry policy.
    pub max_jitter_ms: u64,
    pub max_redirects: u32,
    pub user_agent: String,
    pub accept: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
            request_timeout_secs: 15,
            max_retries: 3,
            base_delay_ms: 1000,
            max_jitter_ms: 250,
            max_redirects: 5,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept: DEFAULT_ACCEPT.to_string(),
        }
    }
}

impl FetchSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry_policy_with(self.max_retries)
    }

    pub fn retry_policy_with(&self, max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(
            max_retries,
            Duration::from_millis(self.base_delay_ms),
            Duration::from_millis(self.max_jitter_ms),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub max_entries_per_feed: usize,
    /// A source stops walking its feed list once it has this many qualifying entries.
    pub min_qualifying_per_source: usize,
    /// Optional cap on each source task; a source that overruns contributes nothing.
    pub deadline_secs: Option<u64>,
    pub default_max_results: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            max_entries_per_feed: 30,
            min_qualifying_per_source: 3,
            deadline_secs: None,
            default_max_results: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthSettings {
    pub sample_size: usize,
    pub probe_retries: u32,
    pub min_healthy_bytes: usize,
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            sample_size: 3,
            probe_retries: 1,
            min_healthy_bytes: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub fetch: FetchSettings,
    #[serde(default)]
    pub scoring: ScoringWeights,
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub health: HealthSettings,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

impl EngineConfig {
    /// Resolve the config file via env + fallbacks, then apply env overrides.
    pub fn from_toml() -> anyhow::Result<Self> {
        let mut cfg = match std::env::var(ENV_FEEDS_CONFIG_PATH) {
            Ok(p) => {
                let path = PathBuf::from(p);
                if !path.exists() {
                    return Err(anyhow!(
                        "{ENV_FEEDS_CONFIG_PATH} points to non-existent path {}",
                        path.display()
                    ));
                }
                Self::from_path(&path)?
            }
            Err(_) => {
                let default = PathBuf::from(DEFAULT_FEEDS_CONFIG_PATH);
                if default.exists() {
                    Self::from_path(&default)?
                } else {
                    Self::builtin()?
                }
            }
        };

        if let Some(t) = parse_threshold_env(std::env::var(ENV_ACCEPTANCE_THRESHOLD).ok()) {
            cfg.scoring.acceptance_threshold = t;
        }
        Ok(cfg)
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading feeds config from {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("loading feeds config from {}", path.display()))
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(toml_str: &str) -> anyhow::Result<Self> {
        let cfg: EngineConfig = toml::from_str(toml_str)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// The source table compiled into the binary.
    pub fn builtin() -> anyhow::Result<Self> {
        Self::from_toml_str(BUILTIN_FEEDS_TOML).context("built-in feeds config")
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError::NoSources);
        }
        let mut seen = HashSet::new();
        for s in &self.sources {
            s.validate()?;
            if !seen.insert(s.id.as_str()) {
                return Err(ConfigError::DuplicateSourceId(s.id.clone()));
            }
        }
        if self.fetch.max_retries == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "fetch.max_retries",
                reason: "must be at least 1".into(),
            });
        }
        if self.fetch.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "fetch.request_timeout_secs",
                reason: "must be at least 1".into(),
            });
        }
        if self.search.max_entries_per_feed == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "search.max_entries_per_feed",
                reason: "must be at least 1".into(),
            });
        }
        // a zero quota would end every source scan before its first feed
        if self.search.min_qualifying_per_source == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "search.min_qualifying_per_source",
                reason: "must be at least 1".into(),
            });
        }
        if self.health.probe_retries == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "health.probe_retries",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

fn parse_threshold_env(raw: Option<String>) -> Option<i32> {
    raw.and_then(|s| s.trim().parse::<i32>().ok())
        .map(|v| v.max(0))
}
