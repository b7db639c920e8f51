// src/config/sources.rs
//! # Feed sources
//!
//! Typed, immutable description of one news outlet: its primary and backup
//! feed URLs, editorial credibility tier, region, request headers and the
//! keywords used when a caller searches without any.
//!
//! Tier names are matched leniently ("Very High", "very_high", "VeryHigh"),
//! using the same normalization as the rest of the config layer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_CACHE_TTL_SECS: u64 = 900;
pub const MAX_CACHE_TTL_SECS: u64 = 86_400;

/// Coarse editorial-trust ranking of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CredibilityTier {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl CredibilityTier {
    /// Ranking tie-break weight: VeryHigh 3, High 2, everything else 1.
    pub fn weight(self) -> u8 {
        match self {
            CredibilityTier::VeryHigh => 3,
            CredibilityTier::High => 2,
            CredibilityTier::Medium | CredibilityTier::Low => 1,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CredibilityTier::VeryHigh => "Very High",
            CredibilityTier::High => "High",
            CredibilityTier::Medium => "Medium",
            CredibilityTier::Low => "Low",
        }
    }

    /// Lenient parse; `None` for unknown tiers.
    pub fn parse(raw: &str) -> Option<Self> {
        match normalize(raw).replace(' ', "").as_str() {
            "veryhigh" => Some(CredibilityTier::VeryHigh),
            "high" => Some(CredibilityTier::High),
            "medium" => Some(CredibilityTier::Medium),
            "low" => Some(CredibilityTier::Low),
            _ => None,
        }
    }
}

impl fmt::Display for CredibilityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl TryFrom<String> for CredibilityTier {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("unknown credibility tier `{value}`"))
    }
}

impl From<CredibilityTier> for String {
    fn from(t: CredibilityTier) -> Self {
        t.label().to_string()
    }
}

fn default_region() -> String {
    "Global".to_string()
}

fn default_cache_ttl_secs() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}

/// One configured news source. Loaded once at startup, read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub primary_feed_urls: Vec<String>,
    #[serde(default)]
    pub backup_feed_urls: Vec<String>,
    #[serde(alias = "credibility")]
    pub credibility_tier: CredibilityTier,
    #[serde(default = "default_region")]
    pub region: String,
    /// Extra request headers; they override the defaults (`Accept`, `User-Agent`).
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Keywords scored against this source's entries when a search has none.
    #[serde(default, alias = "keywords")]
    pub static_keywords: Vec<String>,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

impl SourceConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Primary URLs followed by backups.
    pub fn all_feed_urls(&self) -> impl Iterator<Item = &str> {
        self.primary_feed_urls
            .iter()
            .chain(self.backup_feed_urls.iter())
            .map(String::as_str)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidSource {
            id: self.id.clone(),
            reason,
        };

        if self.id.trim().is_empty() {
            return Err(invalid("id must not be blank".into()));
        }
        if self.name.trim().is_empty() {
            return Err(invalid("name must not be blank".into()));
        }
        if self.primary_feed_urls.is_empty() && self.backup_feed_urls.is_empty() {
            return Err(invalid("no feed urls".into()));
        }
        for u in self.all_feed_urls() {
            url::Url::parse(u).map_err(|e| invalid(format!("bad feed url `{u}`: {e}")))?;
        }
        if self.cache_ttl_secs == 0 || self.cache_ttl_secs > MAX_CACHE_TTL_SECS {
            return Err(invalid(format!(
                "cache_ttl_secs must be within 1..={MAX_CACHE_TTL_SECS}"
            )));
        }
        Ok(())
    }
}

/// Normalize input string: lowercase, replace punctuation/dashes with spaces,
/// collapse multiple spaces into one.
pub(crate) fn normalize(s: &str) -> String {
    let mut out = s.trim().to_ascii_lowercase();

    for ch in ['—', '–', '-', '_', '/', '\\'] {
        out = out.replace(ch, " ");
    }
    out = out.replace(['\n', '\r', '\t', '.', ',', '\''], " ");

    // camelCase tiers ("VeryHigh") were lowercased above, so spaces are
    // stripped by the caller where they don't matter.
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}
