// src/aggregator.rs
//! Fan-out search across all configured sources.
//!
//! One tokio task per source. Inside a task feeds are tried one at a time:
//! primaries first, then backups, stopping once enough qualifying entries
//! are collected. A source that fails (or panics, or overruns the optional
//! deadline) contributes nothing. Results are merged in source order,
//! deduplicated by URL, ranked, and truncated.

use serde::Serialize;
use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::analyze::{self, RelevanceScorer};
use crate::config::{CredibilityTier, EngineConfig, HealthSettings, SearchSettings, SourceConfig};
use crate::error::ConfigError;
use crate::health::{self, HealthReport};
use crate::ingest::{parse_feed, FeedCache, FeedFetcher, FeedTransport};
use crate::metrics::{FeedMetrics, MetricsSnapshot};

pub const MAX_KEYWORD_CHARS: usize = 200;

/// A ranked search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoredArticle {
    pub title: String,
    pub url: String,
    pub summary: String,
    pub published: String,
    pub published_at: Option<i64>,
    pub source_id: String,
    pub source_name: String,
    pub credibility_tier: CredibilityTier,
    pub region: String,
    pub relevance_score: i32,
    pub feed_home_url: String,
    /// Characters in "title summary", the text that was scored.
    pub content_length: usize,
}

impl ScoredArticle {
    pub fn credibility_weight(&self) -> u8 {
        self.credibility_tier.weight()
    }
}

pub struct FeedAggregator {
    sources: Arc<[Arc<SourceConfig>]>,
    fetcher: Arc<FeedFetcher>,
    scorer: Arc<RelevanceScorer>,
    cache: Arc<FeedCache>,
    metrics: Arc<FeedMetrics>,
    transport: Arc<dyn FeedTransport>,
    search: SearchSettings,
    health: HealthSettings,
    closed: AtomicBool,
}

impl FeedAggregator {
    pub fn new(config: EngineConfig, transport: Arc<dyn FeedTransport>) -> Result<Self, ConfigError> {
        config.validate()?;
        let EngineConfig {
            fetch,
            scoring,
            search,
            health,
            sources,
        } = config;

        let cache = Arc::new(FeedCache::new());
        let metrics = Arc::new(FeedMetrics::new());
        let fetcher = Arc::new(FeedFetcher::new(
            Arc::clone(&transport),
            Arc::clone(&cache),
            Arc::clone(&metrics),
            fetch,
        ));

        info!(target: "aggregator", sources = sources.len(), "feed aggregator ready");

        Ok(Self {
            sources: sources.into_iter().map(Arc::new).collect(),
            fetcher,
            scorer: Arc::new(RelevanceScorer::new(scoring)),
            cache,
            metrics,
            transport,
            search,
            health,
            closed: AtomicBool::new(false),
        })
    }

    pub fn sources(&self) -> &[Arc<SourceConfig>] {
        &self.sources
    }

    pub fn scorer(&self) -> &RelevanceScorer {
        &self.scorer
    }

    pub fn search_settings(&self) -> &SearchSettings {
        &self.search
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Ranked, URL-unique articles for `keywords`. An empty keyword list
    /// scores each source against its own static keywords.
    ///
    /// Fetch and parse failures never surface here; only caller and
    /// lifecycle errors do.
    pub async fn search<S: AsRef<str>>(
        &self,
        keywords: &[S],
        max_results: usize,
    ) -> Result<Vec<ScoredArticle>, ConfigError> {
        if self.is_closed() {
            return Err(ConfigError::Closed);
        }
        if max_results == 0 {
            return Err(ConfigError::InvalidMaxResults);
        }
        let keywords: Arc<[String]> = normalize_keywords(keywords)?.into();
        let started = Instant::now();
        let deadline = self.search.deadline_secs.map(Duration::from_secs);

        let handles: Vec<_> = self
            .sources
            .iter()
            .map(|source| {
                let source = Arc::clone(source);
                let fetcher = Arc::clone(&self.fetcher);
                let scorer = Arc::clone(&self.scorer);
                let metrics = Arc::clone(&self.metrics);
                let keywords = Arc::clone(&keywords);
                let settings = self.search.clone();
                tokio::spawn(async move {
                    let work = search_source(&fetcher, &scorer, &source, &keywords, &settings);
                    let found = match deadline {
                        Some(limit) => match tokio::time::timeout(limit, work).await {
                            Ok(found) => found,
                            Err(_) => {
                                warn!(target: "aggregator", source = %source.id, "source exceeded search deadline");
                                Vec::new()
                            }
                        },
                        None => work.await,
                    };
                    metrics.record_articles(found.len());
                    found
                })
            })
            .collect();

        // join in source order so merge order is deterministic
        let mut per_source = Vec::with_capacity(handles.len());
        for (handle, source) in handles.into_iter().zip(self.sources.iter()) {
            match handle.await {
                Ok(found) => per_source.push(found),
                Err(e) => {
                    warn!(target: "aggregator", source = %source.id, error = %e, "source task failed");
                    per_source.push(Vec::new());
                }
            }
        }

        let candidates: usize = per_source.iter().map(Vec::len).sum();
        let ranked = merge_and_rank(per_source, max_results);
        info!(
            target: "aggregator",
            keywords = keywords.len(),
            candidates,
            returned = ranked.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "search finished"
        );
        Ok(ranked)
    }

    pub fn extract_keywords(&self, title: &str, content: &str) -> Vec<String> {
        analyze::extract_keywords_with(title, content, self.scorer.weights().match_mode)
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot(self.cache.len(), self.sources.len())
    }

    pub async fn health_check(&self) -> HealthReport {
        health::probe_sources(&self.fetcher, &self.sources, &self.health).await
    }

    /// Release the HTTP client and drop cached payloads. Later searches fail
    /// with `ConfigError::Closed`.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.transport.close().await;
        self.cache.clear();
        info!(target: "aggregator", "feed aggregator closed");
    }

    /// Closes the aggregator once `signal` resolves.
    pub fn close_on<F>(self: &Arc<Self>, signal: F) -> tokio::task::JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            signal.await;
            this.close().await;
        })
    }
}

/// Trim, drop blanks, dedupe case-insensitively (first spelling wins).
pub fn normalize_keywords<S: AsRef<str>>(keywords: &[S]) -> Result<Vec<String>, ConfigError> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for kw in keywords {
        let kw = kw.as_ref().trim();
        if kw.is_empty() {
            continue;
        }
        if kw.chars().count() > MAX_KEYWORD_CHARS {
            return Err(ConfigError::InvalidKeywords(format!(
                "keyword longer than {MAX_KEYWORD_CHARS} characters"
            )));
        }
        if seen.insert(kw.to_lowercase()) {
            out.push(kw.to_string());
        }
    }
    if out.is_empty() && !keywords.is_empty() {
        return Err(ConfigError::InvalidKeywords("no usable keywords".into()));
    }
    Ok(out)
}

/// Dedupe by URL (first wins), stable sort by score then credibility, truncate.
pub fn merge_and_rank(per_source: Vec<Vec<ScoredArticle>>, max_results: usize) -> Vec<ScoredArticle> {
    let mut seen = HashSet::new();
    let mut merged: Vec<ScoredArticle> = per_source
        .into_iter()
        .flatten()
        .filter(|a| seen.insert(a.url.clone()))
        .collect();

    merged.sort_by(|a, b| {
        b.relevance_score
            .cmp(&a.relevance_score)
            .then_with(|| b.credibility_weight().cmp(&a.credibility_weight()))
    });
    merged.truncate(max_results);
    merged
}

async fn search_source(
    fetcher: &FeedFetcher,
    scorer: &RelevanceScorer,
    source: &SourceConfig,
    keywords: &[String],
    settings: &SearchSettings,
) -> Vec<ScoredArticle> {
    let keywords = if keywords.is_empty() {
        source.static_keywords.as_slice()
    } else {
        keywords
    };
    let enough = settings.min_qualifying_per_source;
    let mut found = Vec::new();

    for url in &source.primary_feed_urls {
        if found.len() >= enough {
            break;
        }
        collect_feed(fetcher, scorer, source, url, keywords, settings, &mut found).await;
    }

    if found.len() < enough && !source.backup_feed_urls.is_empty() {
        debug!(
            target: "aggregator",
            source = %source.id,
            found = found.len(),
            "primary feeds short, trying backups"
        );
        for url in &source.backup_feed_urls {
            if found.len() >= enough {
                break;
            }
            collect_feed(fetcher, scorer, source, url, keywords, settings, &mut found).await;
        }
    }

    debug!(target: "aggregator", source = %source.id, found = found.len(), "source done");
    found
}

async fn collect_feed(
    fetcher: &FeedFetcher,
    scorer: &RelevanceScorer,
    source: &SourceConfig,
    url: &str,
    keywords: &[String],
    settings: &SearchSettings,
    found: &mut Vec<ScoredArticle>,
) {
    // failures are logged and counted by the fetcher
    let Ok(body) = fetcher.fetch(url, source).await else {
        return;
    };
    let feed = parse_feed(&body, &source.id, settings.max_entries_per_feed);
    let home = if feed.home_url.is_empty() {
        url.to_string()
    } else {
        feed.home_url
    };

    for entry in feed.entries {
        if found.iter().any(|a: &ScoredArticle| a.url == entry.link) {
            continue;
        }
        let text = entry.scoring_text();
        let score = scorer.score(&text, keywords, source.credibility_tier);
        if !scorer.accepts(score) {
            continue;
        }
        found.push(ScoredArticle {
            content_length: text.chars().count(),
            title: entry.title,
            url: entry.link,
            summary: entry.summary,
            published: entry.published,
            published_at: entry.published_at,
            source_id: source.id.clone(),
            source_name: source.name.clone(),
            credibility_tier: source.credibility_tier,
            region: source.region.clone(),
            relevance_score: score,
            feed_home_url: home.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(url: &str, score: i32, tier: CredibilityTier) -> ScoredArticle {
        ScoredArticle {
            title: url.to_string(),
            url: url.to_string(),
            summary: String::new(),
            published: String::new(),
            published_at: None,
            source_id: "s".into(),
            source_name: "S".into(),
            credibility_tier: tier,
            region: "Global".into(),
            relevance_score: score,
            feed_home_url: String::new(),
            content_length: 0,
        }
    }

    #[test]
    fn keyword_normalization() {
        let out = normalize_keywords(&[" Fed ", "fed", "", "Inflation"]).unwrap();
        assert_eq!(out, vec!["Fed", "Inflation"]);
        assert!(normalize_keywords::<&str>(&[]).unwrap().is_empty());
        assert!(matches!(
            normalize_keywords(&["  ", ""]),
            Err(ConfigError::InvalidKeywords(_))
        ));
        let long = "x".repeat(MAX_KEYWORD_CHARS + 1);
        assert!(normalize_keywords(&[long]).is_err());
    }

    #[test]
    fn merge_dedupes_first_wins_then_ranks() {
        use CredibilityTier::*;
        let a = vec![article("u1", 5, High), article("u2", 7, High)];
        let b = vec![article("u1", 9, VeryHigh), article("u3", 7, VeryHigh)];
        let out = merge_and_rank(vec![a, b], 10);
        let urls: Vec<_> = out.iter().map(|x| x.url.as_str()).collect();
        // u1 keeps the first (score 5) copy; u3 beats u2 on credibility
        assert_eq!(urls, vec!["u3", "u2", "u1"]);
        assert_eq!(out[2].relevance_score, 5);
    }

    #[test]
    fn merge_truncates_and_is_stable() {
        use CredibilityTier::*;
        let a = vec![article("a", 4, High), article("b", 4, High), article("c", 4, High)];
        let out = merge_and_rank(vec![a], 2);
        let urls: Vec<_> = out.iter().map(|x| x.url.as_str()).collect();
        assert_eq!(urls, vec!["a", "b"]);
    }
}
