// src/ingest/fetcher.rs
//! Cache-first feed fetcher.
//!
//! Redirects are followed inside a single attempt and never consume a retry.
//! 429, 5xx and transport failures are retried with backoff; any other
//! non-2xx status fails immediately.

use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::{FetchSettings, SourceConfig};
use crate::error::FetchError;
use crate::ingest::cache::{cache_key, FeedCache};
use crate::ingest::retry::{retry_with_backoff, AttemptError};
use crate::ingest::transport::FeedTransport;
use crate::metrics::FeedMetrics;

pub struct FeedFetcher {
    transport: Arc<dyn FeedTransport>,
    cache: Arc<FeedCache>,
    metrics: Arc<FeedMetrics>,
    settings: FetchSettings,
}

fn is_redirect(status: u16) -> bool {
    matches!(status, 301 | 302 | 303 | 307 | 308)
}

/// Resolve a `Location` header against the URL that produced it.
fn resolve_location(base: &str, location: &str) -> Option<String> {
    let location = location.trim();
    if location.is_empty() {
        return None;
    }
    url::Url::parse(base)
        .and_then(|b| b.join(location))
        .ok()
        .map(String::from)
}

impl FeedFetcher {
    pub fn new(
        transport: Arc<dyn FeedTransport>,
        cache: Arc<FeedCache>,
        metrics: Arc<FeedMetrics>,
        settings: FetchSettings,
    ) -> Self {
        Self {
            transport,
            cache,
            metrics,
            settings,
        }
    }

    pub fn settings(&self) -> &FetchSettings {
        &self.settings
    }

    /// Fetch with the configured retry budget.
    pub async fn fetch(&self, url: &str, source: &SourceConfig) -> Result<Arc<str>, FetchError> {
        self.fetch_with_retries(url, source, self.settings.max_retries)
            .await
    }

    /// Serve from cache when fresh, otherwise hit the network and cache the payload.
    pub async fn fetch_with_retries(
        &self,
        url: &str,
        source: &SourceConfig,
        max_retries: u32,
    ) -> Result<Arc<str>, FetchError> {
        let key = cache_key(url);
        if let Some(hit) = self.cache.get(&key, source.cache_ttl()) {
            self.metrics.record_cache_hit();
            debug!(target: "ingest", source = %source.id, url, "cache hit");
            return Ok(hit);
        }
        self.metrics.record_cache_miss();
        self.fetch_from_network(url, source, max_retries, key).await
    }

    /// Skip the cache read. A successful payload still refreshes the cache.
    pub async fn fetch_uncached(
        &self,
        url: &str,
        source: &SourceConfig,
        max_retries: u32,
    ) -> Result<Arc<str>, FetchError> {
        self.fetch_from_network(url, source, max_retries, cache_key(url))
            .await
    }

    /// Defaults first, then the source's own headers replace them by name.
    pub fn request_headers(&self, source: &SourceConfig) -> Vec<(String, String)> {
        let ua = source
            .user_agent
            .clone()
            .unwrap_or_else(|| self.settings.user_agent.clone());
        let mut headers = vec![
            ("Accept".to_string(), self.settings.accept.clone()),
            ("User-Agent".to_string(), ua),
        ];
        for (name, value) in &source.headers {
            headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
            headers.push((name.clone(), value.clone()));
        }
        headers
    }

    async fn fetch_from_network(
        &self,
        url: &str,
        source: &SourceConfig,
        max_retries: u32,
        key: String,
    ) -> Result<Arc<str>, FetchError> {
        let headers = self.request_headers(source);
        let policy = self.settings.retry_policy_with(max_retries);

        // only the successful attempt is timed, not the backoff before it
        let outcome = retry_with_backoff(&policy, url, |_| {
            let headers = &headers;
            async move {
                let started = Instant::now();
                match self.attempt(url, headers).await {
                    Ok(body) => Ok((body, started.elapsed())),
                    Err(e) if e.is_retryable() => Err(AttemptError::Retryable(e)),
                    Err(e) => Err(AttemptError::Fatal(e)),
                }
            }
        })
        .await;

        match outcome {
            Ok((body, elapsed)) => {
                let payload: Arc<str> = Arc::from(body);
                self.cache.set(key, Arc::clone(&payload));
                self.metrics.record_success(&source.name, elapsed);
                debug!(
                    target: "ingest",
                    source = %source.id,
                    url,
                    bytes = payload.len(),
                    "feed fetched"
                );
                Ok(payload)
            }
            Err(failure) => {
                self.metrics.record_failure(&source.name);
                let err = if failure.last.is_retryable() {
                    FetchError::Exhausted {
                        attempts: failure.attempts,
                        last: Box::new(failure.last),
                    }
                } else {
                    failure.last
                };
                warn!(
                    target: "ingest",
                    source = %source.id,
                    url,
                    error = %err,
                    "feed fetch failed"
                );
                Err(err)
            }
        }
    }

    /// One attempt: GET plus any redirect hops.
    async fn attempt(&self, url: &str, headers: &[(String, String)]) -> Result<String, FetchError> {
        let mut current = url.to_string();
        let mut hops = 0u32;
        loop {
            self.metrics.record_request();
            let resp = self.transport.get(&current, headers).await?;

            if (200..300).contains(&resp.status) {
                return Ok(resp.body);
            }
            if !is_redirect(resp.status) {
                return Err(FetchError::Status {
                    status: resp.status,
                    url: current,
                });
            }

            let next = resp
                .location
                .as_deref()
                .and_then(|loc| resolve_location(&current, loc))
                .ok_or_else(|| FetchError::BadRedirect {
                    url: current.clone(),
                })?;
            hops += 1;
            if hops > self.settings.max_redirects {
                return Err(FetchError::TooManyRedirects {
                    url: url.to_string(),
                });
            }
            debug!(target: "ingest", from = %current, to = %next, status = resp.status, "following redirect");
            current = next;
        }
    }
}
