// tests/common/mod.rs
//
// Shared helpers for integration tests: a scripted in-memory transport and
// small builders for sources, configs and RSS documents.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::time::Instant;

use newsfeed_ranker::config::{EngineConfig, FetchSettings};
use newsfeed_ranker::{CredibilityTier, FeedTransport, SourceConfig, TransportError, TransportResponse};

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum Step {
    Respond(TransportResponse),
    Fail(TransportError),
    /// Never completes.
    Hang,
}

pub fn ok(body: impl Into<String>) -> Step {
    Step::Respond(TransportResponse::ok(body))
}

pub fn status(code: u16) -> Step {
    Step::Respond(TransportResponse::status(code))
}

pub fn redirect(code: u16, location: &str) -> Step {
    Step::Respond(TransportResponse::redirect(code, location))
}

#[derive(Debug, Clone)]
pub struct Call {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub at: Instant,
}

/// Per-URL reply queues. The last step of a queue repeats forever; an
/// unscripted URL fails with a connection error.
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    calls: Mutex<Vec<Call>>,
    closed: AtomicBool,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, url: &str, steps: Vec<Step>) {
        self.scripts.lock().insert(url.to_string(), steps.into());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.url == url).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn call_times(&self, url: &str) -> Vec<Instant> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.url == url)
            .map(|c| c.at)
            .collect()
    }

    fn next_step(&self, url: &str) -> Step {
        let mut scripts = self.scripts.lock();
        match scripts.get_mut(url) {
            Some(q) if q.len() > 1 => q.pop_front().unwrap_or(Step::Hang),
            Some(q) => q
                .front()
                .cloned()
                .unwrap_or(Step::Fail(TransportError::Connect("empty script".into()))),
            None => Step::Fail(TransportError::Connect(format!("unscripted url {url}"))),
        }
    }
}

#[async_trait]
impl FeedTransport for ScriptedTransport {
    async fn get(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> Result<TransportResponse, TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        self.calls.lock().push(Call {
            url: url.to_string(),
            headers: headers.to_vec(),
            at: Instant::now(),
        });
        match self.next_step(url) {
            Step::Respond(r) => Ok(r),
            Step::Fail(e) => Err(e),
            Step::Hang => std::future::pending().await,
        }
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

pub fn source(
    id: &str,
    tier: CredibilityTier,
    primaries: &[&str],
    backups: &[&str],
) -> SourceConfig {
    SourceConfig {
        id: id.to_string(),
        name: format!("{id} news"),
        primary_feed_urls: primaries.iter().map(|s| s.to_string()).collect(),
        backup_feed_urls: backups.iter().map(|s| s.to_string()).collect(),
        credibility_tier: tier,
        region: "Global".to_string(),
        headers: BTreeMap::new(),
        user_agent: None,
        static_keywords: Vec::new(),
        cache_ttl_secs: 900,
    }
}

pub fn config(sources: Vec<SourceConfig>) -> EngineConfig {
    EngineConfig {
        fetch: FetchSettings::default(),
        sources,
        ..EngineConfig::default()
    }
}

/// Minimal RSS 2.0 document from `(title, link, description)` triples.
pub fn rss(items: &[(&str, &str, &str)]) -> String {
    let mut out = String::from(
        "<?xml version=\"1.0\"?><rss version=\"2.0\"><channel><title>Test</title><link>https://home.example/</link>",
    );
    for (title, link, desc) in items {
        out.push_str(&format!(
            "<item><title>{title}</title><link>{link}</link><description>{desc}</description></item>"
        ));
    }
    out.push_str("</channel></rss>");
    out
}

/// Neutral padding (no topic or quality words) to push text past 100 chars.
pub const FILLER: &str =
    "Readers can find the full story on the website along with related coverage from our reporters.";
