// src/ingest/cache.rs
//! In-memory TTL cache of raw feed payloads, keyed by a hash of the feed URL.
//!
//! Entries are replaced whole on refetch and dropped lazily when a read
//! finds them expired. There is no background sweeper.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct CacheEntry {
    payload: Arc<str>,
    stored_at: Instant,
}

#[derive(Debug, Default)]
pub struct FeedCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

/// `"rss_"` followed by the first 32 hex chars of SHA-256(url).
pub fn cache_key(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    let mut out = String::with_capacity(36);
    out.push_str("rss_");
    for b in digest.iter().take(16) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

impl FeedCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Payload stored under `key` if younger than `ttl`. Expired entries are removed.
    pub fn get(&self, key: &str, ttl: Duration) -> Option<Arc<str>> {
        let mut map = self.lock();
        match map.get(key) {
            Some(e) if e.stored_at.elapsed() < ttl => Some(Arc::clone(&e.payload)),
            Some(_) => {
                map.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn set(&self, key: String, payload: Arc<str>) {
        self.lock().insert(
            key,
            CacheEntry {
                payload,
                stored_at: Instant::now(),
            },
        );
    }

    /// Entry count, including expired entries not yet read.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_shape_is_stable() {
        let k = cache_key("https://feeds.reuters.com/reuters/businessNews");
        assert!(k.starts_with("rss_"));
        assert_eq!(k.len(), 36);
        assert!(k[4..].chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(k, cache_key("https://feeds.reuters.com/reuters/businessNews"));
        assert_ne!(k, cache_key("https://feeds.reuters.com/reuters/topNews"));
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_lazily() {
        let cache = FeedCache::new();
        let ttl = Duration::from_secs(900);
        cache.set("k".into(), Arc::from("<rss/>"));

        tokio::time::advance(Duration::from_secs(899)).await;
        assert_eq!(cache.get("k", ttl).as_deref(), Some("<rss/>"));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.len(), 1);
        assert!(cache.get("k", ttl).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn set_replaces_and_clear_empties() {
        let cache = FeedCache::new();
        cache.set("k".into(), Arc::from("a"));
        cache.set("k".into(), Arc::from("b"));
        assert_eq!(cache.get("k", Duration::from_secs(60)).as_deref(), Some("b"));
        cache.clear();
        assert!(cache.is_empty());
    }
}
