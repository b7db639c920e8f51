// src/ingest/mod.rs
pub mod cache;
pub mod fetcher;
pub mod parser;
pub mod retry;
pub mod transport;
pub mod types;

pub use cache::{cache_key, FeedCache};
pub use fetcher::FeedFetcher;
pub use parser::parse_feed;
pub use transport::{FeedTransport, ReqwestTransport, TransportResponse};
pub use types::{FeedEntry, ParsedFeed};

use once_cell::sync::Lazy;
use regex::Regex;

static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Clean feed text: decode entities, strip tags, ASCII quotes, collapse whitespace.
/// Never truncates.
pub fn clean_text(s: &str) -> String {
    // 1) HTML entity decode
    let out = html_escape::decode_html_entities(s);

    // 2) Strip HTML tags
    let out = RE_TAGS.replace_all(&out, "");

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    let out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    RE_WS.replace_all(&out, " ").trim().to_string()
}
