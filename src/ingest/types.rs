// src/ingest/types.rs

/// One parsed feed item, already cleaned. Lives for a single search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
    pub summary: String,
    /// Raw date string as published by the feed (may be empty).
    pub published: String,
    /// Unix seconds, when `published` parses as RFC 2822 or RFC 3339.
    pub published_at: Option<i64>,
    pub source_id: String,
}

impl FeedEntry {
    /// Text the scorer sees: title and summary joined by a space.
    pub fn scoring_text(&self) -> String {
        let mut s = String::with_capacity(self.title.len() + self.summary.len() + 1);
        s.push_str(&self.title);
        s.push(' ');
        s.push_str(&self.summary);
        s
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFeed {
    /// Channel/feed-level link, empty when the feed has none.
    pub home_url: String,
    pub entries: Vec<FeedEntry>,
}
