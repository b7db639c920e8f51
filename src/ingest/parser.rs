// src/ingest/parser.rs
//! Streaming RSS 2.0 / Atom 1.0 parser.
//!
//! Works on the qualified element path rather than a fixed schema, so both
//! formats (and the usual `content:encoded` / `dc:date` extensions) go
//! through the same loop. Entries without a title or link are skipped. A
//! syntax error ends parsing; entries completed before it are kept.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::borrow::Cow;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;
use tracing::warn;

use crate::ingest::clean_text;
use crate::ingest::types::{FeedEntry, ParsedFeed};

#[derive(Default)]
struct EntryBuilder {
    title: String,
    link: String,
    summary: String,
    content: String,
    published: String,
    updated: String,
}

impl EntryBuilder {
    fn push_text(&mut self, field: &[u8], text: &str) {
        let slot = match field {
            b"title" => &mut self.title,
            b"link" => &mut self.link,
            b"description" | b"summary" => &mut self.summary,
            b"content" | b"content:encoded" => &mut self.content,
            b"pubDate" | b"published" | b"dc:date" => &mut self.published,
            b"updated" => &mut self.updated,
            _ => return,
        };
        if !slot.is_empty() {
            slot.push(' ');
        }
        slot.push_str(text);
    }

    fn finish(self, source_id: &str) -> Option<FeedEntry> {
        let title = clean_text(&self.title);
        let link = self.link.trim().to_string();
        if title.is_empty() || link.is_empty() {
            return None;
        }
        let summary = if self.summary.trim().is_empty() {
            clean_text(&self.content)
        } else {
            clean_text(&self.summary)
        };
        let published = if self.published.trim().is_empty() {
            self.updated.trim().to_string()
        } else {
            self.published.trim().to_string()
        };
        let published_at = parse_published(&published);

        Some(FeedEntry {
            title,
            link,
            summary,
            published,
            published_at,
            source_id: source_id.to_string(),
        })
    }
}

/// Unix seconds from an RFC 2822 or RFC 3339 timestamp.
pub fn parse_published(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    OffsetDateTime::parse(raw, &Rfc2822)
        .or_else(|_| OffsetDateTime::parse(raw, &Rfc3339))
        .map(|dt| dt.unix_timestamp())
        .ok()
        // obsolete zone names ("GMT", "EST") are common in RSS
        .or_else(|| {
            chrono::DateTime::parse_from_rfc2822(raw)
                .ok()
                .map(|dt| dt.timestamp())
        })
}

fn is_entry(name: &[u8]) -> bool {
    name == b"item" || name == b"entry"
}

/// `href` of an Atom `<link>` that points at the human-readable page.
fn alternate_href(e: &BytesStart<'_>) -> Option<String> {
    let mut href = None;
    let mut rel_ok = true;
    for attr in e.attributes().flatten() {
        match attr.key.as_ref() {
            b"href" => href = attr.unescape_value().ok().map(Cow::into_owned),
            b"rel" => rel_ok = attr.value.as_ref() == b"alternate",
            _ => {}
        }
    }
    href.filter(|h| rel_ok && !h.trim().is_empty())
}

fn decode_text(raw: &[u8], unescaped: quick_xml::Result<Cow<'_, str>>) -> String {
    match unescaped {
        Ok(s) => s.into_owned(),
        // HTML entities (&nbsp;, &mdash;) are not XML entities
        Err(_) => html_escape::decode_html_entities(&String::from_utf8_lossy(raw)).into_owned(),
    }
}

/// Parse a feed document into at most `max_entries` cleaned entries.
pub fn parse_feed(raw: &str, source_id: &str, max_entries: usize) -> ParsedFeed {
    let mut reader = Reader::from_str(raw);
    reader.config_mut().trim_text(true);

    let mut feed = ParsedFeed::default();
    let mut stack: Vec<Vec<u8>> = Vec::new();
    // index in `stack` of the open <item>/<entry>
    let mut entry_at: Option<usize> = None;
    let mut current = EntryBuilder::default();

    loop {
        if feed.entries.len() >= max_entries {
            break;
        }
        let event = match reader.read_event() {
            Ok(ev) => ev,
            Err(e) => {
                warn!(
                    target: "ingest",
                    source = source_id,
                    position = reader.buffer_position() as u64,
                    error = %e,
                    kept = feed.entries.len(),
                    "malformed feed, keeping entries parsed so far"
                );
                break;
            }
        };

        match event {
            Event::Start(e) => {
                let name = e.name().as_ref().to_vec();
                handle_link_attr(&e, &name, &stack, entry_at, &mut current, &mut feed);
                if entry_at.is_none() && is_entry(&name) {
                    entry_at = Some(stack.len());
                    current = EntryBuilder::default();
                }
                stack.push(name);
            }
            Event::Empty(e) => {
                let name = e.name().as_ref().to_vec();
                handle_link_attr(&e, &name, &stack, entry_at, &mut current, &mut feed);
            }
            Event::End(_) => {
                stack.pop();
                if entry_at == Some(stack.len()) {
                    entry_at = None;
                    if let Some(entry) = std::mem::take(&mut current).finish(source_id) {
                        feed.entries.push(entry);
                    }
                }
            }
            Event::Text(e) => {
                let text = decode_text(&e, e.unescape());
                route_text(&text, &stack, entry_at, &mut current, &mut feed);
            }
            Event::CData(e) => {
                let text = String::from_utf8_lossy(&e).into_owned();
                route_text(&text, &stack, entry_at, &mut current, &mut feed);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    feed
}

fn route_text(
    text: &str,
    stack: &[Vec<u8>],
    entry_at: Option<usize>,
    current: &mut EntryBuilder,
    feed: &mut ParsedFeed,
) {
    match entry_at {
        // the entry's direct child owns all text below it
        Some(i) => {
            if let Some(field) = stack.get(i + 1) {
                current.push_text(field, text);
            }
        }
        None => {
            if feed.home_url.is_empty() && is_channel_link(stack) {
                feed.home_url = text.trim().to_string();
            }
        }
    }
}

fn is_channel_link(stack: &[Vec<u8>]) -> bool {
    match stack {
        [.., parent, last] => {
            last.as_slice() == b"link"
                && (parent.as_slice() == b"channel" || parent.as_slice() == b"feed")
        }
        _ => false,
    }
}

fn handle_link_attr(
    e: &BytesStart<'_>,
    name: &[u8],
    stack: &[Vec<u8>],
    entry_at: Option<usize>,
    current: &mut EntryBuilder,
    feed: &mut ParsedFeed,
) {
    if name != b"link" {
        return;
    }
    let Some(href) = alternate_href(e) else {
        return;
    };
    match entry_at {
        Some(i) if stack.len() == i + 1 => {
            if current.link.is_empty() {
                current.link = href;
            }
        }
        None => {
            if feed.home_url.is_empty()
                && stack.last().is_some_and(|p| p.as_slice() == b"feed")
            {
                feed.home_url = href;
            }
        }
        _ => {}
    }
}
