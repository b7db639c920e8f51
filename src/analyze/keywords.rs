// src/analyze/keywords.rs
//! Keyword/entity extraction and the static topic table.
//!
//! Terms are found by plain substring by default, so "fed" also hits
//! "Federal Reserve". [`MatchMode::WordBoundary`] restricts hits to whole
//! words and phrases.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::MatchMode;

/// Topic categories used for extraction and for the clustering bonus.
pub const CATEGORY_TABLE: &[(&str, &[&str])] = &[
    (
        "economics",
        &[
            "fed",
            "federal reserve",
            "interest rate",
            "inflation",
            "gdp",
            "economy",
            "monetary policy",
            "fiscal policy",
            "recession",
            "growth",
        ],
    ),
    (
        "finance",
        &[
            "stock market",
            "investment",
            "finance",
            "banking",
            "currency",
            "trading",
            "bonds",
            "equity",
            "portfolio",
            "hedge fund",
        ],
    ),
    (
        "technology",
        &[
            "ai",
            "artificial intelligence",
            "machine learning",
            "blockchain",
            "cryptocurrency",
            "bitcoin",
            "tech",
            "innovation",
            "digital",
            "software",
        ],
    ),
    (
        "geopolitics",
        &[
            "china",
            "usa",
            "biden",
            "trump",
            "trade war",
            "tariff",
            "sanctions",
            "diplomacy",
            "geopolitics",
            "foreign policy",
        ],
    ),
    (
        "business",
        &[
            "meta",
            "google",
            "microsoft",
            "amazon",
            "apple",
            "tesla",
            "merger",
            "acquisition",
            "corporate",
            "earnings",
        ],
    ),
    (
        "global",
        &[
            "ukraine",
            "russia",
            "middle east",
            "europe",
            "asia",
            "emerging markets",
            "developing",
            "global",
        ],
    ),
    (
        "energy",
        &[
            "oil",
            "gas",
            "renewable",
            "energy",
            "climate",
            "carbon",
            "solar",
            "wind",
            "fossil fuels",
        ],
    ),
    (
        "healthcare",
        &[
            "covid",
            "pandemic",
            "healthcare",
            "pharma",
            "medical",
            "vaccine",
            "biotech",
        ],
    ),
    (
        "region",
        &[
            "vietnam",
            "vietnamese",
            "hanoi",
            "ho chi minh",
            "mekong",
            "asean",
            "southeast asia",
        ],
    ),
];

pub const MAX_KEYWORDS: usize = 20;
const MAX_PROPER_NOUNS: usize = 15;
const MAX_NUMBERS: usize = 5;
const MAX_CURRENCY: usize = 3;

static RE_PROPER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z][a-z]+(?:\s+[A-Z][a-z]+)*\b").unwrap());
static RE_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b\d+(?:\.\d+)?(?:\s*(?:billion|million|trillion|percent)\b|%)").unwrap()
});
static RE_CURRENCY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:USD|EUR|GBP|JPY)\b|[$€]\d+(?:\.\d+)?").unwrap());

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Whether `term` occurs in `haystack` with no word character on either side.
/// Both sides are expected to be lowercase already.
pub fn contains_term(haystack: &str, term: &str) -> bool {
    if term.is_empty() {
        return false;
    }
    haystack.match_indices(term).any(|(i, m)| {
        let before_ok = haystack[..i]
            .chars()
            .next_back()
            .map_or(true, |c| !is_word_char(c) || !term.starts_with(is_word_char));
        let after_ok = haystack[i + m.len()..]
            .chars()
            .next()
            .map_or(true, |c| !is_word_char(c) || !term.ends_with(is_word_char));
        before_ok && after_ok
    })
}

/// `term` found in `haystack` under `mode`. Both sides lowercase.
pub fn matches_term(haystack: &str, term: &str, mode: MatchMode) -> bool {
    match mode {
        MatchMode::Substring => !term.is_empty() && haystack.contains(term),
        MatchMode::WordBoundary => contains_term(haystack, term),
    }
}

/// Per category, the table terms present in `text_lower`.
pub fn category_matches(
    text_lower: &str,
    mode: MatchMode,
) -> impl Iterator<Item = (&'static str, usize)> + '_ {
    CATEGORY_TABLE.iter().map(move |(cat, terms)| {
        let n = terms
            .iter()
            .filter(|t| matches_term(text_lower, t, mode))
            .count();
        (*cat, n)
    })
}

/// Up to 20 lowercase keywords/entities from `title` and `content`, in
/// first-seen order: table terms, proper nouns, numbers with units, currency.
pub fn extract_keywords(title: &str, content: &str) -> Vec<String> {
    extract_keywords_with(title, content, MatchMode::default())
}

pub fn extract_keywords_with(title: &str, content: &str, mode: MatchMode) -> Vec<String> {
    let original = format!("{title} {content}");
    let lower = original.to_lowercase();

    let table_hits = CATEGORY_TABLE
        .iter()
        .flat_map(|(_, terms)| terms.iter())
        .filter(|t| matches_term(&lower, t, mode))
        .map(|t| t.to_string());
    let proper = RE_PROPER
        .find_iter(&original)
        .take(MAX_PROPER_NOUNS)
        .map(|m| m.as_str().to_lowercase());
    let numbers = RE_NUMBER
        .find_iter(&lower)
        .take(MAX_NUMBERS)
        .map(|m| m.as_str().to_string());
    let currency = RE_CURRENCY
        .find_iter(&original)
        .take(MAX_CURRENCY)
        .map(|m| m.as_str().to_lowercase());

    let mut out: Vec<String> = Vec::new();
    for kw in table_hits.chain(proper).chain(numbers).chain(currency) {
        if out.len() >= MAX_KEYWORDS {
            break;
        }
        if !out.contains(&kw) {
            out.push(kw);
        }
    }
    out
}
