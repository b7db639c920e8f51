// src/analyze/mod.rs
//! Text analysis: keyword/entity extraction and relevance scoring.

pub mod keywords;
pub mod scoring;

// Re-export convenient types.
pub use crate::analyze::keywords::{
    contains_term, extract_keywords, extract_keywords_with, matches_term, CATEGORY_TABLE,
};
pub use crate::analyze::scoring::{RelevanceScorer, ScoreBreakdown};
