// src/config/scoring.rs
//! Tunable relevance weights.
//!
//! The defaults are hand-tuned constants carried over from the production
//! scorer. They are parameters, not derived values; override them in the
//! `[scoring]` section of the feeds config.

use serde::{Deserialize, Serialize};

use crate::config::sources::CredibilityTier;

/// How keywords and table terms are found in article text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Plain case-insensitive substring: "fed" hits "Federal Reserve".
    #[default]
    Substring,
    /// Whole words and phrases only: "fed" hits "the Fed" but not "FedEx".
    WordBoundary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub match_mode: MatchMode,

    /// Keywords longer than this earn `long_keyword_points`.
    pub long_keyword_len: usize,
    pub long_keyword_points: i32,
    /// Keywords longer than this (and not long) earn `medium_keyword_points`.
    pub medium_keyword_len: usize,
    pub medium_keyword_points: i32,
    pub short_keyword_points: i32,

    /// A category contributes its match count once it has at least this many hits.
    pub category_cluster_min: usize,

    pub credibility_very_high: i32,
    pub credibility_high: i32,
    pub credibility_other: i32,

    /// "analysis" / "expert"
    pub analysis_bonus: i32,
    /// "outlook" / "forecast"
    pub outlook_bonus: i32,
    /// "impact" / "implications"
    pub impact_bonus: i32,

    pub short_content_chars: usize,
    pub short_content_penalty: i32,

    /// Entries scoring below this are dropped before ranking.
    pub acceptance_threshold: i32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            match_mode: MatchMode::Substring,
            long_keyword_len: 8,
            long_keyword_points: 3,
            medium_keyword_len: 5,
            medium_keyword_points: 2,
            short_keyword_points: 1,
            category_cluster_min: 2,
            credibility_very_high: 3,
            credibility_high: 2,
            credibility_other: 1,
            analysis_bonus: 2,
            outlook_bonus: 1,
            impact_bonus: 1,
            short_content_chars: 100,
            short_content_penalty: 2,
            acceptance_threshold: 2,
        }
    }
}

impl ScoringWeights {
    pub fn keyword_points(&self, keyword_chars: usize) -> i32 {
        if keyword_chars > self.long_keyword_len {
            self.long_keyword_points
        } else if keyword_chars > self.medium_keyword_len {
            self.medium_keyword_points
        } else {
            self.short_keyword_points
        }
    }

    pub fn credibility_points(&self, tier: CredibilityTier) -> i32 {
        match tier {
            CredibilityTier::VeryHigh => self.credibility_very_high,
            CredibilityTier::High => self.credibility_high,
            CredibilityTier::Medium | CredibilityTier::Low => self.credibility_other,
        }
    }
}
