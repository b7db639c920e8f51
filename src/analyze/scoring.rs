//! Relevance scoring.
//!
//! Integer score built from five parts:
//! - caller keyword hits, weighted by keyword length
//! - topic clustering (categories with several table hits)
//! - source credibility
//! - quality markers ("analysis", "outlook", "impact", ...)
//! - a penalty for very short text, floored at zero
//!
//! Pure: same text, keywords and tier always give the same score.

use serde::Serialize;

use super::keywords::{category_matches, matches_term};
use crate::config::{CredibilityTier, ScoringWeights};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScoreBreakdown {
    pub keyword_points: i32,
    pub category_points: i32,
    pub credibility_points: i32,
    pub quality_points: i32,
    /// Amount actually subtracted (never pushes the total below zero).
    pub short_content_penalty: i32,
    pub matched_keywords: Vec<String>,
    pub total: i32,
}

#[derive(Debug, Clone, Default)]
pub struct RelevanceScorer {
    weights: ScoringWeights,
}

impl RelevanceScorer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    pub fn threshold(&self) -> i32 {
        self.weights.acceptance_threshold
    }

    pub fn accepts(&self, score: i32) -> bool {
        score >= self.weights.acceptance_threshold
    }

    pub fn score<S: AsRef<str>>(&self, text: &str, keywords: &[S], tier: CredibilityTier) -> i32 {
        self.score_detailed(text, keywords, tier).total
    }

    pub fn score_detailed<S: AsRef<str>>(
        &self,
        text: &str,
        keywords: &[S],
        tier: CredibilityTier,
    ) -> ScoreBreakdown {
        let w = &self.weights;
        let lower = text.to_lowercase();
        let mut b = ScoreBreakdown::default();

        for kw in keywords {
            let kw = kw.as_ref().trim();
            let kw_lower = kw.to_lowercase();
            if matches_term(&lower, &kw_lower, w.match_mode) {
                b.keyword_points += w.keyword_points(kw.chars().count());
                b.matched_keywords.push(kw_lower);
            }
        }

        b.category_points = category_matches(&lower, w.match_mode)
            .filter(|(_, n)| *n >= w.category_cluster_min)
            .map(|(_, n)| n as i32)
            .sum();

        b.credibility_points = w.credibility_points(tier);

        let any = |terms: [&str; 2]| terms.iter().any(|t| matches_term(&lower, t, w.match_mode));
        if any(["analysis", "expert"]) {
            b.quality_points += w.analysis_bonus;
        }
        if any(["outlook", "forecast"]) {
            b.quality_points += w.outlook_bonus;
        }
        if any(["impact", "implications"]) {
            b.quality_points += w.impact_bonus;
        }

        let raw = b.keyword_points + b.category_points + b.credibility_points + b.quality_points;
        b.total = raw;
        if text.chars().count() < w.short_content_chars {
            b.total = (raw - w.short_content_penalty).max(0);
            b.short_content_penalty = raw - b.total;
        }
        b
    }
}
