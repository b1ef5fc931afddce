//! # Relevance Scorer
//! Brand-term and trending-term scoring for a single document. Matching is
//! substring containment on the lower-cased text: discovered phrases can
//! span normalization boundaries, so token-set intersection is not enough.

use crate::trending::TrendingSet;
use serde::{Deserialize, Serialize};

pub const MAX_RELEVANCE: f64 = 10.0;
/// Points per distinct brand term found in the text.
pub const BRAND_TERM_POINTS: f64 = 5.0;

/// Evidence caps: the score accumulates over every match, the stored lists
/// stay bounded.
const MATCHED_WORDS_CAP: usize = 10;
const MATCHED_PHRASES_CAP: usize = 5;

/// Per-document relevance breakdown.
/// Invariant: `total_relevance = min(10, brand + words + phrases)`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RelevanceResult {
    pub total_relevance: f64,
    pub brand_score: f64,
    pub trending_word_score: f64,
    pub trending_phrase_score: f64,
    pub matched_words: Vec<String>,
    pub matched_phrases: Vec<String>,
}

/// Score one document against the batch vocabulary and the brand allow-list.
pub fn score(text: &str, trending: &TrendingSet, brand_terms: &[String]) -> RelevanceResult {
    let haystack = text.to_lowercase();

    let mut brand_score = 0.0;
    for term in brand_terms {
        if haystack.contains(&term.to_lowercase()) {
            brand_score += BRAND_TERM_POINTS;
        }
    }

    let mut trending_word_score = 0.0;
    let mut matched_words = Vec::new();
    for tc in &trending.words {
        if haystack.contains(tc.term.as_str()) {
            // Weight grows with batch frequency, capped at 3 per word.
            trending_word_score += (tc.count / 100).min(3) as f64;
            if matched_words.len() < MATCHED_WORDS_CAP {
                matched_words.push(tc.term.clone());
            }
        }
    }

    let mut trending_phrase_score = 0.0;
    let mut matched_phrases = Vec::new();
    for tc in &trending.phrases {
        if haystack.contains(tc.term.as_str()) {
            // Phrases are rarer and more specific, capped at 5 each.
            trending_phrase_score += (tc.count / 50).min(5) as f64;
            if matched_phrases.len() < MATCHED_PHRASES_CAP {
                matched_phrases.push(tc.term.clone());
            }
        }
    }

    let total_relevance =
        (brand_score + trending_word_score + trending_phrase_score).min(MAX_RELEVANCE);

    RelevanceResult {
        total_relevance,
        brand_score,
        trending_word_score,
        trending_phrase_score,
        matched_words,
        matched_phrases,
    }
}
