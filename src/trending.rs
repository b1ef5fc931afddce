//! # Trending Discovery
//! Frequency-ranked words and phrases over one scan batch. Counts aggregate
//! across the whole batch, not per document; the result is a transient
//! aggregate recomputed on every scan, never persisted as a source of truth.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const DEFAULT_MIN_FREQUENCY: u64 = 100;
pub const WORD_LIMIT: usize = 50;
pub const PHRASE_LIMIT: usize = 30;

/// Single words shorter than this never trend.
const MIN_WORD_CHARS: usize = 4;
/// Rendered length a 2-token phrase must exceed (filters function-word pairs).
const TWO_TOKEN_MIN_CHARS: usize = 8;
/// Rendered length a 3-token phrase must exceed.
const THREE_TOKEN_MIN_CHARS: usize = 12;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TermCount {
    pub term: String,
    pub count: u64,
}

/// Derived trending vocabulary for one batch. Every member satisfies the
/// minimum-frequency invariant; both lists are sorted by count descending.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrendingSet {
    pub words: Vec<TermCount>,
    pub phrases: Vec<TermCount>,
}

impl TrendingSet {
    pub fn is_empty(&self) -> bool {
        self.words.is_empty() && self.phrases.is_empty()
    }

    /// Truncated copy for upward payloads (top-N each).
    pub fn top(&self, n: usize) -> TrendingSet {
        TrendingSet {
            words: self.words.iter().take(n).cloned().collect(),
            phrases: self.phrases.iter().take(n).cloned().collect(),
        }
    }
}

// URLs, @-mentions and #-hashtags drop out entirely; remaining punctuation
// becomes whitespace. Unicode \w keeps non-Latin alphabets intact.
static RE_STRIP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?u)https?://\S+|@\w+|#\w+|[^\w\s]").unwrap());

/// Lower-case and strip markup noise ahead of tokenization.
pub fn normalize_for_terms(text: &str) -> String {
    let lower = text.to_lowercase();
    RE_STRIP.replace_all(&lower, " ").into_owned()
}

/// Frequency tally that remembers first-seen order for deterministic
/// tie-breaking between equal counts.
struct Tally {
    counts: HashMap<String, (u64, usize)>,
    next_rank: usize,
}

impl Tally {
    fn new() -> Self {
        Self {
            counts: HashMap::new(),
            next_rank: 0,
        }
    }

    fn bump(&mut self, term: &str) {
        if let Some(entry) = self.counts.get_mut(term) {
            entry.0 += 1;
        } else {
            let rank = self.next_rank;
            self.next_rank += 1;
            self.counts.insert(term.to_string(), (1, rank));
        }
    }

    fn ranked(self, min_frequency: u64, limit: usize) -> Vec<TermCount> {
        let mut items: Vec<(String, u64, usize)> = self
            .counts
            .into_iter()
            .filter(|(_, (count, _))| *count >= min_frequency)
            .map(|(term, (count, rank))| (term, count, rank))
            .collect();
        // Count descending; equal counts keep first-seen order.
        items.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
        items.truncate(limit);
        items
            .into_iter()
            .map(|(term, count, _)| TermCount { term, count })
            .collect()
    }
}

/// Discover trending words and phrases across a batch of texts.
pub fn discover<'a, I>(texts: I, min_frequency: u64) -> TrendingSet
where
    I: IntoIterator<Item = &'a str>,
{
    let mut words = Tally::new();
    let mut phrases = Tally::new();

    for text in texts {
        let normalized = normalize_for_terms(text);
        let tokens: Vec<&str> = normalized.split_whitespace().collect();

        for token in &tokens {
            if token.chars().count() >= MIN_WORD_CHARS {
                words.bump(token);
            }
        }

        for pair in tokens.windows(2) {
            let phrase = pair.join(" ");
            if phrase.chars().count() > TWO_TOKEN_MIN_CHARS {
                phrases.bump(&phrase);
            }
        }
        for triple in tokens.windows(3) {
            let phrase = triple.join(" ");
            if phrase.chars().count() > THREE_TOKEN_MIN_CHARS {
                phrases.bump(&phrase);
            }
        }
    }

    let set = TrendingSet {
        words: words.ranked(min_frequency, WORD_LIMIT),
        phrases: phrases.ranked(min_frequency, PHRASE_LIMIT),
    };
    tracing::debug!(
        words = set.words.len(),
        phrases = set.phrases.len(),
        min_frequency,
        "trending vocabulary discovered"
    );
    set
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_mentions_and_hashtags_are_stripped() {
        let out = normalize_for_terms("Check https://example.com @sailor #regatta, port!");
        assert!(!out.contains("example"));
        assert!(!out.contains("sailor"));
        assert!(!out.contains("regatta"));
        assert!(out.contains("check"));
        assert!(out.contains("port"));
    }

    #[test]
    fn cyrillic_words_survive_normalization() {
        let out = normalize_for_terms("Новая яхта вышла в море!");
        assert!(out.contains("яхта"));
        assert!(out.contains("море"));
    }

    #[test]
    fn short_words_never_trend() {
        let texts = vec!["the cat sat"; 10];
        let set = discover(texts.iter().map(|s| *s), 1);
        assert!(set.words.iter().all(|tc| tc.term.chars().count() >= 4));
    }

    #[test]
    fn phrase_length_filters_apply() {
        let texts = vec!["big race day today"; 5];
        let set = discover(texts.iter().map(|s| *s), 1);
        let terms: Vec<&str> = set.phrases.iter().map(|tc| tc.term.as_str()).collect();
        // 2-token windows must exceed 8 rendered chars, 3-token windows 12.
        assert!(terms.contains(&"day today"));
        assert!(terms.contains(&"race day today"));
        assert!(!terms.contains(&"big race"));
        assert!(!terms.contains(&"big race day"));
    }

    #[test]
    fn below_threshold_yields_empty_set() {
        let texts = ["sailing weather forecast", "sailing regatta update"];
        let set = discover(texts.iter().map(|s| *s), 100);
        assert!(set.is_empty());
    }

    #[test]
    fn equal_counts_keep_first_seen_order() {
        let texts = ["alpha bravo", "alpha bravo"];
        let set = discover(texts.iter().map(|s| *s), 2);
        let terms: Vec<&str> = set.words.iter().map(|tc| tc.term.as_str()).collect();
        assert_eq!(terms, vec!["alpha", "bravo"]);
    }
}
