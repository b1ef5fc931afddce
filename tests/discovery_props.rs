// tests/discovery_props.rs
// Batch-level properties of trending discovery: order independence,
// idempotence, and the minimum-frequency invariant.

use brand_trend_scanner::trending::{discover, TermCount};
use std::collections::BTreeMap;

fn corpus() -> Vec<String> {
    let mut texts = Vec::new();
    for i in 0..120 {
        texts.push(format!("regatta weekend update number {i} from the harbor crew"));
    }
    for i in 0..40 {
        texts.push(format!("fashion drop preview {i}"));
    }
    texts
}

fn as_map(terms: &[TermCount]) -> BTreeMap<String, u64> {
    terms.iter().map(|tc| (tc.term.clone(), tc.count)).collect()
}

#[test]
fn membership_and_counts_are_order_independent() {
    let texts = corpus();
    let forward = discover(texts.iter().map(|s| s.as_str()), 100);

    let mut reversed: Vec<&str> = texts.iter().map(|s| s.as_str()).collect();
    reversed.reverse();
    let backward = discover(reversed, 100);

    assert_eq!(as_map(&forward.words), as_map(&backward.words));
    assert_eq!(as_map(&forward.phrases), as_map(&backward.phrases));
}

#[test]
fn discovery_is_idempotent() {
    let texts = corpus();
    let a = discover(texts.iter().map(|s| s.as_str()), 100);
    let b = discover(texts.iter().map(|s| s.as_str()), 100);
    assert_eq!(a, b);
}

#[test]
fn every_member_meets_the_frequency_floor() {
    let texts = corpus();
    let set = discover(texts.iter().map(|s| s.as_str()), 100);
    assert!(!set.words.is_empty());
    assert!(set.words.iter().all(|tc| tc.count >= 100));
    assert!(set.phrases.iter().all(|tc| tc.count >= 100));
}

#[test]
fn counts_are_sorted_descending() {
    let texts = corpus();
    let set = discover(texts.iter().map(|s| s.as_str()), 1);
    assert!(set.words.windows(2).all(|w| w[0].count >= w[1].count));
    assert!(set.phrases.windows(2).all(|w| w[0].count >= w[1].count));
}

#[test]
fn nothing_trends_below_the_floor() {
    // Every term appears well under 100 times.
    let texts: Vec<String> = (0..20)
        .map(|i| format!("unique snippet number {i} about nothing in particular"))
        .collect();
    let set = discover(texts.iter().map(|s| s.as_str()), 100);
    assert!(set.words.is_empty());
    assert!(set.phrases.is_empty());
}

#[test]
fn truncation_keeps_the_heaviest_terms() {
    // 60 distinct words, frequencies 1..=60; only the top 50 survive.
    let mut texts = Vec::new();
    for i in 0..60u64 {
        for _ in 0..=i {
            texts.push(format!("term{i:02}xx"));
        }
    }
    let set = discover(texts.iter().map(|s| s.as_str()), 1);
    assert_eq!(set.words.len(), 50);
    assert_eq!(set.words[0].count, 60);
    assert!(set.words.iter().all(|tc| tc.count >= 11));
}
