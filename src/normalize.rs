//! # Document Normalization
//! Cleanup applied to raw posts before discovery and scoring: HTML entity
//! decode, tag strip, whitespace collapse, a length cap, a short-text floor,
//! and a recent-window text dedup.

use crate::types::RawDocument;
use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use std::collections::HashSet;

/// Upper bound on normalized text length, in characters.
const TEXT_CAP_CHARS: usize = 1500;

/// Normalize post text: decode entities, drop markup, tame typography,
/// collapse whitespace, cap length.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    // Curly quotes and guillemets to ASCII so substring matching stays stable.
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    if out.chars().count() > TEXT_CAP_CHARS {
        out = out.chars().take(TEXT_CAP_CHARS).collect();
    }

    out
}

/// Short, anonymized identifier for a document. Raw post text is never
/// logged; diagnostics reference this hash instead.
pub fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Normalize every document, drop texts under `min_text_chars`, and remove
/// duplicates: a document whose normalized text already appeared is dropped
/// when published within `dedup_window_secs` of `now`.
///
/// Returns `(kept, dropped_short, deduped)`.
pub fn normalize_filter_dedup(
    now: DateTime<Utc>,
    docs: Vec<RawDocument>,
    min_text_chars: usize,
    dedup_window_secs: i64,
) -> (Vec<RawDocument>, usize, usize) {
    let mut dropped_short = 0usize;
    let mut filtered = Vec::with_capacity(docs.len());
    for mut doc in docs {
        doc.text = normalize_text(&doc.text);
        if doc.text.chars().count() < min_text_chars {
            dropped_short += 1;
            continue;
        }
        filtered.push(doc);
    }

    let mut seen_texts: HashSet<String> = HashSet::new();
    let mut kept = Vec::with_capacity(filtered.len());
    let mut deduped = 0usize;

    for doc in filtered {
        let age = now
            .signed_duration_since(doc.published_at)
            .num_seconds()
            .max(0);
        let is_recent = age <= dedup_window_secs;
        if is_recent && !seen_texts.insert(doc.text.clone()) {
            deduped += 1;
            continue;
        }
        kept.push(doc);
    }

    (kept, dropped_short, deduped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    fn doc(text: &str, published_at: DateTime<Utc>) -> RawDocument {
        RawDocument {
            source_id: "@harbor_life".to_string(),
            source_category: "Sailing".to_string(),
            source_priority: "High".to_string(),
            text: text.to_string(),
            engagement: BTreeMap::new(),
            published_at,
        }
    }

    #[test]
    fn entities_tags_and_whitespace_are_cleaned() {
        let out = normalize_text("  <b>Regatta&nbsp;season</b>   opens\tsoon ");
        assert_eq!(out, "Regatta season opens soon");
    }

    #[test]
    fn long_text_is_capped() {
        let long = "x".repeat(4000);
        assert_eq!(normalize_text(&long).chars().count(), 1500);
    }

    #[test]
    fn recent_duplicates_are_dropped_old_copies_kept() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let recent = now - chrono::Duration::seconds(5);
        let old = now - chrono::Duration::seconds(3600);
        let text = "the same announcement about the spring regatta weekend";

        let docs = vec![doc(text, recent), doc(text, recent), doc(text, old)];
        let (kept, dropped_short, deduped) = normalize_filter_dedup(now, docs, 10, 600);
        assert_eq!(kept.len(), 2);
        assert_eq!(dropped_short, 0);
        assert_eq!(deduped, 1);
    }

    #[test]
    fn short_texts_hit_the_floor() {
        let now = Utc::now();
        let docs = vec![doc("too short", now), doc("long enough to keep around for scoring", now)];
        let (kept, dropped_short, _) = normalize_filter_dedup(now, docs, 20, 600);
        assert_eq!(kept.len(), 1);
        assert_eq!(dropped_short, 1);
    }

    #[test]
    fn anon_hash_is_short_and_stable() {
        let a = anon_hash("some text");
        let b = anon_hash("some text");
        assert_eq!(a, b);
        assert_eq!(a.len(), 12);
    }
}
