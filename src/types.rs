// src/types.rs
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// One raw post as delivered by the fetch layer. Immutable once fetched.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct RawDocument {
    pub source_id: String,
    pub source_category: String,
    pub source_priority: String,
    pub text: String,
    /// Raw interaction counters keyed by metric name ("views", "likes", ...).
    pub engagement: BTreeMap<String, u64>,
    pub published_at: DateTime<Utc>,
}

/// Roster entry for one source unit (a channel or community being scanned).
/// Unknown `category`/`priority` values degrade to the neutral weight.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct SourceMeta {
    pub id: String,
    pub name: String,
    pub category: String, // e.g. "Sailing", "Fashion", "News"
    pub priority: String, // "Critical" | "High" | "Medium" | "Low"
}

impl SourceMeta {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: "Unknown".to_string(),
            priority: "Medium".to_string(),
        }
    }
}
