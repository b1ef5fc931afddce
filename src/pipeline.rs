//! # Ranking Pipeline
//! Pure ranking pass: per-document relevance, engagement weighting and
//! source-weight bonuses fold into one clamped final score. No I/O here;
//! output preserves input order, sorting is a caller concern.

use crate::relevance::{self, RelevanceResult};
use crate::trending::TrendingSet;
use crate::types::RawDocument;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub const MAX_FINAL_SCORE: f64 = 10.0;
/// Bonus applied when a category or priority is not in the weight table.
pub const NEUTRAL_BONUS: f64 = 1.0;
const MAX_ENGAGEMENT_SCORE: f64 = 10.0;

/// Source-specific engagement model: a weighted sum over raw counters.
/// A channel feed might use `views + 10×forwards`, a community wall
/// `likes + 3×comments + 5×reposts`; unlisted metrics count at weight 1.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngagementWeights {
    #[serde(default)]
    pub weights: HashMap<String, f64>,
}

impl EngagementWeights {
    pub fn from_pairs(pairs: &[(&str, f64)]) -> Self {
        Self {
            weights: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
        }
    }

    pub fn total(&self, metrics: &BTreeMap<String, u64>) -> f64 {
        metrics
            .iter()
            .map(|(name, count)| self.weights.get(name).copied().unwrap_or(1.0) * *count as f64)
            .sum()
    }
}

/// One rule of the category cascade; first matching vocabulary wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRule {
    pub name: String,
    pub vocabulary: Vec<String>,
}

/// Assign a content category from matched-term evidence. The cascade order
/// is fixed and significant; the fallback applies when nothing matches.
pub fn assign_category(
    rules: &[CategoryRule],
    fallback: &str,
    relevance: &RelevanceResult,
) -> String {
    for rule in rules {
        let hit = relevance
            .matched_words
            .iter()
            .chain(relevance.matched_phrases.iter())
            .any(|m| rule.vocabulary.iter().any(|v| m.contains(v.as_str())));
        if hit {
            return rule.name.clone();
        }
    }
    fallback.to_string()
}

/// All weighting inputs for one ranking pass.
#[derive(Debug, Clone)]
pub struct RankSettings {
    pub brand_terms: Vec<String>,
    /// Inclusive lower bound on `final_score`.
    pub min_score: f64,
    pub engagement: EngagementWeights,
    pub engagement_divisor: u64,
    /// Visibility floor on raw engagement, independent of the score gate.
    pub min_engagement: f64,
    pub priority_weights: HashMap<String, f64>,
    pub category_weights: HashMap<String, f64>,
    pub category_rules: Vec<CategoryRule>,
    pub fallback_category: String,
}

/// A ranked post: the raw document plus every computed component.
/// Assembled once per qualifying document, never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredPost {
    pub source_id: String,
    pub source_category: String,
    pub source_priority: String,
    pub text: String,
    pub engagement: BTreeMap<String, u64>,
    pub published_at: chrono::DateTime<chrono::Utc>,
    #[serde(flatten)]
    pub relevance: RelevanceResult,
    pub total_engagement: f64,
    pub engagement_score: f64,
    pub priority_bonus: f64,
    pub category_bonus: f64,
    /// `min(10, (total_relevance + engagement_score + priority_bonus + category_bonus) / 4)`
    pub final_score: f64,
    pub assigned_category: String,
}

impl ScoredPost {
    /// Assemble from the raw document plus computed components.
    #[allow(clippy::too_many_arguments)]
    fn assemble(
        doc: &RawDocument,
        relevance: RelevanceResult,
        total_engagement: f64,
        engagement_score: f64,
        priority_bonus: f64,
        category_bonus: f64,
        final_score: f64,
        assigned_category: String,
    ) -> Self {
        Self {
            source_id: doc.source_id.clone(),
            source_category: doc.source_category.clone(),
            source_priority: doc.source_priority.clone(),
            text: doc.text.clone(),
            engagement: doc.engagement.clone(),
            published_at: doc.published_at,
            relevance,
            total_engagement,
            engagement_score,
            priority_bonus,
            category_bonus,
            final_score,
            assigned_category,
        }
    }
}

/// Rank a batch: score each document against the trending vocabulary, apply
/// engagement and source weighting, and keep the ones that clear both gates.
pub fn rank(docs: &[RawDocument], trending: &TrendingSet, settings: &RankSettings) -> Vec<ScoredPost> {
    let mut out = Vec::new();

    for doc in docs {
        let rel = relevance::score(&doc.text, trending, &settings.brand_terms);

        let total_engagement = settings.engagement.total(&doc.engagement);
        let engagement_score = (total_engagement / settings.engagement_divisor as f64)
            .floor()
            .min(MAX_ENGAGEMENT_SCORE);

        let priority_bonus = settings
            .priority_weights
            .get(&doc.source_priority)
            .copied()
            .unwrap_or(NEUTRAL_BONUS);
        let category_bonus = settings
            .category_weights
            .get(&doc.source_category)
            .copied()
            .unwrap_or(NEUTRAL_BONUS);

        let final_score = ((rel.total_relevance + engagement_score + priority_bonus + category_bonus)
            / 4.0)
            .min(MAX_FINAL_SCORE);

        // Both gates are required: a keyword hit alone cannot surface
        // low-visibility content, and high visibility alone is not relevance.
        if final_score < settings.min_score || total_engagement < settings.min_engagement {
            continue;
        }

        let assigned_category = assign_category(&settings.category_rules, &settings.fallback_category, &rel);

        out.push(ScoredPost::assemble(
            doc,
            rel,
            total_engagement,
            engagement_score,
            priority_bonus,
            category_bonus,
            final_score,
            assigned_category,
        ));
    }

    out
}
