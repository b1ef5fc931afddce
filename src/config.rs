//! # Scanner Configuration
//! Every tunable lives here rather than in code: quotas, retry budgets,
//! pauses, discovery thresholds, weight tables and brand terms. Loaded from
//! TOML with an env-var override, falling back to a built-in seed so the
//! scanner works out of the box.

use crate::pipeline::{CategoryRule, EngagementWeights, RankSettings};
use crate::retry::RetryPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_CONFIG_PATH: &str = "SCANNER_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/scanner.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimiterCfg {
    #[serde(default = "default_quota")]
    pub per_minute_quota: u32,
    #[serde(default = "default_spacing_ms")]
    pub min_spacing_ms: u64,
}

fn default_quota() -> u32 {
    100
}
fn default_spacing_ms() -> u64 {
    350
}

impl Default for LimiterCfg {
    fn default() -> Self {
        Self {
            per_minute_quota: default_quota(),
            min_spacing_ms: default_spacing_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryCfg {
    #[serde(default = "default_metadata_attempts")]
    pub metadata_attempts: u32,
    #[serde(default = "default_listing_attempts")]
    pub listing_attempts: u32,
    #[serde(default = "default_backoff_base_secs")]
    pub backoff_base_secs: u64,
    #[serde(default = "default_backoff_cap_secs")]
    pub backoff_cap_secs: u64,
    #[serde(default = "default_server_step_secs")]
    pub server_step_secs: u64,
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
}

fn default_metadata_attempts() -> u32 {
    3
}
fn default_listing_attempts() -> u32 {
    5
}
fn default_backoff_base_secs() -> u64 {
    5
}
fn default_backoff_cap_secs() -> u64 {
    300
}
fn default_server_step_secs() -> u64 {
    2
}
fn default_cooldown_ms() -> u64 {
    100
}

impl Default for RetryCfg {
    fn default() -> Self {
        Self {
            metadata_attempts: default_metadata_attempts(),
            listing_attempts: default_listing_attempts(),
            backoff_base_secs: default_backoff_base_secs(),
            backoff_cap_secs: default_backoff_cap_secs(),
            server_step_secs: default_server_step_secs(),
            cooldown_ms: default_cooldown_ms(),
        }
    }
}

impl RetryCfg {
    fn policy(&self, max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            backoff_base: Duration::from_secs(self.backoff_base_secs),
            backoff_cap: Duration::from_secs(self.backoff_cap_secs),
            server_step: Duration::from_secs(self.server_step_secs),
            misc_wait: Duration::from_secs(1),
            cooldown: Duration::from_millis(self.cooldown_ms),
        }
    }

    pub fn metadata_policy(&self) -> RetryPolicy {
        self.policy(self.metadata_attempts)
    }

    pub fn listing_policy(&self) -> RetryPolicy {
        self.policy(self.listing_attempts)
    }
}

/// Two-tier throttle: a per-unit pause plus a coarser pause between
/// fixed-size batches of source units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingCfg {
    #[serde(default = "default_unit_pause_secs")]
    pub unit_pause_secs: u64,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_batch_pause_secs")]
    pub batch_pause_secs: u64,
}

fn default_unit_pause_secs() -> u64 {
    2
}
fn default_batch_size() -> usize {
    5
}
fn default_batch_pause_secs() -> u64 {
    30
}

impl Default for PacingCfg {
    fn default() -> Self {
        Self {
            unit_pause_secs: default_unit_pause_secs(),
            batch_size: default_batch_size(),
            batch_pause_secs: default_batch_pause_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryCfg {
    #[serde(default = "default_min_frequency")]
    pub min_frequency: u64,
}

fn default_min_frequency() -> u64 {
    100
}

impl Default for DiscoveryCfg {
    fn default() -> Self {
        Self {
            min_frequency: default_min_frequency(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterCfg {
    #[serde(default = "default_min_text_chars")]
    pub min_text_chars: usize,
    #[serde(default = "default_dedup_window_secs")]
    pub dedup_window_secs: i64,
}

fn default_min_text_chars() -> usize {
    50
}
fn default_dedup_window_secs() -> i64 {
    600
}

impl Default for FilterCfg {
    fn default() -> Self {
        Self {
            min_text_chars: default_min_text_chars(),
            dedup_window_secs: default_dedup_window_secs(),
        }
    }
}

/// Ranking knobs: gates, engagement model and weight tables. The divisor and
/// the engagement floor are empirical per-source tuning, so they are
/// configuration rather than constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankCfg {
    #[serde(default = "default_min_score")]
    pub min_score: f64,
    #[serde(default = "default_engagement_divisor")]
    pub engagement_divisor: u64,
    #[serde(default = "default_min_engagement")]
    pub min_engagement: f64,
    #[serde(default)]
    pub engagement_weights: HashMap<String, f64>,
    #[serde(default)]
    pub priority_weights: HashMap<String, f64>,
    #[serde(default)]
    pub category_weights: HashMap<String, f64>,
    #[serde(default)]
    pub category_rules: Vec<CategoryRule>,
    #[serde(default = "default_fallback_category")]
    pub fallback_category: String,
}

fn default_min_score() -> f64 {
    6.0
}
fn default_engagement_divisor() -> u64 {
    100
}
fn default_min_engagement() -> f64 {
    100.0
}
fn default_fallback_category() -> String {
    "lifestyle".to_string()
}

impl Default for RankCfg {
    fn default() -> Self {
        Self {
            min_score: default_min_score(),
            engagement_divisor: default_engagement_divisor(),
            min_engagement: default_min_engagement(),
            engagement_weights: HashMap::new(),
            priority_weights: HashMap::new(),
            category_weights: HashMap::new(),
            category_rules: Vec::new(),
            fallback_category: default_fallback_category(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    #[serde(default = "default_scan_label")]
    pub scan_label: String,
    #[serde(default)]
    pub brand_terms: Vec<String>,
    #[serde(default)]
    pub limiter: LimiterCfg,
    #[serde(default)]
    pub retry: RetryCfg,
    #[serde(default)]
    pub pacing: PacingCfg,
    #[serde(default)]
    pub discovery: DiscoveryCfg,
    #[serde(default)]
    pub filters: FilterCfg,
    #[serde(default)]
    pub rank: RankCfg,
}

fn default_scan_label() -> String {
    "channel_scan".to_string()
}

impl ScannerConfig {
    /// Load from `$SCANNER_CONFIG_PATH`, then `config/scanner.toml`, then the
    /// built-in seed.
    pub fn load_default() -> Self {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            if let Ok(cfg) = Self::load_from(Path::new(&p)) {
                return cfg;
            }
        }
        let fallback = PathBuf::from(DEFAULT_CONFIG_PATH);
        if fallback.exists() {
            if let Ok(cfg) = Self::load_from(&fallback) {
                return cfg;
            }
        }
        Self::default_seed()
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading scanner config from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: ScannerConfig = toml::from_str(s).context("parsing scanner config")?;
        cfg.fill_empty_tables();
        Ok(cfg)
    }

    /// Built-in seed mirroring the production tables: a sailing brand tracked
    /// across sailing/fashion/lifestyle sources.
    pub fn default_seed() -> Self {
        let mut cfg = Self {
            scan_label: default_scan_label(),
            brand_terms: vec![
                "north sails".to_string(),
                "northsails".to_string(),
                "норт сейлс".to_string(),
            ],
            limiter: LimiterCfg::default(),
            retry: RetryCfg::default(),
            pacing: PacingCfg::default(),
            discovery: DiscoveryCfg::default(),
            filters: FilterCfg::default(),
            rank: RankCfg::default(),
        };
        cfg.fill_empty_tables();
        cfg
    }

    /// Seed any weight table the config file left empty.
    fn fill_empty_tables(&mut self) {
        if self.rank.engagement_weights.is_empty() {
            for (k, v) in [("views", 1.0), ("forwards", 10.0), ("likes", 1.0), ("comments", 3.0), ("reposts", 5.0)] {
                self.rank.engagement_weights.insert(k.to_string(), v);
            }
        }
        if self.rank.priority_weights.is_empty() {
            for (k, v) in [("Critical", 3.0), ("High", 2.0), ("Medium", 1.0), ("Low", 0.0)] {
                self.rank.priority_weights.insert(k.to_string(), v);
            }
        }
        if self.rank.category_weights.is_empty() {
            for (k, v) in [
                ("Sailing", 3.0),
                ("Fashion", 2.0),
                ("Lifestyle", 2.0),
                ("Competitor", 1.0),
                ("Influencer", 1.0),
                ("Brand", 1.0),
                ("News", 0.5),
                ("Community", 0.5),
            ] {
                self.rank.category_weights.insert(k.to_string(), v);
            }
        }
        if self.rank.category_rules.is_empty() {
            self.rank.category_rules = vec![
                CategoryRule {
                    name: "sailing".to_string(),
                    vocabulary: vec!["sail".to_string(), "яхт".to_string(), "regatta".to_string()],
                },
                CategoryRule {
                    name: "fashion".to_string(),
                    vocabulary: vec!["fashion".to_string(), "мод".to_string()],
                },
                CategoryRule {
                    name: "luxury".to_string(),
                    vocabulary: vec!["luxury".to_string(), "премиум".to_string()],
                },
            ];
        }
    }

    /// Assemble the pure ranking inputs from this config.
    pub fn rank_settings(&self) -> RankSettings {
        RankSettings {
            brand_terms: self.brand_terms.clone(),
            min_score: self.rank.min_score,
            engagement: EngagementWeights {
                weights: self.rank.engagement_weights.clone(),
            },
            engagement_divisor: self.rank.engagement_divisor,
            min_engagement: self.rank.min_engagement,
            priority_weights: self.rank.priority_weights.clone(),
            category_weights: self.rank.category_weights.clone(),
            category_rules: self.rank.category_rules.clone(),
            fallback_category: self.rank.fallback_category.clone(),
        }
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self::default_seed()
    }
}
