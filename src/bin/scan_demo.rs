//! Demo that runs one scan over fixture sources and prints the report JSON.
//! Pacing is shortened so the demo finishes in seconds.

use async_trait::async_trait;
use brand_trend_scanner::{
    AbortHandle, FetchError, FileBackupStore, PersistenceSink, RawDocument, ScannerConfig,
    Scanner, ScoredPost, SourceClient, SourceMeta, TrendingSet,
};
use chrono::Utc;
use std::collections::BTreeMap;

struct FixtureClient;

fn doc(source: &SourceMeta, text: &str, views: u64, forwards: u64) -> RawDocument {
    let mut engagement = BTreeMap::new();
    engagement.insert("views".to_string(), views);
    engagement.insert("forwards".to_string(), forwards);
    RawDocument {
        source_id: source.id.clone(),
        source_category: source.category.clone(),
        source_priority: source.priority.clone(),
        text: text.to_string(),
        engagement,
        published_at: Utc::now(),
    }
}

#[async_trait]
impl SourceClient for FixtureClient {
    async fn fetch_posts(&self, source: &SourceMeta) -> Result<Vec<RawDocument>, FetchError> {
        Ok(vec![
            doc(
                source,
                "North Sails opened the regatta season with a new sail line for offshore crews",
                5000,
                40,
            ),
            doc(
                source,
                "Weekend forecast for the harbor looks calm, good conditions for training runs",
                1200,
                3,
            ),
        ])
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}

struct LogSink;

#[async_trait]
impl PersistenceSink for LogSink {
    async fn persist(&self, posts: &[ScoredPost], trending: &TrendingSet) -> Result<(), FetchError> {
        tracing::info!(
            posts = posts.len(),
            trending_words = trending.words.len(),
            "sink received batch"
        );
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let mut cfg = ScannerConfig::load_default();
    cfg.pacing.unit_pause_secs = 0;
    cfg.pacing.batch_pause_secs = 0;
    cfg.discovery.min_frequency = 2;
    cfg.rank.min_score = 1.0;
    cfg.rank.min_engagement = 10.0;

    let scanner = Scanner::new(cfg);
    let backup = FileBackupStore::new("backups");

    let sources = vec![
        SourceMeta {
            id: "@harbor_life".to_string(),
            name: "Harbor Life".to_string(),
            category: "Sailing".to_string(),
            priority: "High".to_string(),
        },
        SourceMeta {
            id: "@coastal_style".to_string(),
            name: "Coastal Style".to_string(),
            category: "Fashion".to_string(),
            priority: "Medium".to_string(),
        },
    ];

    let report = scanner
        .run_scan(&FixtureClient, &LogSink, &backup, &sources, &AbortHandle::new())
        .await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
