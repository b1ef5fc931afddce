//! # Scan Orchestrator
//! One scan, start to finish: fetch every source unit (rate limited,
//! retried, partial-failure tolerant), normalize and dedup the batch,
//! discover trending terms, rank, back up, then hand off to the persistence
//! sink best-effort. Per-unit errors are logged and carried in the report;
//! only an empty roster or a backup failure aborts the whole scan.

use crate::backup::{BackupError, FileBackupStore};
use crate::config::ScannerConfig;
use crate::limiter::RateLimiter;
use crate::normalize::{self, anon_hash};
use crate::pipeline::{self, ScoredPost};
use crate::retry::{FetchError, RetryingCaller};
use crate::trending::{self, TrendingSet};
use crate::types::{RawDocument, SourceMeta};
use async_trait::async_trait;
use chrono::Utc;
use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Top-N trending terms included in the upward payload.
const REPORT_TRENDING_TOP: usize = 10;
/// Posts at or above this score count as high-score in the summary.
const HIGH_SCORE_FLOOR: f64 = 8.0;

/// Fetch collaborator: delivers raw posts for one source unit.
#[async_trait]
pub trait SourceClient: Send + Sync {
    async fn fetch_posts(&self, source: &SourceMeta) -> Result<Vec<RawDocument>, FetchError>;
    fn name(&self) -> &'static str;
}

/// Persistence collaborator (document database). Must treat zero documents
/// as a no-op, not an error.
#[async_trait]
pub trait PersistenceSink: Send + Sync {
    async fn persist(&self, posts: &[ScoredPost], trending: &TrendingSet) -> Result<(), FetchError>;
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("source roster is empty")]
    EmptyRoster,
    #[error("backup failed: {0}")]
    Backup(#[from] BackupError),
    #[error("scan aborted")]
    Aborted,
}

/// Cooperative cancellation, checked between source units.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UnitFailure {
    pub source_id: String,
    pub error: String,
}

/// What happened to the external write, reported rather than thrown: the
/// backup record already holds the data either way.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PersistOutcome {
    Stored,
    Failed { backup_id: String, error: String },
}

/// The upward-facing result of one scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub source_label: String,
    pub total_posts: usize,
    pub posts: Vec<ScoredPost>,
    pub trending: TrendingSet,
    pub categories: BTreeMap<String, usize>,
    pub avg_final_score: f64,
    pub high_score_posts: usize,
    pub unit_failures: Vec<UnitFailure>,
    pub skipped_sources: usize,
    pub backup_id: String,
    pub persistence: PersistOutcome,
}

/// One-time metrics registration (so series show up on the host exporter).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("scan_documents_total", "Raw documents fetched across all scans.");
        describe_counter!("scan_unit_errors_total", "Source units that failed to fetch.");
        describe_counter!(
            "scan_backup_records_total",
            "Backup records written before persistence."
        );
        describe_gauge!("scan_last_run_ts", "Unix ts when a scan last completed.");
    });
}

/// Drives scans with a shared limiter and the configured pacing.
pub struct Scanner {
    caller: RetryingCaller,
    cfg: ScannerConfig,
}

impl Scanner {
    pub fn new(cfg: ScannerConfig) -> Self {
        let limiter = RateLimiter::new(
            cfg.limiter.per_minute_quota,
            Duration::from_millis(cfg.limiter.min_spacing_ms),
        );
        Self {
            caller: RetryingCaller::new(limiter),
            cfg,
        }
    }

    /// Build with an externally owned limiter (shared across scanners).
    pub fn with_caller(cfg: ScannerConfig, caller: RetryingCaller) -> Self {
        Self { caller, cfg }
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.cfg
    }

    /// Run one scan over the given roster.
    pub async fn run_scan(
        &self,
        client: &dyn SourceClient,
        sink: &dyn PersistenceSink,
        backup: &FileBackupStore,
        sources: &[SourceMeta],
        abort: &AbortHandle,
    ) -> Result<ScanReport, ScanError> {
        ensure_metrics_described();

        if sources.is_empty() {
            return Err(ScanError::EmptyRoster);
        }

        let raw_result = self.fetch_all(client, sources, abort).await?;
        let (raw, unit_failures, skipped_sources) = raw_result;

        let now = Utc::now();
        let (docs, dropped_short, deduped) = normalize::normalize_filter_dedup(
            now,
            raw,
            self.cfg.filters.min_text_chars,
            self.cfg.filters.dedup_window_secs,
        );
        info!(
            kept = docs.len(),
            dropped_short, deduped, "batch normalized"
        );

        let trending = trending::discover(
            docs.iter().map(|d| d.text.as_str()),
            self.cfg.discovery.min_frequency,
        );

        let posts = pipeline::rank(&docs, &trending, &self.cfg.rank_settings());
        for post in &posts {
            debug!(
                id = %anon_hash(&post.text),
                score = post.final_score,
                category = %post.assigned_category,
                "post ranked"
            );
        }

        // Backup is unconditional and must land before the sink sees anything.
        let backup_id = backup.record(&self.cfg.scan_label, &posts, &trending)?;

        let persistence = match self
            .caller
            .call("persistence.write", self.cfg.retry.metadata_policy(), || {
                sink.persist(&posts, &trending)
            })
            .await
        {
            Ok(()) => PersistOutcome::Stored,
            Err(e) => {
                warn!(
                    backup_id = %backup_id,
                    error = %e,
                    "persistence failed, data preserved in backup"
                );
                PersistOutcome::Failed {
                    backup_id: backup_id.clone(),
                    error: e.to_string(),
                }
            }
        };

        gauge!("scan_last_run_ts").set(now.timestamp() as f64);

        let mut categories: BTreeMap<String, usize> = BTreeMap::new();
        for post in &posts {
            *categories.entry(post.assigned_category.clone()).or_insert(0) += 1;
        }
        let avg_final_score = if posts.is_empty() {
            0.0
        } else {
            posts.iter().map(|p| p.final_score).sum::<f64>() / posts.len() as f64
        };
        let high_score_posts = posts.iter().filter(|p| p.final_score >= HIGH_SCORE_FLOOR).count();

        info!(
            total_posts = posts.len(),
            unit_failures = unit_failures.len(),
            skipped_sources,
            backup_id = %backup_id,
            "scan completed"
        );

        Ok(ScanReport {
            source_label: self.cfg.scan_label.clone(),
            total_posts: posts.len(),
            trending: trending.top(REPORT_TRENDING_TOP),
            categories,
            avg_final_score,
            high_score_posts,
            unit_failures,
            skipped_sources,
            backup_id,
            persistence,
            posts,
        })
    }

    /// Fetch every unit, batch by batch. Per-unit errors are collected, not
    /// propagated; sources without a usable id are skipped outright.
    async fn fetch_all(
        &self,
        client: &dyn SourceClient,
        sources: &[SourceMeta],
        abort: &AbortHandle,
    ) -> Result<(Vec<RawDocument>, Vec<UnitFailure>, usize), ScanError> {
        let unit_pause = Duration::from_secs(self.cfg.pacing.unit_pause_secs);
        let batch_pause = Duration::from_secs(self.cfg.pacing.batch_pause_secs);
        let batch_size = self.cfg.pacing.batch_size.max(1);

        let mut raw: Vec<RawDocument> = Vec::new();
        let mut unit_failures = Vec::new();
        let mut skipped_sources = 0usize;

        let op = format!("{}.fetch_posts", client.name());
        let batch_count = sources.len().div_ceil(batch_size);

        for (bi, batch) in sources.chunks(batch_size).enumerate() {
            if bi > 0 {
                debug!(batch = bi + 1, total = batch_count, "batch pause");
                sleep(batch_pause).await;
            }

            for source in batch {
                if abort.is_aborted() {
                    return Err(ScanError::Aborted);
                }

                if source.id.trim().is_empty() {
                    warn!(name = %source.name, "source without usable id skipped");
                    skipped_sources += 1;
                    continue;
                }

                match self
                    .caller
                    .call(&op, self.cfg.retry.listing_policy(), || {
                        client.fetch_posts(source)
                    })
                    .await
                {
                    Ok(mut docs) => {
                        debug!(source = %source.id, fetched = docs.len(), "unit fetched");
                        counter!("scan_documents_total").increment(docs.len() as u64);
                        raw.append(&mut docs);
                    }
                    Err(e) => {
                        // One bad unit must not sink the batch.
                        warn!(source = %source.id, error = %e, "source unit failed, continuing");
                        counter!("scan_unit_errors_total").increment(1);
                        unit_failures.push(UnitFailure {
                            source_id: source.id.clone(),
                            error: e.to_string(),
                        });
                    }
                }

                sleep(unit_pause).await;
            }
        }

        Ok((raw, unit_failures, skipped_sources))
    }
}
