//! # Backup Store
//! Every ranked batch is written to local JSON before any external
//! persistence is attempted, so a sink outage never loses a scan. Records
//! are immutable once written and kept until externally pruned.

use crate::pipeline::ScoredPost;
use crate::trending::TrendingSet;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("backup {0} not found")]
    NotFound(String),
    #[error("backup io: {0}")]
    Io(#[from] std::io::Error),
    #[error("backup codec: {0}")]
    Codec(#[from] serde_json::Error),
}

/// One recorded scan batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupRecord {
    pub backup_id: String,
    pub timestamp: DateTime<Utc>,
    pub source_label: String,
    pub document_count: usize,
    pub documents: Vec<ScoredPost>,
    pub trending_summary: TrendingSet,
}

/// Lightweight listing entry; the full record stays on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupSummary {
    pub backup_id: String,
    pub timestamp: DateTime<Utc>,
    pub source_label: String,
    pub document_count: usize,
}

/// File-backed store: one JSON file per record under `dir`. The host may be
/// ephemeral, so `list`/`retrieve` degrade gracefully when nothing is there.
#[derive(Debug)]
pub struct FileBackupStore {
    dir: PathBuf,
    seq: AtomicU64,
}

impl FileBackupStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            seq: AtomicU64::new(0),
        }
    }

    /// Record one scan batch. Callers must not touch the external sink until
    /// this has returned `Ok`.
    pub fn record(
        &self,
        source_label: &str,
        documents: &[ScoredPost],
        trending: &TrendingSet,
    ) -> Result<String, BackupError> {
        let now = Utc::now();
        // The timestamp alone can collide under rapid calls; a per-process
        // sequence keeps ids unique.
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let backup_id = format!("{}_{:04}", now.timestamp(), seq);

        let record = BackupRecord {
            backup_id: backup_id.clone(),
            timestamp: now,
            source_label: source_label.to_string(),
            document_count: documents.len(),
            documents: documents.to_vec(),
            trending_summary: trending.clone(),
        };

        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(&backup_id);
        fs::write(&path, serde_json::to_vec_pretty(&record)?)?;

        tracing::info!(
            backup_id = %backup_id,
            documents = record.document_count,
            "scan batch backed up"
        );
        metrics::counter!("scan_backup_records_total").increment(1);
        Ok(backup_id)
    }

    /// Summaries of every readable record, oldest first. Missing directory
    /// or unreadable files yield an empty/partial list, never an error.
    pub fn list(&self) -> Vec<BackupSummary> {
        let mut out = Vec::new();
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return out;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            let Ok(content) = fs::read_to_string(&path) else {
                continue;
            };
            if let Ok(rec) = serde_json::from_str::<BackupRecord>(&content) {
                out.push(BackupSummary {
                    backup_id: rec.backup_id,
                    timestamp: rec.timestamp,
                    source_label: rec.source_label,
                    document_count: rec.document_count,
                });
            }
        }
        out.sort_by(|a, b| a.backup_id.cmp(&b.backup_id));
        out
    }

    /// Load a full record by id.
    pub fn retrieve(&self, backup_id: &str) -> Result<BackupRecord, BackupError> {
        let path = self.path_for(backup_id);
        if !path.exists() {
            return Err(BackupError::NotFound(backup_id.to_string()));
        }
        let content = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn path_for(&self, backup_id: &str) -> PathBuf {
        self.dir.join(format!("backup_{backup_id}.json"))
    }
}
