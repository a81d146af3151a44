//! Bounded batch fan-out.
//!
//! A batch spawns one task per file, gated by a semaphore so at most
//! `max_concurrency` runs extract and optimize at once. One file's
//! failure never aborts the batch; results come back in input order
//! with per-file errors carried inline.

use std::path::PathBuf;
use std::sync::Arc;

use futures::future::join_all;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use optiq_core::TerminationReason;

use crate::service::{OptimizationService, RunResult, RuntimeError};

/// One file's slot in a batch report.
#[derive(Debug, Serialize)]
pub struct BatchEntry {
    pub path: String,

    /// The run result, or the error message that replaced it.
    pub result: Result<RunResult, String>,
}

/// Aggregate counters for a batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchStats {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub target_reached: usize,
}

/// A completed batch: per-file entries in input order, plus counters.
#[derive(Debug, Serialize)]
pub struct BatchReport {
    pub entries: Vec<BatchEntry>,
    pub stats: BatchStats,
}

/// Optimize a set of files with bounded concurrency.
pub async fn optimize_batch(
    service: Arc<OptimizationService>,
    paths: Vec<PathBuf>,
) -> BatchReport {
    let limit = service_concurrency(&service);
    let semaphore = Arc::new(Semaphore::new(limit));
    let stats = Arc::new(RwLock::new(BatchStats { total: paths.len(), ..Default::default() }));

    tracing::info!(files = paths.len(), limit, "Starting batch");

    // Path labels stay outside the tasks so a panicked worker's report
    // slot still names its input file.
    let (labels, tasks): (Vec<_>, Vec<_>) = paths
        .into_iter()
        .map(|path| {
            let service = Arc::clone(&service);
            let semaphore = Arc::clone(&semaphore);
            let stats = Arc::clone(&stats);
            let label = path.display().to_string();
            let entry_path = label.clone();

            let task = tokio::spawn(async move {
                // Closed only if the batch itself is torn down.
                let _permit = match semaphore.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return BatchEntry {
                            path: entry_path,
                            result: Err("batch cancelled".to_string()),
                        }
                    }
                };

                let result = service.optimize_file(&path).await;
                record(&stats, &result);

                BatchEntry {
                    path: entry_path,
                    result: result.map_err(|e| e.to_string()),
                }
            });
            (label, task)
        })
        .unzip();

    let mut entries = Vec::with_capacity(tasks.len());
    for (label, joined) in labels.into_iter().zip(join_all(tasks).await) {
        match joined {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                // A panicked worker keeps its slot so input order holds.
                stats.write().failed += 1;
                entries.push(BatchEntry {
                    path: label,
                    result: Err(RuntimeError::Join(e.to_string()).to_string()),
                });
            }
        }
    }

    let stats = stats.read().clone();
    tracing::info!(
        succeeded = stats.succeeded,
        failed = stats.failed,
        timed_out = stats.timed_out,
        "Batch finished"
    );

    BatchReport { entries, stats }
}

fn record(stats: &RwLock<BatchStats>, result: &Result<RunResult, RuntimeError>) {
    let mut stats = stats.write();
    match result {
        Ok(run) if run.outcome.termination == TerminationReason::ExtractionTimeout => {
            stats.timed_out += 1;
        }
        Ok(run) => {
            stats.succeeded += 1;
            if run.outcome.termination == TerminationReason::TargetReached {
                stats.target_reached += 1;
            }
        }
        Err(_) => stats.failed += 1,
    }
}

fn service_concurrency(service: &OptimizationService) -> usize {
    service.max_concurrency().max(1)
}
