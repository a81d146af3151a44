//! Optimization service: extraction, caching, and engine invocation.
//!
//! The service owns the async boundary. Extraction runs under a
//! timeout; everything past the extracted features is the synchronous
//! deterministic engine. A timed-out extraction is a reportable
//! outcome, not an error: the run terminates with `ExtractionTimeout`
//! and an empty history so batch callers can account for it uniformly.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use optiq_core::{
    optimize, optimize_dual_track, recommend, score_content, ContentFeatures, DualTrackOutcome,
    FeatureSet, OptimizationOutcome, PriorityFilter, Profile, Recommendation, ScoreReport,
    TerminationReason,
};

use crate::cache::{CacheKey, FeatureCache};
use crate::config::RuntimeConfig;
use crate::extract::{ExtractError, FeatureExtractor, ManifestExtractor};

/// Errors from the optimization service.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractError),

    #[error("Extraction timed out")]
    Timeout,

    #[error("Worker task failed: {0}")]
    Join(String),
}

/// One file's optimization result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub path: String,

    pub outcome: OptimizationOutcome,

    /// Wall-clock time for the whole run, extraction included.
    pub processing_time_ms: u64,

    pub completed_at: chrono::DateTime<chrono::Utc>,
}

/// Scoring, recommendation, and optimization over extracted content.
pub struct OptimizationService {
    extractor: Arc<dyn FeatureExtractor>,
    profile: Arc<Profile>,
    config: RuntimeConfig,
    cache: FeatureCache,
}

impl OptimizationService {
    /// Create a service with the default manifest extractor.
    pub fn new(profile: Profile, config: RuntimeConfig) -> Self {
        Self::with_extractor(Arc::new(ManifestExtractor::new()), profile, config)
    }

    pub fn with_extractor(
        extractor: Arc<dyn FeatureExtractor>,
        profile: Profile,
        config: RuntimeConfig,
    ) -> Self {
        let cache = FeatureCache::from_config(&config.cache);
        Self {
            extractor,
            profile: Arc::new(profile),
            config,
            cache,
        }
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn max_concurrency(&self) -> usize {
        self.config.max_concurrency
    }

    /// Score a file without optimizing it.
    pub async fn score_file(&self, path: &Path) -> Result<ScoreReport, RuntimeError> {
        let features = self.extract(path).await.map_err(|_| RuntimeError::Timeout)??;
        Ok(score_content(&features, &self.profile))
    }

    /// Rank open recommendations for a file.
    pub async fn recommend_file(
        &self,
        path: &Path,
        filter: PriorityFilter,
    ) -> Result<Vec<Recommendation>, RuntimeError> {
        let features = self.extract(path).await.map_err(|_| RuntimeError::Timeout)??;
        Ok(recommend(&features, &self.profile, filter))
    }

    /// Run the full optimization loop over a file.
    ///
    /// Extraction timeouts produce a `RunResult` whose outcome carries
    /// `TerminationReason::ExtractionTimeout`; other extraction
    /// failures are errors.
    pub async fn optimize_file(&self, path: &Path) -> Result<RunResult, RuntimeError> {
        let started = Instant::now();
        let path_text = path.display().to_string();

        let features = match self.extract(path).await {
            Ok(extracted) => extracted?,
            Err(_elapsed) => {
                tracing::warn!(
                    path = %path_text,
                    timeout = ?self.config.extraction_timeout,
                    "Extraction timed out"
                );
                return Ok(RunResult {
                    path: path_text,
                    outcome: timed_out_outcome(),
                    processing_time_ms: elapsed_ms(started),
                    completed_at: chrono::Utc::now(),
                });
            }
        };

        let outcome = optimize(features, &self.profile);
        tracing::info!(
            path = %path_text,
            termination = %outcome.termination,
            score = outcome.final_score(),
            "Optimization run finished"
        );

        Ok(RunResult {
            path: path_text,
            outcome,
            processing_time_ms: elapsed_ms(started),
            completed_at: chrono::Utc::now(),
        })
    }

    /// Run both content tracks over already-extracted text features.
    pub fn optimize_text(&self, text: FeatureSet) -> DualTrackOutcome {
        optimize_dual_track(text, &self.profile)
    }

    /// Extract features with cache and timeout. The outer error is the
    /// timeout; the inner one is extraction failure.
    async fn extract(
        &self,
        path: &Path,
    ) -> Result<Result<ContentFeatures, RuntimeError>, tokio::time::error::Elapsed> {
        let key = CacheKey::new(path, self.extractor.name());
        if let Some(cached) = self.cache.get(&key).await {
            tracing::debug!(path = %path.display(), "Feature cache hit");
            return Ok(Ok(cached));
        }

        let extracted =
            tokio::time::timeout(self.config.extraction_timeout, self.extractor.extract(path))
                .await?;

        match extracted {
            Ok(features) => {
                self.cache.insert(key, features.clone()).await;
                Ok(Ok(features))
            }
            Err(e) => Ok(Err(RuntimeError::from(e))),
        }
    }
}

fn timed_out_outcome() -> OptimizationOutcome {
    OptimizationOutcome {
        features: ContentFeatures::default(),
        history: Vec::new(),
        applied: Vec::new(),
        skipped: Vec::new(),
        termination: TerminationReason::ExtractionTimeout,
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
