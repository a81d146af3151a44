//! # optiq-runtime
//!
//! Async extraction and batch optimization for Optiq.
//!
//! This crate wraps the deterministic engine in `optiq-core` with the
//! pieces a real pipeline needs: feature extraction with a timeout,
//! a feature cache, and bounded-concurrency batch fan-out.
//!
//! ## Boundary
//!
//! All async work happens before the engine runs. An extractor turns
//! a path into features; everything from scoring onward is the
//! synchronous engine, so two runs over the same features are always
//! identical regardless of scheduling.
//!
//! ## Example
//!
//! ```rust,ignore
//! use optiq_runtime::{OptimizationService, RuntimeConfig};
//! use optiq_core::Profile;
//!
//! let profile = Profile::from_yaml_file("broadcast.yaml")?;
//! let service = OptimizationService::new(profile, RuntimeConfig::default());
//!
//! let result = service.optimize_file(Path::new("episode.json")).await?;
//! println!("{}: {:.2}", result.path, result.outcome.final_score());
//! ```

pub mod batch;
pub mod cache;
pub mod config;
pub mod extract;
pub mod service;

pub use batch::{optimize_batch, BatchEntry, BatchReport, BatchStats};
pub use cache::{CacheKey, FeatureCache};
pub use config::{CacheConfig, RuntimeConfig};
pub use extract::{ExtractError, FeatureExtractor, ManifestExtractor};
pub use service::{OptimizationService, RunResult, RuntimeError};
