//! # optiq-core
//!
//! Deterministic multi-modal content quality scoring and optimization
//! engine.
//!
//! This crate provides the core evaluation logic for Optiq, answering:
//! - How good is this content against a quality profile?
//! - What should change first, and how much would it help?
//! - What does the content look like after bounded optimization?
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: Same features and profile always produce the
//!    same scores, recommendations, and optimization path
//! 2. **Bounded**: Every optimization run terminates, and no applied
//!    adjustment ever violates a configured hard bound
//! 3. **Traceable**: Every recommendation cites its feature, rule, and
//!    estimated impact; every run keeps its full score history
//! 4. **Degradation over failure**: A missing or malformed feature
//!    lowers a score, it never aborts an evaluation
//!
//! ## Example
//!
//! ```rust,ignore
//! use optiq_core::{optimize, ContentFeatures, Profile, TerminationReason};
//!
//! let profile = Profile::from_yaml_file("broadcast.yaml")?;
//! let features = ContentFeatures::from_json_file("episode.json")?;
//! let outcome = optimize(features, &profile);
//!
//! match outcome.termination {
//!     TerminationReason::TargetReached => println!("OK: {:.2}", outcome.final_score()),
//!     TerminationReason::NoFurtherGain => println!("Plateau at {:.2}", outcome.final_score()),
//!     other => println!("Stopped: {}", other),
//! }
//! ```

pub mod features;
pub mod normalize;
pub mod optimize;
pub mod profile;
pub mod recommend;
pub mod scoring;
pub mod tracks;
pub mod types;

// Re-export main types at crate root
pub use features::{ContentFeatures, FeatureError, FeatureSet, FeatureValue};
pub use normalize::{normalize, NormalizeError};
pub use optimize::optimize;
pub use profile::{
    validate_profile_schema, Bound, ModalityRules, ModalityWeights, Profile, ProfileError, Rule,
    RuleKind, Threshold, TrackWeights,
};
pub use recommend::recommend;
pub use scoring::{score_content, score_modality, score_overall};
pub use tracks::optimize_dual_track;
pub use types::{
    AppliedRecommendation, DualTrackOutcome, Modality, OptimizationOutcome, Priority,
    PriorityFilter, Recommendation, ScoreReport, SkippedRecommendation, SubScore,
    TerminationReason,
};
