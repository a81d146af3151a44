//! Optimization profile parsing and validation.
//!
//! Profiles are structured data validated against JSON Schema. This
//! module handles parsing YAML/JSON profiles and validating them before
//! any run starts; rule thresholds are immutable for a run's lifetime.

mod parser;
mod schema;

pub use parser::{
    Bound, ModalityRules, ModalityWeights, Profile, ProfileError, Rule, RuleKind, Threshold,
    TrackWeights,
};
pub use schema::validate_profile_schema;
