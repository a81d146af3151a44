//! Profile parsing from YAML/JSON.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::features::parse_bitrate;
use crate::types::Modality;

/// Errors that can occur when loading an optimization profile.
///
/// All of these are fatal at run start; a profile that fails to load
/// never reaches the executor.
#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("Failed to read profile file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Profile validation failed: {0}")]
    ValidationError(String),

    #[error("Unsupported rule kind '{kind}' on rule for '{feature}'")]
    UnsupportedRuleKind { kind: String, feature: String },
}

/// Comparison kind of a rule.
///
/// Closed set fixed by the configuration schema; each kind has exactly
/// one normalization function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// Floor the feature must meet (minimum resolution, sample rate).
    Min,
    /// Ceiling the feature must stay under (maximum bitrate).
    Max,
    /// Value the feature should sit at (target fps).
    Target,
    /// Allowed categorical values (permitted codecs/formats).
    OneOf,
}

impl RuleKind {
    /// Resolve a configured kind string. Unknown kinds stay `None` so
    /// callers can raise `UnsupportedRuleKind` with the original text.
    pub fn parse(kind: &str) -> Option<RuleKind> {
        match kind {
            "min" => Some(RuleKind::Min),
            "max" => Some(RuleKind::Max),
            "target" => Some(RuleKind::Target),
            "one_of" => Some(RuleKind::OneOf),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawThreshold {
    Number(f64),
    Dimensions(u32, u32),
    Set(Vec<String>),
    Text(String),
}

/// Threshold a rule compares against.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Threshold {
    Scalar(f64),
    Dimensions(u32, u32),
    Set(Vec<String>),
}

impl<'de> Deserialize<'de> for Threshold {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawThreshold::deserialize(deserializer)?;
        Threshold::try_from(raw).map_err(serde::de::Error::custom)
    }
}

impl TryFrom<RawThreshold> for Threshold {
    type Error = String;

    fn try_from(raw: RawThreshold) -> Result<Self, Self::Error> {
        match raw {
            RawThreshold::Number(n) => Ok(Threshold::Scalar(n)),
            RawThreshold::Dimensions(w, h) => Ok(Threshold::Dimensions(w, h)),
            RawThreshold::Set(values) => Ok(Threshold::Set(values)),
            RawThreshold::Text(s) => parse_bitrate(&s)
                .map(Threshold::Scalar)
                .ok_or_else(|| format!("threshold '{s}' is not a number, [w, h], or bitrate")),
        }
    }
}

impl Threshold {
    /// Comparable magnitude; dimensions compare by pixel area.
    pub fn magnitude(&self) -> Option<f64> {
        match self {
            Threshold::Scalar(n) => Some(*n),
            Threshold::Dimensions(w, h) => Some(f64::from(*w) * f64::from(*h)),
            Threshold::Set(_) => None,
        }
    }
}

impl std::fmt::Display for Threshold {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Threshold::Scalar(n) => write!(f, "{n}"),
            Threshold::Dimensions(w, h) => write!(f, "{w}x{h}"),
            Threshold::Set(values) => write!(f, "{}", values.join(", ")),
        }
    }
}

fn default_weight() -> f64 {
    1.0
}

/// A named constraint on one feature.
///
/// Thresholds are read-only during a run; hot-reloaded profiles never
/// affect in-flight runs, which keep the snapshot they started with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Feature this rule constrains (e.g. "resolution", "bitrate").
    pub feature: String,

    /// Comparison kind as configured. Resolved through
    /// [`RuleKind::parse`]; unknown kinds fail validation at load.
    pub kind: String,

    pub threshold: Threshold,

    /// Weight in the modality's aggregate score.
    #[serde(default = "default_weight")]
    pub weight: f64,

    /// Mandatory rules always appear in recommendation output
    /// regardless of priority filter or impact floor.
    #[serde(default)]
    pub mandatory: bool,

    /// Sub-score awarded when a one_of rule does not match.
    #[serde(default)]
    pub penalty_floor: f64,
}

/// Hard floor/ceiling an Applying step must never cross, independent of
/// target-quality pressure. Violations are clipped and logged, never
/// raised.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bound {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<Threshold>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<Threshold>,
}

/// Rule group and hard bounds for one modality.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModalityRules {
    #[serde(default)]
    pub rules: Vec<Rule>,

    /// Hard bounds keyed by feature name.
    #[serde(default)]
    pub bounds: BTreeMap<String, Bound>,
}

/// Per-modality weights in the overall score. Renormalized over the
/// modalities actually present, so a missing track never zeroes out the
/// overall score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModalityWeights {
    #[serde(default = "ModalityWeights::default_video")]
    pub video: f64,
    #[serde(default = "ModalityWeights::default_audio")]
    pub audio: f64,
    #[serde(default = "ModalityWeights::default_text")]
    pub seo: f64,
    #[serde(default = "ModalityWeights::default_text")]
    pub geo: f64,
}

impl ModalityWeights {
    fn default_video() -> f64 {
        0.5
    }
    fn default_audio() -> f64 {
        0.3
    }
    fn default_text() -> f64 {
        0.1
    }

    pub fn weight(&self, modality: Modality) -> f64 {
        match modality {
            Modality::Video => self.video,
            Modality::Audio => self.audio,
            Modality::Seo => self.seo,
            Modality::Geo => self.geo,
        }
    }
}

impl Default for ModalityWeights {
    fn default() -> Self {
        Self { video: 0.5, audio: 0.3, seo: 0.1, geo: 0.1 }
    }
}

/// Weights for combining the SEO and GEO track scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackWeights {
    #[serde(default = "TrackWeights::default_track")]
    pub seo: f64,
    #[serde(default = "TrackWeights::default_track")]
    pub geo: f64,
}

impl TrackWeights {
    fn default_track() -> f64 {
        0.5
    }
}

impl Default for TrackWeights {
    fn default() -> Self {
        Self { seo: 0.5, geo: 0.5 }
    }
}

fn default_iteration_limit() -> usize {
    50
}

fn default_impact_floor() -> f64 {
    0.01
}

/// An optimization profile: quality target, rule groups, weights, and
/// hard bounds for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// Version of this profile (semver).
    pub profile_version: String,

    /// Human-readable name.
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Overall score at which optimization stops, in [0, 1].
    pub target_quality: f64,

    /// Maximum Applying steps before the run is forced to terminate.
    #[serde(default = "default_iteration_limit")]
    pub iteration_limit: usize,

    /// Optional rules with estimated impact below this are suppressed
    /// from recommendation output.
    #[serde(default = "default_impact_floor")]
    pub impact_floor: f64,

    #[serde(default)]
    pub modality_weights: ModalityWeights,

    #[serde(default)]
    pub track_weights: TrackWeights,

    #[serde(default)]
    pub video: ModalityRules,

    #[serde(default)]
    pub audio: ModalityRules,

    #[serde(default)]
    pub seo: ModalityRules,

    #[serde(default)]
    pub geo: ModalityRules,
}

impl Profile {
    /// Parse a profile from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ProfileError> {
        let profile: Profile = serde_yaml::from_str(yaml)?;
        profile.validate()?;
        Ok(profile)
    }

    /// Parse a profile from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ProfileError> {
        let profile: Profile = serde_json::from_str(json)?;
        profile.validate()?;
        Ok(profile)
    }

    /// Parse a profile from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ProfileError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse a profile from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ProfileError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Rule group for a modality.
    pub fn modality_rules(&self, modality: Modality) -> &ModalityRules {
        match modality {
            Modality::Video => &self.video,
            Modality::Audio => &self.audio,
            Modality::Seo => &self.seo,
            Modality::Geo => &self.geo,
        }
    }

    /// Hard bound configured for a feature within a modality.
    pub fn bound(&self, modality: Modality, feature: &str) -> Option<&Bound> {
        self.modality_rules(modality).bounds.get(feature)
    }

    /// Clone of this profile reduced to a single track: only that
    /// modality's rules remain and it carries the full overall weight.
    /// Used by the dual-track coordinator to reuse the executor per
    /// track.
    pub fn single_track(&self, modality: Modality) -> Profile {
        let mut track = self.clone();
        let rules = self.modality_rules(modality).clone();
        track.video = ModalityRules::default();
        track.audio = ModalityRules::default();
        track.seo = ModalityRules::default();
        track.geo = ModalityRules::default();
        match modality {
            Modality::Video => track.video = rules,
            Modality::Audio => track.audio = rules,
            Modality::Seo => track.seo = rules,
            Modality::Geo => track.geo = rules,
        }
        track
    }

    /// Validate the profile semantics.
    ///
    /// Configuration errors are fatal before any run starts; front ends
    /// surface them as user-facing validation failures.
    fn validate(&self) -> Result<(), ProfileError> {
        if self.name.is_empty() {
            return Err(ProfileError::ValidationError("name must not be empty".to_string()));
        }

        if !(0.0..=1.0).contains(&self.target_quality) {
            return Err(ProfileError::ValidationError(format!(
                "target_quality must be within [0, 1], got {}",
                self.target_quality
            )));
        }

        if self.iteration_limit == 0 {
            return Err(ProfileError::ValidationError(
                "iteration_limit must be at least 1".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.impact_floor) {
            return Err(ProfileError::ValidationError(format!(
                "impact_floor must be within [0, 1], got {}",
                self.impact_floor
            )));
        }

        for modality in Modality::ALL {
            let group = self.modality_rules(modality);
            for rule in &group.rules {
                self.validate_rule(modality, rule)?;
            }
            for (feature, bound) in &group.bounds {
                validate_bound(modality, feature, bound)?;
            }
        }

        Ok(())
    }

    fn validate_rule(&self, modality: Modality, rule: &Rule) -> Result<(), ProfileError> {
        let kind = RuleKind::parse(&rule.kind).ok_or_else(|| ProfileError::UnsupportedRuleKind {
            kind: rule.kind.clone(),
            feature: rule.feature.clone(),
        })?;

        if rule.weight <= 0.0 || !rule.weight.is_finite() {
            return Err(ProfileError::ValidationError(format!(
                "{modality}.{}: weight must be positive",
                rule.feature
            )));
        }

        if !(0.0..=1.0).contains(&rule.penalty_floor) {
            return Err(ProfileError::ValidationError(format!(
                "{modality}.{}: penalty_floor must be within [0, 1]",
                rule.feature
            )));
        }

        match (kind, &rule.threshold) {
            (RuleKind::OneOf, Threshold::Set(values)) => {
                if values.is_empty() {
                    return Err(ProfileError::ValidationError(format!(
                        "{modality}.{}: one_of requires a non-empty allowed set",
                        rule.feature
                    )));
                }
            }
            (RuleKind::OneOf, _) => {
                return Err(ProfileError::ValidationError(format!(
                    "{modality}.{}: one_of requires a set threshold",
                    rule.feature
                )));
            }
            (_, Threshold::Set(_)) => {
                return Err(ProfileError::ValidationError(format!(
                    "{modality}.{}: '{}' requires a numeric or [w, h] threshold",
                    rule.feature, rule.kind
                )));
            }
            (_, threshold) => {
                // Ratio normalization divides by the threshold.
                let magnitude = threshold.magnitude().unwrap_or(0.0);
                if magnitude <= 0.0 || !magnitude.is_finite() {
                    return Err(ProfileError::ValidationError(format!(
                        "{modality}.{}: threshold must be positive",
                        rule.feature
                    )));
                }
            }
        }

        Ok(())
    }
}

fn validate_bound(modality: Modality, feature: &str, bound: &Bound) -> Result<(), ProfileError> {
    for threshold in [bound.min.as_ref(), bound.max.as_ref()].into_iter().flatten() {
        if matches!(threshold, Threshold::Set(_)) {
            return Err(ProfileError::ValidationError(format!(
                "{modality}.{feature}: bounds must be numeric or [w, h]"
            )));
        }
    }

    if let (Some(min), Some(max)) = (&bound.min, &bound.max) {
        if let (Some(lo), Some(hi)) = (min.magnitude(), max.magnitude()) {
            if lo > hi {
                return Err(ProfileError::ValidationError(format!(
                    "{modality}.{feature}: bound min exceeds bound max"
                )));
            }
        }
    }

    Ok(())
}
