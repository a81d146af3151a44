//! Shared types for scoring, recommendations, and optimization runs.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::features::{ContentFeatures, FeatureValue};

/// One content channel: video, audio, or one of the two text tracks.
///
/// SEO and GEO are separate modalities even though they score the same
/// text features, because each track carries its own rule group and
/// weight in the overall score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Video,
    Audio,
    Seo,
    Geo,
}

impl Modality {
    /// All modalities in fixed declaration order. Scoring and
    /// recommendation iterate in this order so tie-breaking is stable.
    pub const ALL: [Modality; 4] = [Modality::Video, Modality::Audio, Modality::Seo, Modality::Geo];
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modality::Video => write!(f, "video"),
            Modality::Audio => write!(f, "audio"),
            Modality::Seo => write!(f, "seo"),
            Modality::Geo => write!(f, "geo"),
        }
    }
}

/// Priority class assigned to a recommendation from its estimated impact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// Classify an estimated overall-score gain.
    pub fn from_impact(impact: f64) -> Self {
        if impact >= 0.05 {
            Priority::High
        } else if impact >= 0.02 {
            Priority::Medium
        } else {
            Priority::Low
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::High => write!(f, "high"),
            Priority::Medium => write!(f, "medium"),
            Priority::Low => write!(f, "low"),
        }
    }
}

/// Restricts recommendation output to one priority class.
///
/// Mandatory rules bypass the filter regardless of its setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityFilter {
    #[default]
    All,
    High,
    Medium,
    Low,
}

impl PriorityFilter {
    /// Whether a priority class passes this filter.
    pub fn accepts(&self, priority: Priority) -> bool {
        match self {
            PriorityFilter::All => true,
            PriorityFilter::High => priority == Priority::High,
            PriorityFilter::Medium => priority == Priority::Medium,
            PriorityFilter::Low => priority == Priority::Low,
        }
    }
}

impl FromStr for PriorityFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(PriorityFilter::All),
            "high" => Ok(PriorityFilter::High),
            "medium" => Ok(PriorityFilter::Medium),
            "low" => Ok(PriorityFilter::Low),
            other => Err(format!("unknown priority filter: {other}")),
        }
    }
}

/// Why an optimization run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// Overall score reached the configured target quality.
    TargetReached,
    /// No remaining recommendation has positive estimated impact.
    NoFurtherGain,
    /// The maximum-iteration guard fired. Reported as partial success
    /// with the best report achieved, not as an error.
    IterationLimit,
    /// Feature extraction did not complete within the configured
    /// timeout. Produced by the runtime, never by the core executor.
    ExtractionTimeout,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationReason::TargetReached => write!(f, "target_reached"),
            TerminationReason::NoFurtherGain => write!(f, "no_further_gain"),
            TerminationReason::IterationLimit => write!(f, "iteration_limit"),
            TerminationReason::ExtractionTimeout => write!(f, "extraction_timeout"),
        }
    }
}

/// A single rule's normalized satisfaction value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubScore {
    /// Feature the rule targets.
    pub feature: String,

    /// Normalized satisfaction in [0, 1].
    pub value: f64,

    /// Set when the feature was absent from the extracted set, or when
    /// its raw value could not be normalized and the failure was
    /// downgraded at the modality boundary.
    pub missing_feature: bool,
}

/// Score snapshot for one feature set.
///
/// Reports form an append-only, time-ordered history owned by the
/// optimization run; a report is never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreReport {
    /// Per-rule sub-scores, keyed by modality.
    pub sub_scores: BTreeMap<Modality, Vec<SubScore>>,

    /// Aggregate score per modality. A modality with no applicable
    /// rules (or no corresponding track) is absent, not zero.
    pub modality_scores: BTreeMap<Modality, f64>,

    /// Weighted combination of the present modality scores, in [0, 1].
    pub overall: f64,

    pub evaluated_at: DateTime<Utc>,
}

impl ScoreReport {
    /// Features flagged missing anywhere in this report.
    pub fn missing_features(&self) -> Vec<(Modality, &str)> {
        let mut missing = Vec::new();
        for (modality, subs) in &self.sub_scores {
            for sub in subs.iter().filter(|s| s.missing_feature) {
                missing.push((*modality, sub.feature.as_str()));
            }
        }
        missing
    }
}

/// A suggested change tied to one rule, ranked by estimated
/// overall-score impact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Modality (for SEO/GEO output this doubles as the track tag).
    pub modality: Modality,

    /// Feature the target rule constrains.
    pub feature: String,

    /// Comparison kind of the target rule, as configured.
    pub kind: String,

    /// Human-readable suggestion.
    pub action: String,

    pub priority: Priority,

    /// Maximum possible overall-score gain if the rule were fully
    /// satisfied, computed from the current feature set.
    pub estimated_impact: f64,

    /// Mandatory rules are always emitted regardless of filter.
    pub mandatory: bool,
}

/// Log entry for one executed Applying step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppliedRecommendation {
    /// Zero-based iteration the step ran in.
    pub iteration: usize,

    pub recommendation: Recommendation,

    /// Feature value before the adjustment, if the feature existed.
    pub previous: Option<FeatureValue>,

    /// Feature value after the adjustment, post bound clipping.
    pub applied: FeatureValue,

    /// Set when a hard bound clipped the requested adjustment.
    pub clamped: bool,
}

/// Log entry for a recommendation the executor could not apply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedRecommendation {
    pub iteration: usize,
    pub modality: Modality,
    pub feature: String,
    pub reason: String,
}

/// Structured result of one optimization run.
///
/// Every terminal state produces one of these; the executor never
/// propagates errors past its boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationOutcome {
    /// Final feature snapshot after the last Applying step.
    pub features: ContentFeatures,

    /// One report per Scoring state, in order, plus a final report when
    /// the iteration guard fires.
    pub history: Vec<ScoreReport>,

    pub applied: Vec<AppliedRecommendation>,

    pub skipped: Vec<SkippedRecommendation>,

    pub termination: TerminationReason,
}

impl OptimizationOutcome {
    /// Best (latest) score report, if any scoring ran.
    pub fn final_report(&self) -> Option<&ScoreReport> {
        self.history.last()
    }

    /// Final overall score, or 0.0 when extraction never produced a
    /// scoreable feature set.
    pub fn final_score(&self) -> f64 {
        self.final_report().map(|r| r.overall).unwrap_or(0.0)
    }
}

/// Result of running the SEO and GEO tracks over the same text content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DualTrackOutcome {
    pub seo: OptimizationOutcome,
    pub geo: OptimizationOutcome,

    /// Track-weighted mean of the two final overall scores.
    pub combined_score: f64,

    /// Both tracks' remaining recommendations, tagged by modality and
    /// sorted by estimated impact descending.
    pub recommendations: Vec<Recommendation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_from_impact_thresholds() {
        assert_eq!(Priority::from_impact(0.05), Priority::High);
        assert_eq!(Priority::from_impact(0.049), Priority::Medium);
        assert_eq!(Priority::from_impact(0.02), Priority::Medium);
        assert_eq!(Priority::from_impact(0.019), Priority::Low);
        assert_eq!(Priority::from_impact(0.0), Priority::Low);
    }

    #[test]
    fn test_priority_filter_accepts() {
        assert!(PriorityFilter::All.accepts(Priority::Low));
        assert!(PriorityFilter::High.accepts(Priority::High));
        assert!(!PriorityFilter::High.accepts(Priority::Medium));
        assert!(!PriorityFilter::Low.accepts(Priority::High));
    }

    #[test]
    fn test_priority_filter_from_str() {
        assert_eq!("all".parse::<PriorityFilter>().unwrap(), PriorityFilter::All);
        assert_eq!("HIGH".parse::<PriorityFilter>().unwrap(), PriorityFilter::High);
        assert!("urgent".parse::<PriorityFilter>().is_err());
    }

    #[test]
    fn test_termination_reason_display() {
        assert_eq!(TerminationReason::TargetReached.to_string(), "target_reached");
        assert_eq!(TerminationReason::ExtractionTimeout.to_string(), "extraction_timeout");
    }

    #[test]
    fn test_modality_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Modality::Seo).unwrap(), "\"seo\"");
        let m: Modality = serde_json::from_str("\"video\"").unwrap();
        assert_eq!(m, Modality::Video);
    }
}
