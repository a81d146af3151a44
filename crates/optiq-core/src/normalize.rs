//! Feature normalization: raw metric to a [0, 1] sub-score.
//!
//! One normalization function per rule kind, on a closed set:
//!
//! - `min`:    clamp(value / threshold) — exceeding the minimum caps at
//!   1.0, no bonus above it
//! - `max`:    clamp(threshold / value) — a zero value is a data error
//! - `target`: 1 − clamp(|value − threshold| / threshold) — exact match
//!   is 1.0, deviation degrades linearly
//! - `one_of`: 1.0 on membership, otherwise the rule's penalty floor

use thiserror::Error;

use crate::features::FeatureValue;
use crate::profile::{Rule, RuleKind, Threshold};

/// Errors from normalizing a single feature.
///
/// These never abort a whole modality: the modality scorer downgrades
/// them to a missing-feature sub-score at its boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NormalizeError {
    #[error("Invalid feature value for '{feature}': {reason}")]
    InvalidFeatureValue { feature: String, reason: String },

    #[error("Unsupported rule kind '{kind}' for '{feature}'")]
    UnsupportedRuleKind { kind: String, feature: String },
}

fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

fn invalid(rule: &Rule, reason: impl Into<String>) -> NormalizeError {
    NormalizeError::InvalidFeatureValue { feature: rule.feature.clone(), reason: reason.into() }
}

/// Comparable magnitude of a raw value, rejecting negatives and
/// non-numeric text: ratio normalization requires a value ≥ 0.
fn magnitude(value: &FeatureValue, rule: &Rule) -> Result<f64, NormalizeError> {
    let raw = value
        .magnitude()
        .ok_or_else(|| invalid(rule, format!("'{value}' is not comparable to a numeric threshold")))?;
    if raw < 0.0 {
        return Err(invalid(rule, format!("negative value {raw}")));
    }
    Ok(raw)
}

fn threshold_magnitude(rule: &Rule) -> Result<f64, NormalizeError> {
    match rule.threshold.magnitude() {
        Some(t) if t > 0.0 && t.is_finite() => Ok(t),
        _ => Err(invalid(rule, "rule threshold is not a positive number")),
    }
}

/// Normalize one raw feature value against one rule.
///
/// The result is always within [0, 1] for any accepted input; values
/// the rule cannot interpret fail with `InvalidFeatureValue` and an
/// unknown configured kind fails with `UnsupportedRuleKind`.
pub fn normalize(value: &FeatureValue, rule: &Rule) -> Result<f64, NormalizeError> {
    let kind = RuleKind::parse(&rule.kind).ok_or_else(|| NormalizeError::UnsupportedRuleKind {
        kind: rule.kind.clone(),
        feature: rule.feature.clone(),
    })?;

    match kind {
        RuleKind::Min => {
            let raw = magnitude(value, rule)?;
            let threshold = threshold_magnitude(rule)?;
            Ok(clamp01(raw / threshold))
        }
        RuleKind::Max => {
            let raw = magnitude(value, rule)?;
            if raw == 0.0 {
                return Err(invalid(rule, "zero value where a ratio is required"));
            }
            let threshold = threshold_magnitude(rule)?;
            Ok(clamp01(threshold / raw))
        }
        RuleKind::Target => {
            let raw = magnitude(value, rule)?;
            let threshold = threshold_magnitude(rule)?;
            Ok(1.0 - clamp01((raw - threshold).abs() / threshold))
        }
        RuleKind::OneOf => {
            let Threshold::Set(allowed) = &rule.threshold else {
                return Err(invalid(rule, "one_of rule without a set threshold"));
            };
            let text = value
                .as_text()
                .ok_or_else(|| invalid(rule, format!("'{value}' is not categorical")))?;
            if allowed.iter().any(|candidate| candidate == text) {
                Ok(1.0)
            } else {
                Ok(clamp01(rule.penalty_floor))
            }
        }
    }
}
