//! Optimization executor: Scoring → Recommending → Applying.
//!
//! The executor is strictly sequential for one run. Each Applying step
//! produces a fresh feature snapshot, so a score report always refers
//! to the exact features it was computed from. Termination is
//! guaranteed: the run stops at target quality, when no recommendation
//! has positive impact, or at the iteration guard.
//!
//! Adjustment policy: the feature jumps directly to the rule threshold,
//! clipped to any configured hard bound. A clip that lands back on the
//! current value is recorded as skipped, so a rule pinned by a bound
//! cannot spin the loop.

use crate::features::{ContentFeatures, FeatureValue};
use crate::profile::{Bound, Profile, Rule, RuleKind, Threshold};
use crate::recommend::recommend;
use crate::scoring::score_content;
use crate::types::{
    AppliedRecommendation, OptimizationOutcome, PriorityFilter, Recommendation,
    SkippedRecommendation, TerminationReason,
};

/// Run the optimization loop over a content snapshot.
///
/// Always returns a structured outcome; executor-level failures on a
/// single recommendation are recorded as skips, never propagated.
pub fn optimize(features: ContentFeatures, profile: &Profile) -> OptimizationOutcome {
    let mut features = features;
    let mut history = Vec::new();
    let mut applied = Vec::new();
    let mut skipped = Vec::new();

    for iteration in 0..profile.iteration_limit {
        // Scoring
        let report = score_content(&features, profile);
        let overall = report.overall;
        history.push(report);

        // Recommending
        if overall >= profile.target_quality {
            tracing::info!(iteration, overall, "Target quality reached");
            return OptimizationOutcome {
                features,
                history,
                applied,
                skipped,
                termination: TerminationReason::TargetReached,
            };
        }

        let recommendations = recommend(&features, profile, PriorityFilter::All);
        let no_gain = recommendations
            .first()
            .map(|top| top.estimated_impact <= 0.0)
            .unwrap_or(true);
        if no_gain {
            tracing::info!(iteration, overall, "No recommendation with positive impact");
            return OptimizationOutcome {
                features,
                history,
                applied,
                skipped,
                termination: TerminationReason::NoFurtherGain,
            };
        }

        // Applying: the highest-impact recommendation that can actually
        // be computed. Failures fall through to the next candidate.
        let mut progressed = false;
        for recommendation in &recommendations {
            match apply_recommendation(&features, recommendation, profile) {
                Ok(step) => {
                    features = step.features;
                    applied.push(AppliedRecommendation {
                        iteration,
                        recommendation: recommendation.clone(),
                        previous: step.previous,
                        applied: step.value,
                        clamped: step.clamped,
                    });
                    progressed = true;
                    break;
                }
                Err(reason) => {
                    tracing::warn!(
                        modality = %recommendation.modality,
                        feature = %recommendation.feature,
                        %reason,
                        "Skipping recommendation"
                    );
                    skipped.push(SkippedRecommendation {
                        iteration,
                        modality: recommendation.modality,
                        feature: recommendation.feature.clone(),
                        reason,
                    });
                }
            }
        }

        if !progressed {
            return OptimizationOutcome {
                features,
                history,
                applied,
                skipped,
                termination: TerminationReason::NoFurtherGain,
            };
        }
    }

    // Iteration guard fired; report the best state achieved.
    history.push(score_content(&features, profile));
    tracing::info!(limit = profile.iteration_limit, "Iteration limit reached");
    OptimizationOutcome {
        features,
        history,
        applied,
        skipped,
        termination: TerminationReason::IterationLimit,
    }
}

struct AppliedStep {
    features: ContentFeatures,
    previous: Option<FeatureValue>,
    value: FeatureValue,
    clamped: bool,
}

/// Adjust the recommendation's feature toward its rule threshold,
/// respecting hard bounds. Errors are skip reasons, not failures.
fn apply_recommendation(
    features: &ContentFeatures,
    recommendation: &Recommendation,
    profile: &Profile,
) -> Result<AppliedStep, String> {
    let modality = recommendation.modality;
    let feature_set = features
        .modality(modality)
        .ok_or_else(|| format!("content has no {modality} track"))?;

    let rule = find_rule(profile, recommendation)
        .ok_or_else(|| "rule no longer present in profile".to_string())?;

    let current = feature_set.get(&recommendation.feature);
    let desired = desired_value(rule, current)?;

    let bound = profile.bound(modality, &recommendation.feature);
    let (value, clamped) = clip_to_bound(desired, bound);

    if clamped {
        tracing::warn!(
            %modality,
            feature = %recommendation.feature,
            value = %value,
            "Bound violation clipped"
        );
    }

    if current == Some(&value) {
        return Err("already at the configured bound".to_string());
    }

    let next_set = feature_set.with(recommendation.feature.clone(), value.clone());
    Ok(AppliedStep {
        features: features.with_modality(modality, next_set),
        previous: current.cloned(),
        value,
        clamped,
    })
}

// A feature can carry several rules; the kind disambiguates which one
// the recommendation came from.
fn find_rule<'a>(profile: &'a Profile, recommendation: &Recommendation) -> Option<&'a Rule> {
    profile
        .modality_rules(recommendation.modality)
        .rules
        .iter()
        .find(|rule| rule.feature == recommendation.feature && rule.kind == recommendation.kind)
}

/// Target value for the adjustment: jump directly to the threshold.
fn desired_value(rule: &Rule, current: Option<&FeatureValue>) -> Result<FeatureValue, String> {
    let kind = RuleKind::parse(&rule.kind).ok_or_else(|| format!("unsupported rule kind '{}'", rule.kind))?;

    match (kind, &rule.threshold) {
        (RuleKind::OneOf, Threshold::Set(allowed)) => {
            // Deterministic pick: the first allowed value.
            let first = allowed.first().ok_or_else(|| "allowed set is empty".to_string())?;
            Ok(FeatureValue::Text(first.clone()))
        }
        (RuleKind::OneOf, _) => Err("one_of rule without a set threshold".to_string()),
        (_, Threshold::Scalar(t)) => Ok(FeatureValue::Number(*t)),
        (_, Threshold::Dimensions(w, h)) => {
            // Min only raises; keep larger current dimensions as-is.
            if kind == RuleKind::Min {
                if let Some(FeatureValue::Dimensions(cw, ch)) = current {
                    if u64::from(*cw) * u64::from(*ch) >= u64::from(*w) * u64::from(*h) {
                        return Err("resolution already meets the floor".to_string());
                    }
                }
            }
            Ok(FeatureValue::Dimensions(*w, *h))
        }
        (_, Threshold::Set(_)) => Err(format!("'{}' rule with a set threshold", rule.kind)),
    }
}

/// Clip a desired value to a configured hard bound. Mismatched bound
/// shapes are ignored; bounds are validated at profile load.
fn clip_to_bound(desired: FeatureValue, bound: Option<&Bound>) -> (FeatureValue, bool) {
    let Some(bound) = bound else {
        return (desired, false);
    };

    match desired {
        FeatureValue::Number(n) => {
            let mut value = n;
            if let Some(Threshold::Scalar(lo)) = bound.min {
                value = value.max(lo);
            }
            if let Some(Threshold::Scalar(hi)) = bound.max {
                value = value.min(hi);
            }
            (FeatureValue::Number(value), value != n)
        }
        FeatureValue::Dimensions(w, h) => {
            let mut width = w;
            let mut height = h;
            if let Some(Threshold::Dimensions(lo_w, lo_h)) = bound.min {
                width = width.max(lo_w);
                height = height.max(lo_h);
            }
            if let Some(Threshold::Dimensions(hi_w, hi_h)) = bound.max {
                width = width.min(hi_w);
                height = height.min(hi_h);
            }
            let clamped = width != w || height != h;
            (FeatureValue::Dimensions(width, height), clamped)
        }
        // Categorical values have no numeric bounds.
        text @ FeatureValue::Text(_) => (text, false),
    }
}
