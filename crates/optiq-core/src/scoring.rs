//! Modality and overall scoring.
//!
//! The modality scorer aggregates rule sub-scores into one score per
//! modality; the overall scorer combines present modality scores with
//! renormalized weights. Both are pure: same input, same output.

use std::collections::BTreeMap;

use chrono::Utc;

use crate::features::{ContentFeatures, FeatureSet};
use crate::normalize::normalize;
use crate::profile::{ModalityWeights, Profile, Rule};
use crate::types::{Modality, ScoreReport, SubScore};

/// Score a feature set against one modality's rules.
///
/// Returns the per-rule sub-scores and the weighted mean. A modality
/// with zero applicable rules yields `None` so the overall scorer can
/// exclude it instead of treating it as a zero.
///
/// Per-feature failures never abort the modality: an absent feature or
/// an unnormalizable value scores 0.0 and is flagged `missing_feature`.
pub fn score_modality(features: &FeatureSet, rules: &[Rule]) -> (Vec<SubScore>, Option<f64>) {
    if rules.is_empty() {
        return (Vec::new(), None);
    }

    let mut sub_scores = Vec::with_capacity(rules.len());
    let mut weighted_sum = 0.0;
    let mut total_weight = 0.0;

    for rule in rules {
        let sub = match features.get(&rule.feature) {
            Some(value) => match normalize(value, rule) {
                Ok(score) => SubScore {
                    feature: rule.feature.clone(),
                    value: score,
                    missing_feature: false,
                },
                Err(e) => {
                    tracing::warn!(feature = %rule.feature, error = %e, "Downgrading feature to missing");
                    SubScore { feature: rule.feature.clone(), value: 0.0, missing_feature: true }
                }
            },
            None => SubScore { feature: rule.feature.clone(), value: 0.0, missing_feature: true },
        };

        weighted_sum += rule.weight * sub.value;
        total_weight += rule.weight;
        sub_scores.push(sub);
    }

    let modality_score = if total_weight > 0.0 { Some(weighted_sum / total_weight) } else { None };
    (sub_scores, modality_score)
}

/// Combine present modality scores into one overall quality score.
///
/// Weights are renormalized over the modalities present in the map, so
/// a missing modality never silently drags the overall score to zero.
/// Deterministic and idempotent; an empty map scores 0.0.
pub fn score_overall(
    modality_scores: &BTreeMap<Modality, f64>,
    weights: &ModalityWeights,
) -> f64 {
    let mut weighted_sum = 0.0;
    let mut total_weight = 0.0;

    for (modality, score) in modality_scores {
        let weight = weights.weight(*modality);
        weighted_sum += weight * score;
        total_weight += weight;
    }

    if total_weight > 0.0 {
        (weighted_sum / total_weight).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Produce a full score report for one content snapshot.
///
/// A modality contributes only when its track exists in the content and
/// the profile declares rules for it.
pub fn score_content(features: &ContentFeatures, profile: &Profile) -> ScoreReport {
    let mut sub_scores = BTreeMap::new();
    let mut modality_scores = BTreeMap::new();

    for modality in Modality::ALL {
        let rules = &profile.modality_rules(modality).rules;
        let Some(feature_set) = features.modality(modality) else {
            continue;
        };

        let (subs, score) = score_modality(feature_set, rules);
        if let Some(score) = score {
            sub_scores.insert(modality, subs);
            modality_scores.insert(modality, score);
        }
    }

    let overall = score_overall(&modality_scores, &profile.modality_weights);

    ScoreReport { sub_scores, modality_scores, overall, evaluated_at: Utc::now() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureValue;
    use crate::profile::Threshold;

    fn rule(feature: &str, kind: &str, threshold: Threshold, weight: f64) -> Rule {
        Rule {
            feature: feature.to_string(),
            kind: kind.to_string(),
            threshold,
            weight,
            mandatory: false,
            penalty_floor: 0.0,
        }
    }

    fn video_features() -> FeatureSet {
        [
            ("resolution".to_string(), FeatureValue::Dimensions(640, 360)),
            ("fps".to_string(), FeatureValue::Number(30.0)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_modality_score_is_weighted_mean() {
        let rules = vec![
            rule("resolution", "min", Threshold::Dimensions(1280, 720), 3.0), // 0.25
            rule("fps", "target", Threshold::Scalar(30.0), 1.0),              // 1.0
        ];

        let (subs, score) = score_modality(&video_features(), &rules);
        assert_eq!(subs.len(), 2);
        // (3.0 * 0.25 + 1.0 * 1.0) / 4.0 = 0.4375
        assert!((score.unwrap() - 0.4375).abs() < 1e-9);
    }

    #[test]
    fn test_no_rules_yields_none() {
        let (subs, score) = score_modality(&video_features(), &[]);
        assert!(subs.is_empty());
        assert!(score.is_none());
    }

    #[test]
    fn test_absent_feature_flagged_missing_not_fatal() {
        let rules = vec![
            rule("bitrate", "max", Threshold::Scalar(4_000_000.0), 1.0),
            rule("fps", "target", Threshold::Scalar(30.0), 1.0),
        ];

        let (subs, score) = score_modality(&video_features(), &rules);
        assert!(subs[0].missing_feature);
        assert_eq!(subs[0].value, 0.0);
        assert!(!subs[1].missing_feature);
        assert!((score.unwrap() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_value_downgraded_to_missing() {
        let features: FeatureSet =
            [("bitrate".to_string(), FeatureValue::Number(0.0))].into_iter().collect();
        let rules = vec![rule("bitrate", "max", Threshold::Scalar(4_000_000.0), 1.0)];

        let (subs, score) = score_modality(&features, &rules);
        assert!(subs[0].missing_feature);
        assert_eq!(score, Some(0.0));
    }

    #[test]
    fn test_overall_renormalizes_over_present_modalities() {
        let weights = ModalityWeights::default();

        // Only audio present: its 0.6 must pass through undiluted.
        let scores: BTreeMap<Modality, f64> = [(Modality::Audio, 0.6)].into_iter().collect();
        assert!((score_overall(&scores, &weights) - 0.6).abs() < 1e-9);

        // Video 0.4 at weight 0.5, audio 0.8 at weight 0.3:
        // (0.5*0.4 + 0.3*0.8) / 0.8 = 0.55
        let scores: BTreeMap<Modality, f64> =
            [(Modality::Video, 0.4), (Modality::Audio, 0.8)].into_iter().collect();
        assert!((score_overall(&scores, &weights) - 0.55).abs() < 1e-9);
    }

    #[test]
    fn test_overall_is_idempotent() {
        let weights = ModalityWeights::default();
        let scores: BTreeMap<Modality, f64> =
            [(Modality::Video, 0.42), (Modality::Seo, 0.9)].into_iter().collect();

        let first = score_overall(&scores, &weights);
        let second = score_overall(&scores, &weights);
        assert_eq!(first, second);
    }

    #[test]
    fn test_overall_empty_is_zero() {
        assert_eq!(score_overall(&BTreeMap::new(), &ModalityWeights::default()), 0.0);
    }

    #[test]
    fn test_score_content_skips_missing_tracks() {
        let profile = Profile::from_yaml(
            r#"
profile_version: "1.0"
name: "Audio only rules"
target_quality: 0.8
video:
  rules:
    - feature: resolution
      kind: min
      threshold: [1280, 720]
audio:
  rules:
    - feature: sample_rate
      kind: min
      threshold: 44100
"#,
        )
        .unwrap();

        // Content has no video track; the video rules must not count.
        let features = ContentFeatures {
            video: None,
            audio: Some(
                [("sample_rate".to_string(), FeatureValue::Number(44_100.0))]
                    .into_iter()
                    .collect(),
            ),
            text: None,
        };

        let report = score_content(&features, &profile);
        assert!(!report.modality_scores.contains_key(&Modality::Video));
        assert_eq!(report.modality_scores.get(&Modality::Audio), Some(&1.0));
        assert!((report.overall - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_report_missing_features_listing() {
        let profile = Profile::from_yaml(
            r#"
profile_version: "1.0"
name: "Test"
target_quality: 0.8
video:
  rules:
    - feature: bitrate
      kind: max
      threshold: "8000k"
"#,
        )
        .unwrap();

        let features = ContentFeatures {
            video: Some(FeatureSet::new()),
            audio: None,
            text: None,
        };

        let report = score_content(&features, &profile);
        let missing = report.missing_features();
        assert_eq!(missing, vec![(Modality::Video, "bitrate")]);
    }
}
