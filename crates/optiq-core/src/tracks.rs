//! Dual-track coordination for text content.
//!
//! SEO and GEO evaluate the same text features under their own rule
//! sets. Each track runs the full executor against a single-track view
//! of the profile, so the two runs cannot see (or perturb) each
//! other's rules. The tracks are then combined into one weighted
//! score with the per-track outcomes preserved.

use crate::features::{ContentFeatures, FeatureSet};
use crate::optimize::optimize;
use crate::profile::Profile;
use crate::recommend::recommend;
use crate::types::{DualTrackOutcome, Modality, PriorityFilter, Recommendation};

/// Optimize text content for both the SEO and GEO tracks.
pub fn optimize_dual_track(text: FeatureSet, profile: &Profile) -> DualTrackOutcome {
    let seo_profile = profile.single_track(Modality::Seo);
    let geo_profile = profile.single_track(Modality::Geo);

    let content = ContentFeatures { video: None, audio: None, text: Some(text) };

    let seo = optimize(content.clone(), &seo_profile);
    let geo = optimize(content, &geo_profile);

    let combined_score = combine_scores(seo.final_score(), geo.final_score(), profile);

    let mut recommendations = remaining(&seo, &seo_profile);
    recommendations.extend(remaining(&geo, &geo_profile));
    recommendations.sort_by(|a, b| {
        b.estimated_impact
            .partial_cmp(&a.estimated_impact)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    tracing::info!(
        seo_score = seo.final_score(),
        geo_score = geo.final_score(),
        combined_score,
        "Dual-track run complete"
    );

    DualTrackOutcome { seo, geo, combined_score, recommendations }
}

/// Track-weighted mean of the two final overall scores.
fn combine_scores(seo: f64, geo: f64, profile: &Profile) -> f64 {
    let weights = &profile.track_weights;
    let total = weights.seo + weights.geo;
    if total <= 0.0 {
        return 0.0;
    }
    (weights.seo * seo + weights.geo * geo) / total
}

/// Recommendations still open against a track's final feature state.
fn remaining(
    outcome: &crate::types::OptimizationOutcome,
    track_profile: &Profile,
) -> Vec<Recommendation> {
    recommend(&outcome.features, track_profile, PriorityFilter::All)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureValue;
    use crate::types::TerminationReason;

    fn text_features(word_count: f64, citations: f64) -> FeatureSet {
        [
            ("word_count".to_string(), FeatureValue::Number(word_count)),
            ("citation_count".to_string(), FeatureValue::Number(citations)),
        ]
        .into_iter()
        .collect()
    }

    fn dual_profile() -> Profile {
        Profile::from_yaml(
            r#"
profile_version: "1.0"
name: "Content tracks"
target_quality: 1.0
track_weights:
  seo: 0.5
  geo: 0.5
seo:
  rules:
    - feature: word_count
      kind: min
      threshold: 300
geo:
  rules:
    - feature: citation_count
      kind: min
      threshold: 5
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_tracks_run_independently() {
        let profile = dual_profile();
        let outcome = optimize_dual_track(text_features(150.0, 1.0), &profile);

        // Each track only ever sees its own rules: the SEO run's reports
        // carry no GEO sub-scores and vice versa.
        for report in &outcome.seo.history {
            assert!(!report.sub_scores.contains_key(&Modality::Geo));
        }
        for report in &outcome.geo.history {
            assert!(!report.sub_scores.contains_key(&Modality::Seo));
        }

        assert_eq!(outcome.seo.termination, TerminationReason::TargetReached);
        assert_eq!(outcome.geo.termination, TerminationReason::TargetReached);
    }

    #[test]
    fn test_combined_is_track_weighted_mean() {
        // Unreachable targets freeze each track at its starting score.
        let profile = Profile::from_yaml(
            r#"
profile_version: "1.0"
name: "Frozen"
target_quality: 1.0
track_weights:
  seo: 0.7
  geo: 0.3
seo:
  rules:
    - feature: word_count
      kind: min
      threshold: 300
  bounds:
    word_count:
      max: 150
geo:
  rules:
    - feature: citation_count
      kind: min
      threshold: 5
  bounds:
    citation_count:
      max: 1
"#,
        )
        .unwrap();

        let outcome = optimize_dual_track(text_features(150.0, 1.0), &profile);

        // word_count pinned at 150/300 = 0.5, citations at 1/5 = 0.2.
        assert!((outcome.seo.final_score() - 0.5).abs() < 1e-9);
        assert!((outcome.geo.final_score() - 0.2).abs() < 1e-9);
        let expected = (0.7 * 0.5 + 0.3 * 0.2) / 1.0;
        assert!((outcome.combined_score - expected).abs() < 1e-9);

        // Both rules are still unsatisfied, so both surface as open
        // recommendations, highest impact first.
        assert_eq!(outcome.recommendations.len(), 2);
        assert!(
            outcome.recommendations[0].estimated_impact
                >= outcome.recommendations[1].estimated_impact
        );
        assert_eq!(outcome.recommendations[0].modality, Modality::Geo);
    }

    #[test]
    fn test_equal_weights_average_track_scores() {
        // SEO frozen at 0.7 and GEO at 0.9 by hard bounds; the default
        // equal weights combine them to 0.8.
        let profile = Profile::from_yaml(
            r#"
profile_version: "1.0"
name: "Averaged"
target_quality: 1.0
seo:
  rules:
    - feature: word_count
      kind: min
      threshold: 300
  bounds:
    word_count:
      max: 210
geo:
  rules:
    - feature: citation_count
      kind: min
      threshold: 10
  bounds:
    citation_count:
      max: 9
"#,
        )
        .unwrap();

        let outcome = optimize_dual_track(text_features(210.0, 9.0), &profile);
        assert!((outcome.seo.final_score() - 0.7).abs() < 1e-9);
        assert!((outcome.geo.final_score() - 0.9).abs() < 1e-9);
        assert!((outcome.combined_score - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_fully_optimized_text_leaves_no_recommendations() {
        let profile = dual_profile();
        let outcome = optimize_dual_track(text_features(100.0, 0.0), &profile);

        assert!((outcome.combined_score - 1.0).abs() < 1e-9);
        assert!(outcome.recommendations.is_empty());

        let seo_text = outcome.seo.features.text.as_ref().unwrap();
        assert_eq!(seo_text.get("word_count"), Some(&FeatureValue::Number(300.0)));
        let geo_text = outcome.geo.features.text.as_ref().unwrap();
        assert_eq!(geo_text.get("citation_count"), Some(&FeatureValue::Number(5.0)));
    }
}
