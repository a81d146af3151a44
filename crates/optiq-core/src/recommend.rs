//! Recommendation engine: gap between current features and target rules,
//! ranked by estimated overall-score impact.
//!
//! Output is deterministic: identical feature set and profile always
//! produce the same ordered list. Ties in estimated impact keep rule
//! declaration order (stable sort).

use std::cmp::Ordering;

use crate::features::ContentFeatures;
use crate::profile::{Profile, Rule, RuleKind, Threshold};
use crate::scoring::score_modality;
use crate::types::{Modality, Priority, PriorityFilter, Recommendation};

/// Derive prioritized recommendations from the current feature set.
///
/// For every rule whose sub-score is below 1.0, the estimated impact is
/// the rule's share of the overall score times the remaining gap: the
/// maximum possible overall gain if the rule were fully satisfied.
/// Mandatory rules bypass both the priority filter and the impact
/// floor; optional rules below the floor are suppressed entirely.
pub fn recommend(
    features: &ContentFeatures,
    profile: &Profile,
    filter: PriorityFilter,
) -> Vec<Recommendation> {
    let present: Vec<Modality> = Modality::ALL
        .into_iter()
        .filter(|m| {
            features.modality(*m).is_some() && !profile.modality_rules(*m).rules.is_empty()
        })
        .collect();

    let total_modality_weight: f64 =
        present.iter().map(|m| profile.modality_weights.weight(*m)).sum();
    if total_modality_weight <= 0.0 {
        return Vec::new();
    }

    let mut recommendations = Vec::new();

    for modality in present {
        let rules = &profile.modality_rules(modality).rules;
        let Some(feature_set) = features.modality(modality) else {
            continue;
        };

        let modality_share = profile.modality_weights.weight(modality) / total_modality_weight;
        let total_rule_weight: f64 = rules.iter().map(|r| r.weight).sum();

        // Sub-scores come back in rule declaration order.
        let (sub_scores, _) = score_modality(feature_set, rules);

        for (rule, sub) in rules.iter().zip(sub_scores.iter()) {
            if sub.value >= 1.0 {
                continue;
            }

            let rule_share = rule.weight / total_rule_weight;
            let estimated_impact = modality_share * rule_share * (1.0 - sub.value);
            let priority = Priority::from_impact(estimated_impact);

            let included = rule.mandatory
                || (estimated_impact >= profile.impact_floor && filter.accepts(priority));
            if !included {
                continue;
            }

            recommendations.push(Recommendation {
                modality,
                feature: rule.feature.clone(),
                kind: rule.kind.clone(),
                action: suggestion_text(rule),
                priority,
                estimated_impact,
                mandatory: rule.mandatory,
            });
        }
    }

    // Stable sort: equal impacts keep declaration order.
    recommendations.sort_by(|a, b| {
        b.estimated_impact.partial_cmp(&a.estimated_impact).unwrap_or(Ordering::Equal)
    });

    recommendations
}

/// Human-readable suggestion for an unsatisfied rule.
fn suggestion_text(rule: &Rule) -> String {
    match RuleKind::parse(&rule.kind) {
        Some(RuleKind::Min) => {
            format!("Increase {} to at least {}", rule.feature, rule.threshold)
        }
        Some(RuleKind::Max) => {
            format!("Reduce {} to at most {}", rule.feature, rule.threshold)
        }
        Some(RuleKind::Target) => {
            format!("Adjust {} toward {}", rule.feature, rule.threshold)
        }
        Some(RuleKind::OneOf) => match &rule.threshold {
            Threshold::Set(values) => {
                format!("Use a supported {} ({})", rule.feature, values.join(", "))
            }
            _ => format!("Use a supported {}", rule.feature),
        },
        // Unknown kinds are fatal at profile load; scoring already
        // downgraded this rule, so the text is best-effort.
        None => format!("Review configuration for {}", rule.feature),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{FeatureSet, FeatureValue};

    fn text_features(word_count: f64, readability: f64) -> ContentFeatures {
        let text: FeatureSet = [
            ("word_count".to_string(), FeatureValue::Number(word_count)),
            ("readability".to_string(), FeatureValue::Number(readability)),
        ]
        .into_iter()
        .collect();
        ContentFeatures { video: None, audio: None, text: Some(text), }
    }

    fn seo_profile() -> Profile {
        Profile::from_yaml(
            r#"
profile_version: "1.0"
name: "SEO baseline"
target_quality: 0.8
seo:
  rules:
    - feature: word_count
      kind: min
      threshold: 300
    - feature: readability
      kind: min
      threshold: 60
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_satisfied_rules_produce_no_recommendations() {
        let recs = recommend(&text_features(450.0, 80.0), &seo_profile(), PriorityFilter::All);
        assert!(recs.is_empty());
    }

    #[test]
    fn test_ranked_by_impact_descending() {
        // word_count at 150/300 (sub 0.5), readability at 54/60 (sub 0.9).
        let recs = recommend(&text_features(150.0, 54.0), &seo_profile(), PriorityFilter::All);
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].feature, "word_count");
        assert!(recs[0].estimated_impact > recs[1].estimated_impact);
        // Only the SEO track is present, so it carries the full weight:
        // impact = 1.0 * 0.5 * (1 - 0.5) = 0.25
        assert!((recs[0].estimated_impact - 0.25).abs() < 1e-9);
        assert_eq!(recs[0].priority, Priority::High);
    }

    #[test]
    fn test_deterministic_across_repeated_calls() {
        let features = text_features(150.0, 40.0);
        let profile = seo_profile();

        let first = recommend(&features, &profile, PriorityFilter::All);
        let second = recommend(&features, &profile, PriorityFilter::All);
        assert_eq!(first, second);
    }

    #[test]
    fn test_ties_keep_declaration_order() {
        // Both rules equally unsatisfied with equal weight: identical
        // impact, so declaration order must win.
        let profile = Profile::from_yaml(
            r#"
profile_version: "1.0"
name: "Tie"
target_quality: 0.9
seo:
  rules:
    - feature: second_declared
      kind: min
      threshold: 100
    - feature: first_wins
      kind: min
      threshold: 100
"#,
        )
        .unwrap();
        let text: FeatureSet = [
            ("second_declared".to_string(), FeatureValue::Number(50.0)),
            ("first_wins".to_string(), FeatureValue::Number(50.0)),
        ]
        .into_iter()
        .collect();
        let features = ContentFeatures { video: None, audio: None, text: Some(text) };

        let recs = recommend(&features, &profile, PriorityFilter::All);
        assert_eq!(recs[0].feature, "second_declared");
        assert_eq!(recs[1].feature, "first_wins");
    }

    #[test]
    fn test_priority_filter_restricts_output() {
        // readability barely misses: low impact, filtered out by High.
        let features = text_features(150.0, 59.9);
        let recs = recommend(&features, &seo_profile(), PriorityFilter::High);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].feature, "word_count");
    }

    #[test]
    fn test_mandatory_bypasses_filter_and_floor() {
        let profile = Profile::from_yaml(
            r#"
profile_version: "1.0"
name: "Mandatory"
target_quality: 0.9
impact_floor: 0.05
seo:
  rules:
    - feature: word_count
      kind: min
      threshold: 300
      weight: 50.0
    - feature: readability
      kind: min
      threshold: 60
      mandatory: true
"#,
        )
        .unwrap();

        // readability is a sliver of the weight, far below the floor,
        // but mandatory rules always surface.
        let features = text_features(150.0, 30.0);
        let recs = recommend(&features, &profile, PriorityFilter::High);
        assert!(recs.iter().any(|r| r.feature == "readability" && r.mandatory));
    }

    #[test]
    fn test_impact_floor_suppresses_noise() {
        let profile = Profile::from_yaml(
            r#"
profile_version: "1.0"
name: "Floor"
target_quality: 0.9
impact_floor: 0.3
seo:
  rules:
    - feature: word_count
      kind: min
      threshold: 300
    - feature: readability
      kind: min
      threshold: 60
"#,
        )
        .unwrap();

        // word_count sub 0.5 -> impact 0.25, below the 0.3 floor.
        let recs = recommend(&text_features(150.0, 54.0), &profile, PriorityFilter::All);
        assert!(recs.is_empty());
    }

    #[test]
    fn test_suggestion_text_per_kind() {
        let profile = Profile::from_yaml(
            r#"
profile_version: "1.0"
name: "Video"
target_quality: 0.9
video:
  rules:
    - feature: resolution
      kind: min
      threshold: [1280, 720]
    - feature: bitrate
      kind: max
      threshold: "8000k"
    - feature: codec
      kind: one_of
      threshold: ["h264", "hevc"]
"#,
        )
        .unwrap();
        let video: FeatureSet = [
            ("resolution".to_string(), FeatureValue::Dimensions(640, 360)),
            ("bitrate".to_string(), FeatureValue::Number(16_000_000.0)),
            ("codec".to_string(), FeatureValue::Text("vp8".to_string())),
        ]
        .into_iter()
        .collect();
        let features = ContentFeatures { video: Some(video), audio: None, text: None };

        let recs = recommend(&features, &profile, PriorityFilter::All);
        let actions: Vec<&str> = recs.iter().map(|r| r.action.as_str()).collect();
        assert!(actions.contains(&"Increase resolution to at least 1280x720"));
        assert!(actions.contains(&"Reduce bitrate to at most 8000000"));
        assert!(actions.contains(&"Use a supported codec (h264, hevc)"));
    }
}
