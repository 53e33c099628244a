//! Threshold-based moderation decisions.

use std::collections::HashMap;

use quadmart_core::config::moderation::ModerationConfig;
use quadmart_entity::moderation::category::ModerationCategory;
use quadmart_entity::moderation::status::ModerationDecision;

/// Per-category SAFE and UNSAFE score cutoffs.
///
/// A score at/above UNSAFE auto-rejects; strictly above SAFE (without any
/// UNSAFE trigger) requires manual review; below SAFE everywhere is clean.
/// Config validation guarantees UNSAFE >= SAFE per category, so a single
/// category can never trigger both outcomes.
#[derive(Debug, Clone)]
pub struct DecisionThresholds {
    unsafe_thresholds: HashMap<ModerationCategory, f64>,
    safe_thresholds: HashMap<ModerationCategory, f64>,
}

impl DecisionThresholds {
    /// Build thresholds from configuration, dropping unknown category keys.
    pub fn from_config(config: &ModerationConfig) -> Self {
        Self {
            unsafe_thresholds: parse_threshold_map(&config.unsafe_thresholds),
            safe_thresholds: parse_threshold_map(&config.safe_thresholds),
        }
    }
}

fn parse_threshold_map(raw: &HashMap<String, f64>) -> HashMap<ModerationCategory, f64> {
    raw.iter()
        .filter_map(|(key, value)| key.parse::<ModerationCategory>().ok().map(|c| (c, *value)))
        .collect()
}

/// Outcome of the decision engine for one score vector.
#[derive(Debug, Clone)]
pub struct DecisionOutcome {
    /// The automated decision.
    pub decision: ModerationDecision,
    /// Deduplicated rejection reason codes, non-empty iff auto-rejected.
    pub reasons: Vec<String>,
}

/// Map a score vector to a decision. State-free.
///
/// Precedence is fixed: reject > review > approve. Categories are walked
/// in a stable order so the reason set is deterministic and free of
/// duplicates.
pub fn decide(
    scores: &HashMap<ModerationCategory, f64>,
    thresholds: &DecisionThresholds,
) -> DecisionOutcome {
    let mut reasons = Vec::new();
    let mut needs_review = false;

    for category in ModerationCategory::ALL {
        let Some(&score) = scores.get(&category) else {
            continue;
        };
        if let Some(&cutoff) = thresholds.unsafe_thresholds.get(&category) {
            if score >= cutoff {
                reasons.push(category.reason_code().to_string());
                continue;
            }
        }
        if let Some(&cutoff) = thresholds.safe_thresholds.get(&category) {
            if score > cutoff {
                needs_review = true;
            }
        }
    }

    let decision = if !reasons.is_empty() {
        ModerationDecision::AutoRejected
    } else if needs_review {
        ModerationDecision::ManualReviewRequired
    } else {
        ModerationDecision::AutoApproved
    };

    DecisionOutcome { decision, reasons }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds() -> DecisionThresholds {
        DecisionThresholds::from_config(&ModerationConfig::default())
    }

    #[test]
    fn test_unsafe_score_auto_rejects() {
        let scores = HashMap::from([(ModerationCategory::Nudity, 0.9)]);
        let outcome = decide(&scores, &thresholds());
        assert_eq!(outcome.decision, ModerationDecision::AutoRejected);
        assert_eq!(outcome.reasons, vec!["NUDITY".to_string()]);
    }

    #[test]
    fn test_all_below_safe_auto_approves() {
        let scores = HashMap::from([
            (ModerationCategory::Nudity, 0.1),
            (ModerationCategory::Violence, 0.2),
            (ModerationCategory::Weapons, 0.05),
        ]);
        let outcome = decide(&scores, &thresholds());
        assert_eq!(outcome.decision, ModerationDecision::AutoApproved);
        assert!(outcome.reasons.is_empty());
    }

    #[test]
    fn test_between_safe_and_unsafe_needs_review() {
        let scores = HashMap::from([(ModerationCategory::Violence, 0.5)]);
        let outcome = decide(&scores, &thresholds());
        assert_eq!(outcome.decision, ModerationDecision::ManualReviewRequired);
        assert!(outcome.reasons.is_empty());
    }

    #[test]
    fn test_reject_takes_precedence_over_review() {
        let scores = HashMap::from([
            (ModerationCategory::Nudity, 0.9),
            (ModerationCategory::Violence, 0.5),
        ]);
        let outcome = decide(&scores, &thresholds());
        assert_eq!(outcome.decision, ModerationDecision::AutoRejected);
    }

    #[test]
    fn test_multiple_unsafe_categories_all_listed_once() {
        let scores = HashMap::from([
            (ModerationCategory::Nudity, 0.95),
            (ModerationCategory::Weapons, 0.9),
        ]);
        let outcome = decide(&scores, &thresholds());
        assert_eq!(outcome.decision, ModerationDecision::AutoRejected);
        assert_eq!(outcome.reasons.len(), 2);
        assert!(outcome.reasons.contains(&"NUDITY".to_string()));
        assert!(outcome.reasons.contains(&"WEAPONS".to_string()));
    }

    #[test]
    fn test_empty_scores_auto_approve() {
        let outcome = decide(&HashMap::new(), &thresholds());
        assert_eq!(outcome.decision, ModerationDecision::AutoApproved);
    }
}
