use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::models::{BehaviorCorrection, NegativeActivityGroup};
use crate::policy::BehaviorPolicy;
use crate::scoring;
use crate::store::RecommendationStore;

/// Finds recurring negative activities for one student.
pub struct BehaviorAnalyzer<'a> {
    store: &'a dyn RecommendationStore,
    config: &'a AnalysisConfig,
    policy: &'a BehaviorPolicy,
}

impl<'a> BehaviorAnalyzer<'a> {
    pub fn new(
        store: &'a dyn RecommendationStore,
        config: &'a AnalysisConfig,
        policy: &'a BehaviorPolicy,
    ) -> Self {
        Self {
            store,
            config,
            policy,
        }
    }

    pub async fn analyze(
        &self,
        student_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<BehaviorCorrection>, AnalysisError> {
        let since = scoring::cutoff(now, self.config.window_days);
        let groups = self.store.find_negative_activities(student_id, since).await?;
        debug!(student_id, groups = groups.len(), "negative activity groups loaded");

        Ok(build_corrections(groups, self.config, self.policy))
    }
}

/// Drops infrequent labels, orders by count (desc) then summed points (asc),
/// and attaches policy content.
pub fn build_corrections(
    mut groups: Vec<NegativeActivityGroup>,
    config: &AnalysisConfig,
    policy: &BehaviorPolicy,
) -> Vec<BehaviorCorrection> {
    groups.retain(|group| group.count >= config.min_action_frequency);
    groups.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then(a.total_points.cmp(&b.total_points))
            .then_with(|| a.activity.cmp(&b.activity))
    });

    groups
        .into_iter()
        .map(|group| {
            let severity = policy.severity(&group.activity);
            let specific_recommendation = if group.count >= config.specific_recommendation_min_count {
                policy.message(&group.activity)
            } else {
                None
            };

            BehaviorCorrection {
                improvement_tips: policy.tips(&group.activity),
                suggested_replacements: policy.replacements(&group.activity),
                specific_recommendation,
                priority_score: scoring::behavior_priority(group.count, severity),
                occurrence_count: group.count,
                severity,
                issue: group.activity,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn group(activity: &str, count: i64, total_points: i64) -> NegativeActivityGroup {
        NegativeActivityGroup {
            activity: activity.to_string(),
            count,
            total_points,
        }
    }

    #[test]
    fn late_for_class_three_times_scores_six() {
        let corrections = build_corrections(
            vec![group("Late for class", 3, -6)],
            &AnalysisConfig::default(),
            &BehaviorPolicy::default(),
        );

        assert_eq!(
            corrections,
            vec![BehaviorCorrection {
                issue: "Late for class".to_string(),
                occurrence_count: 3,
                severity: 2,
                improvement_tips: vec![
                    "Set multiple alarms".to_string(),
                    "Pack your bag the night before".to_string(),
                ],
                suggested_replacements: vec!["Perfect attendance".to_string()],
                specific_recommendation: Some(
                    "You are frequently late. Try setting alarms or preparing the night before."
                        .to_string()
                ),
                priority_score: 6.0,
            }]
        );
    }

    #[test]
    fn infrequent_labels_are_dropped_even_when_severe() {
        let corrections = build_corrections(
            vec![group("Fighting", 1, -5), group("Late for class", 2, -4)],
            &AnalysisConfig::default(),
            &BehaviorPolicy::default(),
        );
        assert!(corrections.is_empty());
    }

    #[test]
    fn orders_by_count_then_most_negative_total() {
        let corrections = build_corrections(
            vec![
                group("Late for class", 3, -6),
                group("Incomplete homework", 3, -9),
                group("Unauthorized device use", 5, -10),
            ],
            &AnalysisConfig::default(),
            &BehaviorPolicy::default(),
        );

        let issues: Vec<&str> = corrections.iter().map(|c| c.issue.as_str()).collect();
        assert_eq!(
            issues,
            vec!["Unauthorized device use", "Incomplete homework", "Late for class"]
        );
    }

    #[test]
    fn message_needs_secondary_threshold() {
        let config = AnalysisConfig {
            min_action_frequency: 2,
            ..AnalysisConfig::default()
        };
        let corrections = build_corrections(
            vec![group("Fighting", 2, -10)],
            &config,
            &BehaviorPolicy::default(),
        );

        assert_eq!(corrections.len(), 1);
        assert_eq!(corrections[0].specific_recommendation, None);
        assert_eq!(corrections[0].priority_score, 10.0);
    }

    #[test]
    fn unknown_label_uses_defaults() {
        let corrections = build_corrections(
            vec![group("Chewing gum", 4, -4)],
            &AnalysisConfig::default(),
            &BehaviorPolicy::default(),
        );

        let correction = &corrections[0];
        assert_eq!(correction.severity, 1);
        assert_eq!(correction.improvement_tips, vec!["Consult with your teacher"]);
        assert!(correction.suggested_replacements.is_empty());
        assert_eq!(correction.specific_recommendation, None);
        assert_eq!(correction.priority_score, 4.0);
    }
}
