use std::cmp::Ordering;

use chrono::{DateTime, Duration, Utc};

use crate::models::{BehaviorCorrection, PositiveAction, Recommendation};

pub fn cutoff(now: DateTime<Utc>, window_days: i64) -> DateTime<Utc> {
    now - Duration::days(window_days.max(1))
}

pub fn behavior_priority(occurrence_count: i64, severity: u8) -> f64 {
    (occurrence_count * i64::from(severity)) as f64
}

pub fn positive_priority(average_points: f64, weight: f64) -> f64 {
    average_points * weight
}

/// Ranking key for a peer action: how many points the cohort collects with it.
pub fn peer_action_weight(avg_points: f64, count: i64) -> f64 {
    avg_points * count as f64
}

pub fn adoption_rate(student_count: i64, peer_count: usize) -> String {
    let pct = if peer_count == 0 {
        0.0
    } else {
        (student_count as f64 / peer_count as f64 * 100.0).round()
    };
    format!("{pct:.0}% of top students")
}

/// Merges both lists into one ranked list. The sort is stable, so on equal
/// scores corrections stay ahead of positive actions.
pub fn rank_combined(
    behavior: &[BehaviorCorrection],
    positive: &[PositiveAction],
) -> Vec<Recommendation> {
    let mut combined: Vec<Recommendation> = behavior
        .iter()
        .cloned()
        .map(Recommendation::BehaviorCorrection)
        .chain(positive.iter().cloned().map(Recommendation::PositiveAction))
        .collect();
    combined.sort_by(|a, b| descending(a.priority_score(), b.priority_score()));
    combined
}

pub fn descending(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn correction(issue: &str, score: f64) -> BehaviorCorrection {
        BehaviorCorrection {
            issue: issue.to_string(),
            occurrence_count: 3,
            severity: 2,
            improvement_tips: vec![],
            suggested_replacements: vec![],
            specific_recommendation: None,
            priority_score: score,
        }
    }

    fn positive(action: &str, score: f64) -> PositiveAction {
        PositiveAction {
            action: action.to_string(),
            average_points: score / 2.0,
            adoption_rate: "100% of top students".to_string(),
            implementation_tips: vec![],
            priority_score: score,
        }
    }

    #[test]
    fn cutoff_respects_window() {
        let now = Utc.with_ymd_and_hms(2026, 3, 31, 12, 0, 0).unwrap();
        assert_eq!(cutoff(now, 90), now - Duration::days(90));
        assert_eq!(cutoff(now, 0), now - Duration::days(1));
    }

    #[test]
    fn priorities_follow_weights() {
        assert_eq!(behavior_priority(3, 2), 6.0);
        assert_eq!(positive_priority(8.0, 2.0), 16.0);
        assert_eq!(peer_action_weight(2.5, 4), 10.0);
    }

    #[test]
    fn adoption_rate_rounds_to_whole_percent() {
        assert_eq!(adoption_rate(1, 3), "33% of top students");
        assert_eq!(adoption_rate(2, 3), "67% of top students");
        assert_eq!(adoption_rate(1, 2), "50% of top students");
        assert_eq!(adoption_rate(0, 0), "0% of top students");
    }

    #[test]
    fn combined_list_sorted_with_corrections_first_on_ties() {
        let behavior = vec![correction("Late for class", 6.0), correction("Fighting", 15.0)];
        let positives = vec![positive("Extra credit work", 16.0), positive("Helping classmates", 6.0)];

        let ranked = rank_combined(&behavior, &positives);
        let labels: Vec<&str> = ranked.iter().map(Recommendation::label).collect();
        assert_eq!(
            labels,
            vec!["Extra credit work", "Fighting", "Late for class", "Helping classmates"]
        );
        assert!(ranked
            .windows(2)
            .all(|pair| pair[0].priority_score() >= pair[1].priority_score()));
    }
}
