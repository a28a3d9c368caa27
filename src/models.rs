use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub student_id: i64,
    pub activity: String,
    pub points: i32,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Late,
    Absent,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Late => "late",
            AttendanceStatus::Absent => "absent",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "present" => Some(AttendanceStatus::Present),
            "late" => Some(AttendanceStatus::Late),
            "absent" => Some(AttendanceStatus::Absent),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub student_id: i64,
    pub class_id: i64,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsSummary {
    pub student_id: i64,
    pub base_points: i64,
    pub bonus_points: i64,
    pub deduction_points: i64,
    pub total_points: i64,
}

impl PointsSummary {
    /// Builds a summary whose total always equals base + bonus + deduction.
    /// Deductions are stored as a non-positive number whatever sign is passed.
    pub fn from_parts(student_id: i64, base_points: i64, bonus_points: i64, deduction: i64) -> Self {
        let deduction_points = -deduction.abs();
        Self {
            student_id,
            base_points,
            bonus_points,
            deduction_points,
            total_points: base_points + bonus_points + deduction_points,
        }
    }
}

/// Negative activities of one student grouped by label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegativeActivityGroup {
    pub activity: String,
    pub count: i64,
    pub total_points: i64,
}

/// Positive activities of a peer cohort grouped by label.
#[derive(Debug, Clone, PartialEq)]
pub struct PeerActivityGroup {
    pub activity: String,
    pub avg_points: f64,
    pub count: i64,
    pub student_count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerCandidate {
    pub student_id: i64,
    pub total_points: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AttendanceSummary {
    pub present: i64,
    pub late: i64,
    pub absent: i64,
}

impl AttendanceSummary {
    pub fn total(&self) -> i64 {
        self.present + self.late + self.absent
    }

    pub fn add(&mut self, status: AttendanceStatus, count: i64) {
        match status {
            AttendanceStatus::Present => self.present += count,
            AttendanceStatus::Late => self.late += count,
            AttendanceStatus::Absent => self.absent += count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorCorrection {
    pub issue: String,
    pub occurrence_count: i64,
    pub severity: u8,
    pub improvement_tips: Vec<String>,
    pub suggested_replacements: Vec<String>,
    pub specific_recommendation: Option<String>,
    pub priority_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositiveAction {
    pub action: String,
    pub average_points: f64,
    pub adoption_rate: String,
    pub implementation_tips: Vec<String>,
    pub priority_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Recommendation {
    #[serde(rename = "BEHAVIOR_CORRECTION")]
    BehaviorCorrection(BehaviorCorrection),
    #[serde(rename = "POSITIVE_ACTION")]
    PositiveAction(PositiveAction),
}

impl Recommendation {
    pub fn priority_score(&self) -> f64 {
        match self {
            Recommendation::BehaviorCorrection(item) => item.priority_score,
            Recommendation::PositiveAction(item) => item.priority_score,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Recommendation::BehaviorCorrection(item) => &item.issue,
            Recommendation::PositiveAction(item) => &item.action,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationSet {
    pub behavior_improvements: Vec<BehaviorCorrection>,
    pub positive_action_opportunities: Vec<PositiveAction>,
    pub combined_priority_list: Vec<Recommendation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn points_total_includes_deductions_as_negative() {
        let summary = PointsSummary::from_parts(7, 70, 15, 12);
        assert_eq!(summary.deduction_points, -12);
        assert_eq!(summary.total_points, 73);

        let already_negative = PointsSummary::from_parts(7, 70, 15, -12);
        assert_eq!(already_negative, summary);
    }

    #[test]
    fn recommendations_serialize_with_type_tag() {
        let item = Recommendation::PositiveAction(PositiveAction {
            action: "Extra credit work".to_string(),
            average_points: 8.0,
            adoption_rate: "50% of top students".to_string(),
            implementation_tips: vec!["Do it".to_string()],
            priority_score: 16.0,
        });

        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["type"], "POSITIVE_ACTION");
        assert_eq!(value["averagePoints"], 8.0);
        assert_eq!(value["adoptionRate"], "50% of top students");
    }

    #[test]
    fn missing_specific_recommendation_serializes_as_null() {
        let item = BehaviorCorrection {
            issue: "Gum chewing".to_string(),
            occurrence_count: 3,
            severity: 1,
            improvement_tips: vec![],
            suggested_replacements: vec![],
            specific_recommendation: None,
            priority_score: 3.0,
        };

        let value = serde_json::to_value(&item).unwrap();
        assert!(value["specificRecommendation"].is_null());
        assert_eq!(value["occurrenceCount"], 3);
    }

    #[test]
    fn attendance_status_parses_lowercase_labels() {
        assert_eq!(AttendanceStatus::parse("late"), Some(AttendanceStatus::Late));
        assert_eq!(AttendanceStatus::parse("tardy"), None);
        assert_eq!(AttendanceStatus::Absent.as_str(), "absent");
    }
}
