use std::fmt::Write;

use crate::engine::StudentProfile;
use crate::models::{Recommendation, RecommendationSet};

pub fn build_report(profile: &StudentProfile, set: &RecommendationSet) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Student Recommendations");
    let _ = writeln!(
        output,
        "Generated for student {} ({} points, tier {})",
        profile.student_id,
        profile.total_points,
        profile.tier.label()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Attendance (last {} days)", profile.window_days);

    let attendance = &profile.attendance;
    if attendance.total() == 0 {
        let _ = writeln!(output, "No attendance recorded for this window.");
    } else {
        let _ = writeln!(
            output,
            "- present {}, late {}, absent {}",
            attendance.present, attendance.late, attendance.absent
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Behavior Improvements");

    if set.behavior_improvements.is_empty() {
        let _ = writeln!(output, "No recurring issues in this window.");
    } else {
        for item in set.behavior_improvements.iter() {
            let _ = writeln!(
                output,
                "- {}: {} times (severity {}, priority {:.1})",
                item.issue, item.occurrence_count, item.severity, item.priority_score
            );
            if let Some(message) = &item.specific_recommendation {
                let _ = writeln!(output, "  - {message}");
            }
            for tip in item.improvement_tips.iter() {
                let _ = writeln!(output, "  - Tip: {tip}");
            }
            if !item.suggested_replacements.is_empty() {
                let _ = writeln!(output, "  - Try instead: {}", item.suggested_replacements.join(", "));
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Positive Opportunities");

    if set.positive_action_opportunities.is_empty() {
        let _ = writeln!(output, "No new actions to suggest from peers.");
    } else {
        for item in set.positive_action_opportunities.iter() {
            let _ = writeln!(
                output,
                "- {}: avg {:.1} points, {} (priority {:.1})",
                item.action, item.average_points, item.adoption_rate, item.priority_score
            );
            for tip in item.implementation_tips.iter() {
                let _ = writeln!(output, "  - {tip}");
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Priority List");

    if set.combined_priority_list.is_empty() {
        let _ = writeln!(output, "Nothing to prioritize.");
    } else {
        for (rank, item) in set.combined_priority_list.iter().enumerate() {
            let kind = match item {
                Recommendation::BehaviorCorrection(_) => "fix",
                Recommendation::PositiveAction(_) => "adopt",
            };
            let _ = writeln!(
                output,
                "{}. [{}] {} ({:.1})",
                rank + 1,
                kind,
                item.label(),
                item.priority_score()
            );
        }
    }

    output
}
