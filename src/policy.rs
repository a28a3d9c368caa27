//! Content tables that turn activity labels into advice.
//!
//! The built-in tables cover the labels teachers log most often. A
//! `[policy]` section in the config file replaces them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const DEFAULT_SEVERITY: u8 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorGuidance {
    pub severity: u8,
    #[serde(default)]
    pub tips: Vec<String>,
    #[serde(default)]
    pub replacements: Vec<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorPolicy {
    pub default_severity: u8,
    pub default_tips: Vec<String>,
    pub behaviors: BTreeMap<String, BehaviorGuidance>,
    pub positive_tips: BTreeMap<String, String>,
}

impl BehaviorPolicy {
    pub fn severity(&self, label: &str) -> u8 {
        self.behaviors
            .get(label)
            .map(|guidance| guidance.severity)
            .unwrap_or(self.default_severity)
            .clamp(1, 5)
    }

    pub fn tips(&self, label: &str) -> Vec<String> {
        match self.behaviors.get(label) {
            Some(guidance) if !guidance.tips.is_empty() => guidance.tips.clone(),
            _ => self.default_tips.clone(),
        }
    }

    pub fn replacements(&self, label: &str) -> Vec<String> {
        self.behaviors
            .get(label)
            .map(|guidance| guidance.replacements.clone())
            .unwrap_or_default()
    }

    pub fn message(&self, label: &str) -> Option<String> {
        self.behaviors.get(label).and_then(|guidance| guidance.message.clone())
    }

    pub fn positive_tip(&self, label: &str) -> String {
        self.positive_tips.get(label).cloned().unwrap_or_else(|| {
            format!(
                "Try engaging in \"{label}\" to earn more points and follow what top students are doing."
            )
        })
    }
}

impl Default for BehaviorPolicy {
    fn default() -> Self {
        let behaviors = [
            guidance(
                "Late for class",
                2,
                &["Set multiple alarms", "Pack your bag the night before"],
                &["Perfect attendance"],
                "You are frequently late. Try setting alarms or preparing the night before.",
            ),
            guidance(
                "Incomplete homework",
                3,
                &["Use a planner", "Work in 25-min focus blocks"],
                &["Extra credit work"],
                "You often submit incomplete homework. Manage your time better and ask for help when needed.",
            ),
            guidance(
                "Disruptive behavior",
                3,
                &["Practice active listening", "Raise hand before speaking"],
                &["Active participation"],
                "You're being disruptive in class. Focus on listening actively and participating respectfully.",
            ),
            guidance(
                "Unauthorized device use",
                2,
                &["Use app blockers during class", "Keep phone in bag"],
                &["Tech-free learning sessions"],
                "Frequent device misuse observed. Keep phones away during class to stay focused and avoid penalties.",
            ),
            guidance(
                "Dress code violation",
                2,
                &[],
                &[],
                "You've violated the dress code multiple times. Please follow the college rules to avoid disciplinary action.",
            ),
            guidance(
                "Fighting",
                5,
                &[],
                &[],
                "Violence is not tolerated. Seek help from a teacher or counselor immediately.",
            ),
            guidance(
                "Rude with teacher",
                4,
                &[],
                &[],
                "Disrespecting teachers is serious. Practice respectful communication and ask questions politely.",
            ),
            (
                "Fail in internal exams".to_string(),
                BehaviorGuidance {
                    severity: 4,
                    tips: Vec::new(),
                    replacements: Vec::new(),
                    message: None,
                },
            ),
        ]
        .into_iter()
        .collect();

        let positive_tips = [
            ("Active participation", "Get involved in class through active participation to stand out academically."),
            ("Extra credit work", "Work on extra credit tasks to gain more points and stand out like top students."),
            ("Helping classmates", "Support your classmates to improve your learning and earn valuable points."),
            ("Perfect attendance", "Maintain perfect attendance to build a strong reputation and gain points."),
            ("Outstanding achievement", "Achieve excellence in academics to gain recognition and top scores."),
            ("Community service", "Participate in community service to contribute and boost your profile."),
            ("Sports achievement", "Engage in sports activities to enhance your skills and earn points."),
            (
                "Outstanding sports achievement",
                "Excel in sports to gain recognition and follow in the footsteps of top performers.",
            ),
        ]
        .into_iter()
        .map(|(label, tip)| (label.to_string(), tip.to_string()))
        .collect();

        Self {
            default_severity: DEFAULT_SEVERITY,
            default_tips: vec!["Consult with your teacher".to_string()],
            behaviors,
            positive_tips,
        }
    }
}

fn guidance(
    label: &str,
    severity: u8,
    tips: &[&str],
    replacements: &[&str],
    message: &str,
) -> (String, BehaviorGuidance) {
    (
        label.to_string(),
        BehaviorGuidance {
            severity,
            tips: tips.iter().map(|tip| tip.to_string()).collect(),
            replacements: replacements.iter().map(|r| r.to_string()).collect(),
            message: Some(message.to_string()),
        },
    )
}
