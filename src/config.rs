//! Configuration file handling.
//!
//! Settings come from an optional TOML file. Every field has a default, so a
//! missing file or a partial one is fine.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::policy::BehaviorPolicy;

pub const DEFAULT_CONFIG_FILE: &str = "recommendations.toml";

pub const ANALYSIS_WINDOW_DAYS: i64 = 90;
pub const MIN_ACTION_FREQUENCY: i64 = 3;
pub const SPECIFIC_RECOMMENDATION_MIN_COUNT: i64 = 3;
pub const PEER_LIMIT: usize = 50;
pub const TOP_ACTIONS_LIMIT: usize = 10;
pub const POSITIVE_ACTION_WEIGHT: f64 = 2.0;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub policy: BehaviorPolicy,
}

/// Thresholds and weights shared by both analyzers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Trailing window, in days, for activity queries.
    pub window_days: i64,

    /// Minimum occurrences before a label is reported, for corrections and
    /// peer actions alike.
    pub min_action_frequency: i64,

    /// Occurrences needed before the long-form message is attached.
    pub specific_recommendation_min_count: i64,

    pub peer_limit: usize,

    pub top_actions_limit: usize,

    /// Multiplier from average peer points to priority score.
    pub positive_action_weight: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            window_days: ANALYSIS_WINDOW_DAYS,
            min_action_frequency: MIN_ACTION_FREQUENCY,
            specific_recommendation_min_count: SPECIFIC_RECOMMENDATION_MIN_COUNT,
            peer_limit: PEER_LIMIT,
            top_actions_limit: TOP_ACTIONS_LIMIT,
            positive_action_weight: POSITIVE_ACTION_WEIGHT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub max_connections: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            max_connections: 5,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Loads the explicit path if given, else the default file if it exists,
    /// else built-in defaults.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        let analysis = &self.analysis;
        anyhow::ensure!(analysis.window_days > 0, "analysis.window_days must be positive");
        anyhow::ensure!(
            analysis.min_action_frequency > 0,
            "analysis.min_action_frequency must be positive"
        );
        anyhow::ensure!(analysis.peer_limit > 0, "analysis.peer_limit must be positive");
        anyhow::ensure!(
            analysis.positive_action_weight.is_finite() && analysis.positive_action_weight > 0.0,
            "analysis.positive_action_weight must be a positive number"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_canonical_thresholds() {
        let config = Config::default();
        assert_eq!(config.analysis.window_days, 90);
        assert_eq!(config.analysis.min_action_frequency, 3);
        assert_eq!(config.analysis.peer_limit, 50);
        assert_eq!(config.analysis.top_actions_limit, 10);
        assert_eq!(config.analysis.positive_action_weight, 2.0);
        assert_eq!(config.server.bind, "127.0.0.1:8080");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[analysis]
min_action_frequency = 2

[policy.behaviors."Skipping assembly"]
severity = 3
tips = ["Check the assembly calendar"]
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.analysis.min_action_frequency, 2);
        assert_eq!(config.analysis.window_days, 90);
        assert_eq!(config.policy.severity("Skipping assembly"), 3);
        assert_eq!(config.policy.default_tips, vec!["Consult with your teacher"]);
    }

    #[test]
    fn example_file_matches_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("recommendations.example.toml");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.analysis, AnalysisConfig::default());
        assert_eq!(config.policy, BehaviorPolicy::default());
    }

    #[test]
    fn rejects_non_positive_window() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[analysis]\nwindow_days = 0").unwrap();

        assert!(Config::load(file.path()).is_err());
    }
}
