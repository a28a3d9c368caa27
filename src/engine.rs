//! Recommendation aggregation.
//!
//! `RecommendationEngine` runs the behavior and positive-action analyzers for
//! one student concurrently, waits for both, and merges their output into a
//! single ranked list. Either analyzer failing fails the whole request.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::behavior::BehaviorAnalyzer;
use crate::config::{AnalysisConfig, Config};
use crate::error::{AnalysisError, RecommendationError};
use crate::models::{AttendanceSummary, RecommendationSet};
use crate::policy::BehaviorPolicy;
use crate::positive::PositiveActionAnalyzer;
use crate::scoring;
use crate::store::RecommendationStore;
use crate::tier::PerformanceTier;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Header data for a student report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
    pub student_id: i64,
    pub total_points: i64,
    pub tier: PerformanceTier,
    pub attendance: AttendanceSummary,
    pub window_days: i64,
}

pub struct RecommendationEngine {
    store: Arc<dyn RecommendationStore>,
    clock: Arc<dyn Clock>,
    config: AnalysisConfig,
    policy: BehaviorPolicy,
}

impl RecommendationEngine {
    pub fn new(store: Arc<dyn RecommendationStore>, config: &Config) -> Self {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Arc<dyn RecommendationStore>,
        config: &Config,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            clock,
            config: config.analysis.clone(),
            policy: config.policy.clone(),
        }
    }

    #[instrument(skip(self))]
    pub async fn comprehensive_recommendations(
        &self,
        student_id: i64,
    ) -> Result<RecommendationSet, RecommendationError> {
        validate_student_id(student_id)?;

        let now = self.clock.now();
        let behavior = BehaviorAnalyzer::new(self.store.as_ref(), &self.config, &self.policy);
        let positive = PositiveActionAnalyzer::new(self.store.as_ref(), &self.config, &self.policy);

        let (behavior_improvements, positive_action_opportunities) = tokio::try_join!(
            behavior.analyze(student_id, now),
            positive.analyze(student_id, now)
        )
        .map_err(|source| {
            warn!(student_id, error = %source, "recommendation generation failed");
            RecommendationError::GenerationFailed { student_id, source }
        })?;

        let combined_priority_list =
            scoring::rank_combined(&behavior_improvements, &positive_action_opportunities);
        info!(
            student_id,
            corrections = behavior_improvements.len(),
            opportunities = positive_action_opportunities.len(),
            "recommendations generated"
        );

        Ok(RecommendationSet {
            behavior_improvements,
            positive_action_opportunities,
            combined_priority_list,
        })
    }

    pub async fn profile(&self, student_id: i64) -> Result<StudentProfile, RecommendationError> {
        validate_student_id(student_id)?;

        let fail = |source: AnalysisError| RecommendationError::GenerationFailed { student_id, source };
        let since = scoring::cutoff(self.clock.now(), self.config.window_days).date_naive();
        let (total_points, attendance) = tokio::try_join!(
            self.store.get_total_points(student_id),
            self.store.attendance_summary(student_id, since)
        )
        .map_err(|err| fail(err.into()))?;
        let total_points = total_points.ok_or_else(|| fail(AnalysisError::UnknownStudent(student_id)))?;

        Ok(StudentProfile {
            student_id,
            total_points,
            tier: PerformanceTier::classify(total_points),
            attendance,
            window_days: self.config.window_days,
        })
    }
}

pub fn validate_student_id(student_id: i64) -> Result<i64, RecommendationError> {
    if student_id <= 0 {
        return Err(RecommendationError::InvalidInput(format!(
            "{student_id} is not a positive integer"
        )));
    }
    Ok(student_id)
}

pub fn parse_student_id(raw: &str) -> Result<i64, RecommendationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(RecommendationError::InvalidInput("student id is required".to_string()));
    }
    let student_id = trimmed
        .parse::<i64>()
        .map_err(|_| RecommendationError::InvalidInput(format!("'{trimmed}' is not numeric")))?;
    validate_student_id(student_id)
}
