//! Read queries the recommendation engine needs from its collaborators.
//!
//! `db::PgStore` answers them from Postgres; `memory::MemoryStore` answers
//! them from an in-process snapshot.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::error::StoreError;
use crate::models::{AttendanceSummary, NegativeActivityGroup, PeerActivityGroup, PeerCandidate};

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[async_trait]
pub trait RecommendationStore: Send + Sync {
    /// Negative-point activities since `since`, grouped by label. No
    /// frequency filter is applied here.
    async fn find_negative_activities(
        &self,
        student_id: i64,
        since: DateTime<Utc>,
    ) -> StoreResult<Vec<NegativeActivityGroup>>;

    /// Positive-point activities of the given students since `since`,
    /// grouped by label.
    async fn find_positive_activities_for_students(
        &self,
        student_ids: &[i64],
        since: DateTime<Utc>,
    ) -> StoreResult<Vec<PeerActivityGroup>>;

    /// Every label the student has earned positive points for, at any time.
    async fn find_own_positive_activity_labels(&self, student_id: i64)
        -> StoreResult<BTreeSet<String>>;

    /// Students whose total is at least `threshold`, highest first, ties by
    /// ascending id.
    async fn find_students_with_points_at_least(
        &self,
        threshold: i64,
        excluding: i64,
    ) -> StoreResult<Vec<PeerCandidate>>;

    /// `None` when the student has no points record.
    async fn get_total_points(&self, student_id: i64) -> StoreResult<Option<i64>>;

    async fn attendance_summary(
        &self,
        student_id: i64,
        since: NaiveDate,
    ) -> StoreResult<AttendanceSummary>;
}
