//! In-memory store backed by a snapshot of points, activities and attendance.
//!
//! Used by `recommend --fixture` and by tests. Tests can make individual
//! queries fail to exercise error propagation.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::models::{
    ActivityRecord, AttendanceRecord, AttendanceSummary, NegativeActivityGroup, PeerActivityGroup,
    PeerCandidate, PointsSummary,
};
use crate::store::{RecommendationStore, StoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Query {
    NegativeActivities,
    PeerActivities,
    OwnPositiveLabels,
    PeerCandidates,
    TotalPoints,
    Attendance,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub points: Vec<PointsSummary>,
    #[serde(default)]
    pub activities: Vec<ActivityRecord>,
    #[serde(default)]
    pub attendance: Vec<AttendanceRecord>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    points: BTreeMap<i64, PointsSummary>,
    activities: Vec<ActivityRecord>,
    attendance: BTreeMap<(i64, i64, NaiveDate), AttendanceRecord>,
    failing: HashSet<Query>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let mut store = Self::new();
        for summary in snapshot.points {
            store.upsert_points(PointsSummary::from_parts(
                summary.student_id,
                summary.base_points,
                summary.bonus_points,
                summary.deduction_points,
            ));
        }
        for record in snapshot.activities {
            store.record_activity(record);
        }
        for record in snapshot.attendance {
            store.upsert_attendance(record);
        }
        store
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read fixture: {}", path.display()))?;
        let snapshot: Snapshot = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse fixture: {}", path.display()))?;
        Ok(Self::from_snapshot(snapshot))
    }

    pub fn upsert_points(&mut self, summary: PointsSummary) {
        self.points.insert(summary.student_id, summary);
    }

    pub fn record_activity(&mut self, record: ActivityRecord) {
        self.activities.push(record);
    }

    /// Replaces any record with the same student, class and date.
    pub fn upsert_attendance(&mut self, record: AttendanceRecord) {
        self.attendance
            .insert((record.student_id, record.class_id, record.date), record);
    }

    #[cfg(test)]
    pub fn fail_on(mut self, query: Query) -> Self {
        self.failing.insert(query);
        self
    }

    fn check(&self, query: Query) -> StoreResult<()> {
        if self.failing.contains(&query) {
            return Err(StoreError::Unavailable(format!("{query:?} query failed")));
        }
        Ok(())
    }
}

#[async_trait]
impl RecommendationStore for MemoryStore {
    async fn find_negative_activities(
        &self,
        student_id: i64,
        since: DateTime<Utc>,
    ) -> StoreResult<Vec<NegativeActivityGroup>> {
        self.check(Query::NegativeActivities)?;

        let mut groups: BTreeMap<&str, (i64, i64)> = BTreeMap::new();
        for record in self.activities.iter().filter(|r| {
            r.student_id == student_id && r.points < 0 && r.occurred_at >= since
        }) {
            let entry = groups.entry(record.activity.as_str()).or_insert((0, 0));
            entry.0 += 1;
            entry.1 += i64::from(record.points);
        }

        Ok(groups
            .into_iter()
            .map(|(activity, (count, total_points))| NegativeActivityGroup {
                activity: activity.to_string(),
                count,
                total_points,
            })
            .collect())
    }

    async fn find_positive_activities_for_students(
        &self,
        student_ids: &[i64],
        since: DateTime<Utc>,
    ) -> StoreResult<Vec<PeerActivityGroup>> {
        self.check(Query::PeerActivities)?;

        let mut groups: BTreeMap<&str, (i64, i64, BTreeSet<i64>)> = BTreeMap::new();
        for record in self.activities.iter().filter(|r| {
            student_ids.contains(&r.student_id) && r.points > 0 && r.occurred_at >= since
        }) {
            let entry = groups
                .entry(record.activity.as_str())
                .or_insert_with(|| (0, 0, BTreeSet::new()));
            entry.0 += 1;
            entry.1 += i64::from(record.points);
            entry.2.insert(record.student_id);
        }

        Ok(groups
            .into_iter()
            .map(|(activity, (count, sum, students))| PeerActivityGroup {
                activity: activity.to_string(),
                avg_points: sum as f64 / count as f64,
                count,
                student_count: students.len() as i64,
            })
            .collect())
    }

    async fn find_own_positive_activity_labels(
        &self,
        student_id: i64,
    ) -> StoreResult<BTreeSet<String>> {
        self.check(Query::OwnPositiveLabels)?;

        Ok(self
            .activities
            .iter()
            .filter(|r| r.student_id == student_id && r.points > 0)
            .map(|r| r.activity.clone())
            .collect())
    }

    async fn find_students_with_points_at_least(
        &self,
        threshold: i64,
        excluding: i64,
    ) -> StoreResult<Vec<PeerCandidate>> {
        self.check(Query::PeerCandidates)?;

        let mut candidates: Vec<PeerCandidate> = self
            .points
            .values()
            .filter(|p| p.student_id != excluding && p.total_points >= threshold)
            .map(|p| PeerCandidate {
                student_id: p.student_id,
                total_points: p.total_points,
            })
            .collect();
        candidates.sort_by(|a, b| {
            b.total_points
                .cmp(&a.total_points)
                .then(a.student_id.cmp(&b.student_id))
        });
        Ok(candidates)
    }

    async fn get_total_points(&self, student_id: i64) -> StoreResult<Option<i64>> {
        self.check(Query::TotalPoints)?;
        Ok(self.points.get(&student_id).map(|p| p.total_points))
    }

    async fn attendance_summary(
        &self,
        student_id: i64,
        since: NaiveDate,
    ) -> StoreResult<AttendanceSummary> {
        self.check(Query::Attendance)?;

        let mut summary = AttendanceSummary::default();
        for record in self
            .attendance
            .values()
            .filter(|r| r.student_id == student_id && r.date >= since)
        {
            summary.add(record.status, 1);
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AttendanceStatus;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 31, 12, 0, 0).unwrap()
    }

    fn activity(student_id: i64, label: &str, points: i32, days_ago: i64) -> ActivityRecord {
        ActivityRecord {
            student_id,
            activity: label.to_string(),
            points,
            occurred_at: now() - Duration::days(days_ago),
        }
    }

    #[tokio::test]
    async fn negative_groups_respect_window_and_sign() {
        let mut store = MemoryStore::new();
        store.record_activity(activity(1, "Late for class", -2, 3));
        store.record_activity(activity(1, "Late for class", -2, 5));
        store.record_activity(activity(1, "Late for class", -2, 120));
        store.record_activity(activity(1, "Active participation", 3, 2));
        store.record_activity(activity(2, "Late for class", -2, 2));

        let groups = store
            .find_negative_activities(1, now() - Duration::days(90))
            .await
            .unwrap();
        assert_eq!(
            groups,
            vec![NegativeActivityGroup {
                activity: "Late for class".to_string(),
                count: 2,
                total_points: -4,
            }]
        );
    }

    #[tokio::test]
    async fn peer_groups_count_distinct_students() {
        let mut store = MemoryStore::new();
        store.record_activity(activity(5, "Extra credit work", 6, 1));
        store.record_activity(activity(5, "Extra credit work", 10, 2));
        store.record_activity(activity(6, "Extra credit work", 8, 2));
        store.record_activity(activity(7, "Extra credit work", 8, 2));

        let groups = store
            .find_positive_activities_for_students(&[5, 6], now() - Duration::days(90))
            .await
            .unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].count, 3);
        assert_eq!(groups[0].student_count, 2);
        assert_eq!(groups[0].avg_points, 8.0);
    }

    #[tokio::test]
    async fn candidates_ordered_by_points_then_id() {
        let mut store = MemoryStore::new();
        store.upsert_points(PointsSummary::from_parts(3, 80, 10, 0));
        store.upsert_points(PointsSummary::from_parts(1, 80, 10, 0));
        store.upsert_points(PointsSummary::from_parts(2, 90, 5, 0));
        store.upsert_points(PointsSummary::from_parts(4, 50, 0, 0));

        let candidates = store.find_students_with_points_at_least(60, 3).await.unwrap();
        let ids: Vec<i64> = candidates.iter().map(|c| c.student_id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[tokio::test]
    async fn attendance_upsert_keeps_one_record_per_day() {
        let day = NaiveDate::from_ymd_opt(2026, 3, 30).unwrap();
        let mut store = MemoryStore::new();
        store.upsert_attendance(AttendanceRecord {
            student_id: 1,
            class_id: 10,
            date: day,
            status: AttendanceStatus::Absent,
        });
        store.upsert_attendance(AttendanceRecord {
            student_id: 1,
            class_id: 10,
            date: day,
            status: AttendanceStatus::Late,
        });

        let summary = store
            .attendance_summary(1, day - Duration::days(7))
            .await
            .unwrap();
        assert_eq!(summary, AttendanceSummary { present: 0, late: 1, absent: 0 });
    }

    #[tokio::test]
    async fn configured_query_fails() {
        let store = MemoryStore::new().fail_on(Query::TotalPoints);
        let err = store.get_total_points(1).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[test]
    fn snapshot_parses_from_json() {
        let json = r#"{
            "points": [{"student_id": 1, "base_points": 70, "bonus_points": 10,
                        "deduction_points": -5, "total_points": 75}],
            "activities": [{"student_id": 1, "activity": "Late for class", "points": -2,
                            "occurred_at": "2026-03-20T08:00:00Z"}],
            "attendance": [{"student_id": 1, "class_id": 2, "date": "2026-03-20",
                            "status": "late"}]
        }"#;
        let snapshot: Snapshot = serde_json::from_str(json).unwrap();
        let store = MemoryStore::from_snapshot(snapshot);
        assert_eq!(store.activities.len(), 1);
        assert_eq!(store.points[&1].total_points, 75);
        assert_eq!(store.attendance.len(), 1);
    }

    #[tokio::test]
    async fn sample_fixture_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/sample_snapshot.json");
        let store = MemoryStore::load(&path).unwrap();

        assert_eq!(store.get_total_points(3).await.unwrap(), Some(72));
        let labels = store.find_own_positive_activity_labels(3).await.unwrap();
        assert!(labels.contains("Active participation"));
    }
}
