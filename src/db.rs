use std::collections::BTreeSet;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use sqlx::{PgPool, Row};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{
    AttendanceRecord, AttendanceStatus, AttendanceSummary, NegativeActivityGroup,
    PeerActivityGroup, PeerCandidate, PointsSummary,
};
use crate::store::{RecommendationStore, StoreResult};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

async fn upsert_student(pool: &PgPool, full_name: &str, email: &str) -> anyhow::Result<i64> {
    let id: i64 = sqlx::query(
        r#"
        INSERT INTO student_recommendations.students (full_name, email)
        VALUES ($1, $2)
        ON CONFLICT (email) DO UPDATE
        SET full_name = EXCLUDED.full_name
        RETURNING id
        "#,
    )
    .bind(full_name)
    .bind(email)
    .fetch_one(pool)
    .await?
    .get("id");
    Ok(id)
}

pub async fn upsert_points(pool: &PgPool, summary: &PointsSummary) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO student_recommendations.points
        (student_id, base_points, bonus_points, deduction_points, total_points)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (student_id) DO UPDATE
        SET base_points = EXCLUDED.base_points,
            bonus_points = EXCLUDED.bonus_points,
            deduction_points = EXCLUDED.deduction_points,
            total_points = EXCLUDED.total_points,
            updated_at = NOW()
        "#,
    )
    .bind(summary.student_id)
    .bind(summary.base_points)
    .bind(summary.bonus_points)
    .bind(summary.deduction_points)
    .bind(summary.total_points)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn upsert_attendance(pool: &PgPool, record: &AttendanceRecord) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO student_recommendations.attendances (student_id, class_id, date, status)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (student_id, class_id, date) DO UPDATE
        SET status = EXCLUDED.status
        "#,
    )
    .bind(record.student_id)
    .bind(record.class_id)
    .bind(record.date)
    .bind(record.status.as_str())
    .execute(pool)
    .await?;
    Ok(())
}

/// Appends an activity. Returns false when `source_key` was already imported.
async fn insert_activity(
    pool: &PgPool,
    student_id: i64,
    activity: &str,
    points: i32,
    occurred_at: DateTime<Utc>,
    source_key: &str,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO student_recommendations.activities
        (student_id, activity, points, occurred_at, source_key)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(student_id)
    .bind(activity)
    .bind(points)
    .bind(occurred_at)
    .bind(source_key)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let students = vec![
        ("Amara Okafor", "amara.okafor@school.test", (80, 17, 2)),
        ("Ben Castillo", "ben.castillo@school.test", (75, 12, 2)),
        ("Chloe Nguyen", "chloe.nguyen@school.test", (70, 8, 6)),
        ("Dev Raman", "dev.raman@school.test", (60, 2, 14)),
    ];

    let mut ids = Vec::new();
    for (name, email, (base, bonus, deduction)) in students {
        let id = upsert_student(pool, name, email).await?;
        upsert_points(pool, &PointsSummary::from_parts(id, base, bonus, deduction)).await?;
        ids.push(id);
    }

    let activities = vec![
        (0, "Extra credit work", 8, 3),
        (0, "Extra credit work", 9, 10),
        (0, "Helping classmates", 4, 12),
        (0, "Community service", 5, 20),
        (1, "Extra credit work", 7, 5),
        (1, "Active participation", 3, 6),
        (1, "Helping classmates", 4, 15),
        (1, "Helping classmates", 4, 30),
        (1, "Late for class", -2, 40),
        (2, "Active participation", 3, 2),
        (2, "Incomplete homework", -3, 4),
        (2, "Incomplete homework", -3, 11),
        (2, "Incomplete homework", -3, 25),
        (3, "Late for class", -2, 1),
        (3, "Late for class", -2, 6),
        (3, "Late for class", -2, 9),
        (3, "Unauthorized device use", -2, 7),
        (3, "Unauthorized device use", -2, 18),
        (3, "Unauthorized device use", -2, 33),
        (3, "Fighting", -5, 50),
    ];

    let now = Utc::now();
    for (index, (student, activity, points, days_ago)) in activities.into_iter().enumerate() {
        let source_key = format!("seed-{:03}", index + 1);
        insert_activity(
            pool,
            ids[student],
            activity,
            points,
            now - Duration::days(days_ago),
            &source_key,
        )
        .await?;
    }

    let today = now.date_naive();
    let statuses = [
        (3, AttendanceStatus::Late, 1),
        (3, AttendanceStatus::Absent, 2),
        (3, AttendanceStatus::Present, 3),
        (2, AttendanceStatus::Present, 1),
        (2, AttendanceStatus::Present, 2),
        (0, AttendanceStatus::Present, 1),
    ];
    for (student, status, days_ago) in statuses {
        upsert_attendance(
            pool,
            &AttendanceRecord {
                student_id: ids[student],
                class_id: 1,
                date: today - Duration::days(days_ago),
                status,
            },
        )
        .await?;
    }

    Ok(())
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        full_name: String,
        email: String,
        activity: String,
        points: i32,
        occurred_at: DateTime<Utc>,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut inserted = 0usize;

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.with_context(|| format!("invalid CSV row {}", line + 1))?;
        if row.points == 0 {
            warn!(email = %row.email, activity = %row.activity, "skipping zero-point activity");
            continue;
        }

        let student_id = upsert_student(pool, &row.full_name, &row.email).await?;
        let source_key = row
            .source_key
            .filter(|key| !key.trim().is_empty())
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        if insert_activity(
            pool,
            student_id,
            &row.activity,
            row.points,
            row.occurred_at,
            &source_key,
        )
        .await?
        {
            inserted += 1;
        } else {
            debug!(%source_key, "activity already imported");
        }
    }

    Ok(inserted)
}

/// Postgres-backed store.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecommendationStore for PgStore {
    async fn find_negative_activities(
        &self,
        student_id: i64,
        since: DateTime<Utc>,
    ) -> StoreResult<Vec<NegativeActivityGroup>> {
        let rows = sqlx::query(
            r#"
            SELECT activity, COUNT(*) AS count, SUM(points)::BIGINT AS total_points
            FROM student_recommendations.activities
            WHERE student_id = $1 AND points < 0 AND occurred_at >= $2
            GROUP BY activity
            "#,
        )
        .bind(student_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| NegativeActivityGroup {
                activity: row.get("activity"),
                count: row.get("count"),
                total_points: row.get("total_points"),
            })
            .collect())
    }

    async fn find_positive_activities_for_students(
        &self,
        student_ids: &[i64],
        since: DateTime<Utc>,
    ) -> StoreResult<Vec<PeerActivityGroup>> {
        if student_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            r#"
            SELECT activity,
                   AVG(points)::FLOAT8 AS avg_points,
                   COUNT(*) AS count,
                   COUNT(DISTINCT student_id) AS student_count
            FROM student_recommendations.activities
            WHERE student_id = ANY($1) AND points > 0 AND occurred_at >= $2
            GROUP BY activity
            "#,
        )
        .bind(student_ids)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| PeerActivityGroup {
                activity: row.get("activity"),
                avg_points: row.get("avg_points"),
                count: row.get("count"),
                student_count: row.get("student_count"),
            })
            .collect())
    }

    async fn find_own_positive_activity_labels(
        &self,
        student_id: i64,
    ) -> StoreResult<BTreeSet<String>> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT activity
            FROM student_recommendations.activities
            WHERE student_id = $1 AND points > 0
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|row| row.get("activity")).collect())
    }

    async fn find_students_with_points_at_least(
        &self,
        threshold: i64,
        excluding: i64,
    ) -> StoreResult<Vec<PeerCandidate>> {
        let rows = sqlx::query(
            r#"
            SELECT student_id, total_points
            FROM student_recommendations.points
            WHERE total_points >= $1 AND student_id <> $2
            ORDER BY total_points DESC, student_id ASC
            "#,
        )
        .bind(threshold)
        .bind(excluding)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| PeerCandidate {
                student_id: row.get("student_id"),
                total_points: row.get("total_points"),
            })
            .collect())
    }

    async fn get_total_points(&self, student_id: i64) -> StoreResult<Option<i64>> {
        let row = sqlx::query(
            "SELECT total_points FROM student_recommendations.points WHERE student_id = $1",
        )
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| row.get("total_points")))
    }

    async fn attendance_summary(
        &self,
        student_id: i64,
        since: NaiveDate,
    ) -> StoreResult<AttendanceSummary> {
        let rows = sqlx::query(
            r#"
            SELECT status, COUNT(*) AS count
            FROM student_recommendations.attendances
            WHERE student_id = $1 AND date >= $2
            GROUP BY status
            "#,
        )
        .bind(student_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        let mut summary = AttendanceSummary::default();
        for row in rows {
            let status: String = row.get("status");
            match AttendanceStatus::parse(&status) {
                Some(status) => summary.add(status, row.get("count")),
                None => warn!(%status, "ignoring unknown attendance status"),
            }
        }
        Ok(summary)
    }
}
