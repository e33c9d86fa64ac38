use sqlx::{FromRow, PgPool};
use time::PrimitiveDateTime;

use crate::db::types::RecordStatus;

#[derive(Debug, Clone, FromRow)]
pub(crate) struct RecordTotals {
    pub(crate) total: i64,
    pub(crate) completed: i64,
    pub(crate) average_score: Option<f64>,
}

pub(crate) async fn record_totals(pool: &PgPool) -> Result<RecordTotals, sqlx::Error> {
    sqlx::query_as::<_, RecordTotals>(
        "SELECT
            COUNT(*) AS total,
            COUNT(*) FILTER (WHERE status IN ($1, $2)) AS completed,
            AVG(score) FILTER (WHERE status IN ($1, $2)) AS average_score
         FROM exam_records",
    )
    .bind(RecordStatus::Submitted)
    .bind(RecordStatus::TimedOut)
    .fetch_one(pool)
    .await
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct DayTotals {
    pub(crate) started: i64,
    pub(crate) completed: i64,
}

pub(crate) async fn record_totals_since(
    pool: &PgPool,
    since: PrimitiveDateTime,
) -> Result<DayTotals, sqlx::Error> {
    sqlx::query_as::<_, DayTotals>(
        "SELECT
            COUNT(*) AS started,
            COUNT(*) FILTER (WHERE status IN ($1, $2)) AS completed
         FROM exam_records
         WHERE created_at >= $3",
    )
    .bind(RecordStatus::Submitted)
    .bind(RecordStatus::TimedOut)
    .bind(since)
    .fetch_one(pool)
    .await
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct RecentActivity {
    pub(crate) record_id: String,
    pub(crate) exam_id: String,
    pub(crate) exam_title: String,
    pub(crate) student_id: String,
    pub(crate) student_name: Option<String>,
    pub(crate) status: RecordStatus,
    pub(crate) score: f64,
    pub(crate) submit_time: Option<PrimitiveDateTime>,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn recent_activities(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<RecentActivity>, sqlx::Error> {
    sqlx::query_as::<_, RecentActivity>(
        "SELECT
            r.id AS record_id, r.exam_id, e.title AS exam_title, r.student_id,
            COALESCE(r.student_name, s.name) AS student_name,
            r.status, r.score, r.submit_time, r.created_at
         FROM exam_records r
         JOIN exams e ON e.id = r.exam_id
         LEFT JOIN students s ON s.id = r.student_id
         ORDER BY r.created_at DESC
         LIMIT $1",
    )
    .bind(limit.clamp(1, 100))
    .fetch_all(pool)
    .await
}
