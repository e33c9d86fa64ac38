use serde::Deserialize;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::Exam;
use crate::db::types::{ExamStatus, RecordStatus};

pub(crate) const COLUMNS: &str = "\
    id, title, description, start_time, end_time, duration_minutes, total_score, \
    pass_score, question_count, status, created_by, created_at, updated_at";

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!("SELECT {COLUMNS} FROM exams WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Row-locks the exam for the rest of the transaction.
pub(crate) async fn lock_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!("SELECT {COLUMNS} FROM exams WHERE id = $1 FOR UPDATE"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn title_taken(
    pool: &PgPool,
    title: &str,
    exclude_id: Option<&str>,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT EXISTS(
            SELECT 1 FROM exams WHERE title = $1 AND ($2::varchar IS NULL OR id <> $2)
        )",
    )
    .bind(title)
    .bind(exclude_id)
    .fetch_one(pool)
    .await
}

pub(crate) struct ExamFields<'a> {
    pub(crate) title: &'a str,
    pub(crate) description: Option<&'a str>,
    pub(crate) start_time: PrimitiveDateTime,
    pub(crate) end_time: PrimitiveDateTime,
    pub(crate) duration_minutes: i32,
    pub(crate) pass_score: f64,
    pub(crate) status: ExamStatus,
}

pub(crate) async fn create(
    pool: &PgPool,
    id: &str,
    fields: ExamFields<'_>,
    total_score: f64,
    created_by: &str,
    now: PrimitiveDateTime,
) -> Result<Exam, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "INSERT INTO exams (
            id, title, description, start_time, end_time, duration_minutes, total_score,
            pass_score, question_count, status, created_by, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,0,$9,$10,$11,$11)
        RETURNING {COLUMNS}",
    ))
    .bind(id)
    .bind(fields.title)
    .bind(fields.description)
    .bind(fields.start_time)
    .bind(fields.end_time)
    .bind(fields.duration_minutes)
    .bind(total_score)
    .bind(fields.pass_score)
    .bind(fields.status)
    .bind(created_by)
    .bind(now)
    .fetch_one(pool)
    .await
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    fields: ExamFields<'_>,
    now: PrimitiveDateTime,
) -> Result<Option<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "UPDATE exams SET
            title = $1,
            description = $2,
            start_time = $3,
            end_time = $4,
            duration_minutes = $5,
            pass_score = $6,
            status = $7,
            updated_at = $8
         WHERE id = $9
         RETURNING {COLUMNS}",
    ))
    .bind(fields.title)
    .bind(fields.description)
    .bind(fields.start_time)
    .bind(fields.end_time)
    .bind(fields.duration_minutes)
    .bind(fields.pass_score)
    .bind(fields.status)
    .bind(now)
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn delete_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM exams WHERE id = $1").bind(id).execute(executor).await?;
    Ok(())
}

pub(crate) async fn update_status(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    status: ExamStatus,
    now: PrimitiveDateTime,
) -> Result<Exam, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "UPDATE exams SET status = $1, updated_at = $2 WHERE id = $3 RETURNING {COLUMNS}"
    ))
    .bind(status)
    .bind(now)
    .bind(id)
    .fetch_one(executor)
    .await
}

/// Recomputes `question_count` and `total_score` from the exam's question links.
pub(crate) async fn refresh_totals(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    now: PrimitiveDateTime,
) -> Result<Exam, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "UPDATE exams SET
            question_count = (SELECT COUNT(*) FROM exam_questions WHERE exam_id = $1),
            total_score = COALESCE(
                (SELECT SUM(score) FROM exam_questions WHERE exam_id = $1), 0
            ),
            updated_at = $2
         WHERE id = $1
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(now)
    .fetch_one(executor)
    .await
}

/// Marks enabled exams whose window has closed as finished and returns their ids.
pub(crate) async fn finish_expired(
    executor: impl sqlx::PgExecutor<'_>,
    now: PrimitiveDateTime,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar(
        "UPDATE exams SET status = $1, updated_at = $2
         WHERE status = $3 AND end_time <= $2
         RETURNING id",
    )
    .bind(ExamStatus::Finished)
    .bind(now)
    .bind(ExamStatus::Enabled)
    .fetch_all(executor)
    .await
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum ExamSort {
    #[default]
    #[serde(alias = "createdAt")]
    CreatedAt,
    #[serde(alias = "startTime")]
    StartTime,
    #[serde(alias = "endTime")]
    EndTime,
    Title,
}

impl ExamSort {
    fn column(self) -> &'static str {
        match self {
            ExamSort::CreatedAt => "created_at",
            ExamSort::StartTime => "start_time",
            ExamSort::EndTime => "end_time",
            ExamSort::Title => "title",
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct ExamFilter<'a> {
    pub(crate) title: Option<&'a str>,
    pub(crate) status: Option<ExamStatus>,
    pub(crate) created_by: Option<&'a str>,
}

fn push_filters<'a>(builder: &mut QueryBuilder<'a, Postgres>, filter: &ExamFilter<'a>) {
    builder.push(" WHERE 1=1");

    if let Some(title) = filter.title {
        builder.push(" AND lower(title) LIKE ");
        builder.push_bind(super::contains_pattern(title));
    }

    if let Some(status) = filter.status {
        builder.push(" AND status = ");
        builder.push_bind(status);
    }

    if let Some(created_by) = filter.created_by {
        builder.push(" AND created_by = ");
        builder.push_bind(created_by);
    }
}

pub(crate) async fn list(
    pool: &PgPool,
    filter: &ExamFilter<'_>,
    sort: ExamSort,
    descending: bool,
    skip: i64,
    limit: i64,
) -> Result<Vec<Exam>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM exams"));
    push_filters(&mut builder, filter);
    builder.push(format!(
        " ORDER BY {} {}, id ASC OFFSET ",
        sort.column(),
        if descending { "DESC" } else { "ASC" }
    ));
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 1000));

    builder.build_query_as::<Exam>().fetch_all(pool).await
}

pub(crate) async fn count(pool: &PgPool, filter: &ExamFilter<'_>) -> Result<i64, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM exams");
    push_filters(&mut builder, filter);
    builder.build_query_scalar::<i64>().fetch_one(pool).await
}

/// Enabled exams whose window contains `now`.
pub(crate) async fn list_active(
    pool: &PgPool,
    now: PrimitiveDateTime,
) -> Result<Vec<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "SELECT {COLUMNS} FROM exams
         WHERE status = $1 AND start_time <= $2 AND end_time > $2
         ORDER BY end_time ASC"
    ))
    .bind(ExamStatus::Enabled)
    .bind(now)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_upcoming(
    pool: &PgPool,
    now: PrimitiveDateTime,
) -> Result<Vec<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "SELECT {COLUMNS} FROM exams WHERE status = $1 AND start_time > $2 ORDER BY start_time ASC"
    ))
    .bind(ExamStatus::Enabled)
    .bind(now)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_finished(
    pool: &PgPool,
    now: PrimitiveDateTime,
) -> Result<Vec<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "SELECT {COLUMNS} FROM exams WHERE status = $1 OR end_time <= $2 ORDER BY end_time DESC"
    ))
    .bind(ExamStatus::Finished)
    .bind(now)
    .fetch_all(pool)
    .await
}

/// Open exams the student has not completed yet.
pub(crate) async fn list_available_for_student(
    pool: &PgPool,
    student_id: &str,
    now: PrimitiveDateTime,
) -> Result<Vec<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "SELECT {COLUMNS} FROM exams e
         WHERE e.status = $1 AND e.end_time > $2
           AND NOT EXISTS (
               SELECT 1 FROM exam_records r
               WHERE r.exam_id = e.id AND r.student_id = $3 AND r.status IN ($4, $5)
           )
         ORDER BY e.start_time ASC"
    ))
    .bind(ExamStatus::Enabled)
    .bind(now)
    .bind(student_id)
    .bind(RecordStatus::Submitted)
    .bind(RecordStatus::TimedOut)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_participated_by_student(
    pool: &PgPool,
    student_id: &str,
) -> Result<Vec<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "SELECT {COLUMNS} FROM exams e
         WHERE EXISTS (SELECT 1 FROM exam_records r WHERE r.exam_id = e.id AND r.student_id = $1)
         ORDER BY e.start_time DESC"
    ))
    .bind(student_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_recent(pool: &PgPool, limit: i64) -> Result<Vec<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "SELECT {COLUMNS} FROM exams ORDER BY created_at DESC LIMIT $1"
    ))
    .bind(limit.clamp(1, 1000))
    .fetch_all(pool)
    .await
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct ExamCounts {
    pub(crate) total: i64,
    pub(crate) enabled: i64,
    pub(crate) pending: i64,
    pub(crate) in_window: i64,
    pub(crate) finished: i64,
}

pub(crate) async fn counts(pool: &PgPool, now: PrimitiveDateTime) -> Result<ExamCounts, sqlx::Error> {
    sqlx::query_as::<_, ExamCounts>(
        "SELECT
            COUNT(*) AS total,
            COUNT(*) FILTER (WHERE status = 'enabled') AS enabled,
            COUNT(*) FILTER (WHERE status = 'enabled' AND start_time > $1) AS pending,
            COUNT(*) FILTER (
                WHERE status = 'enabled' AND start_time <= $1 AND end_time > $1
            ) AS in_window,
            COUNT(*) FILTER (WHERE status = 'finished' OR end_time <= $1) AS finished
         FROM exams",
    )
    .bind(now)
    .fetch_one(pool)
    .await
}
