use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::{ExamRecord, ExamRecordWithExam};
use crate::db::types::RecordStatus;
use crate::services::lifecycle::{RecordSample, ScoreSummary};

pub(crate) const COLUMNS: &str = "\
    id, exam_id, student_id, student_number, student_name, start_time, end_time, \
    submit_time, total_score, score, correct_count, wrong_count, unanswered_count, \
    status, duration_minutes, ip_address, user_agent, created_at, updated_at";

const QUALIFIED_COLUMNS: &str = "\
    r.id, r.exam_id, r.student_id, r.student_number, r.student_name, r.start_time, \
    r.end_time, r.submit_time, r.total_score, r.score, r.correct_count, r.wrong_count, \
    r.unanswered_count, r.status, r.duration_minutes, r.ip_address, r.user_agent, \
    r.created_at, r.updated_at";

const JOINED_COLUMNS: &str = "\
    r.id, r.exam_id, r.student_id, r.student_number, r.student_name, r.start_time, \
    r.end_time, r.submit_time, r.total_score, r.score, r.correct_count, r.wrong_count, \
    r.unanswered_count, r.status, r.duration_minutes, r.ip_address, r.user_agent, \
    r.created_at, r.updated_at, e.title AS exam_title, e.pass_score AS exam_pass_score";

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<ExamRecord>, sqlx::Error> {
    sqlx::query_as::<_, ExamRecord>(&format!("SELECT {COLUMNS} FROM exam_records WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn lock_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<ExamRecord>, sqlx::Error> {
    sqlx::query_as::<_, ExamRecord>(&format!(
        "SELECT {COLUMNS} FROM exam_records WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn lock_by_exam_and_student(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
    student_id: &str,
) -> Result<Option<ExamRecord>, sqlx::Error> {
    sqlx::query_as::<_, ExamRecord>(&format!(
        "SELECT {COLUMNS} FROM exam_records WHERE exam_id = $1 AND student_id = $2 FOR UPDATE"
    ))
    .bind(exam_id)
    .bind(student_id)
    .fetch_optional(executor)
    .await
}

pub(crate) struct CreateRecord<'a> {
    pub(crate) id: &'a str,
    pub(crate) exam_id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) student_number: &'a str,
    pub(crate) student_name: &'a str,
    pub(crate) start_time: Option<PrimitiveDateTime>,
    pub(crate) total_score: f64,
    pub(crate) status: RecordStatus,
    pub(crate) ip_address: Option<&'a str>,
    pub(crate) user_agent: Option<&'a str>,
    pub(crate) created_at: PrimitiveDateTime,
}

/// Returns `None` if the student already holds a record for the exam.
pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateRecord<'_>,
) -> Result<Option<ExamRecord>, sqlx::Error> {
    sqlx::query_as::<_, ExamRecord>(&format!(
        "INSERT INTO exam_records (
            id, exam_id, student_id, student_number, student_name, start_time, total_score,
            status, ip_address, user_agent, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$11)
        ON CONFLICT (exam_id, student_id) DO NOTHING
        RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.exam_id)
    .bind(params.student_id)
    .bind(params.student_number)
    .bind(params.student_name)
    .bind(params.start_time)
    .bind(params.total_score)
    .bind(params.status)
    .bind(params.ip_address)
    .bind(params.user_agent)
    .bind(params.created_at)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn mark_started(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    started_at: PrimitiveDateTime,
    ip_address: Option<&str>,
    user_agent: Option<&str>,
) -> Result<ExamRecord, sqlx::Error> {
    sqlx::query_as::<_, ExamRecord>(&format!(
        "UPDATE exam_records SET
            status = $1,
            start_time = $2,
            ip_address = COALESCE($3, ip_address),
            user_agent = COALESCE($4, user_agent),
            updated_at = $2
         WHERE id = $5
         RETURNING {COLUMNS}"
    ))
    .bind(RecordStatus::InProgress)
    .bind(started_at)
    .bind(ip_address)
    .bind(user_agent)
    .bind(id)
    .fetch_one(executor)
    .await
}

pub(crate) struct CompleteRecord {
    pub(crate) status: RecordStatus,
    pub(crate) start_time: PrimitiveDateTime,
    pub(crate) finished_at: PrimitiveDateTime,
    pub(crate) duration_minutes: i32,
    pub(crate) total_score: f64,
    pub(crate) summary: ScoreSummary,
}

/// Closes an attempt, either by submission or timeout, and stores its score.
pub(crate) async fn complete(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    params: CompleteRecord,
) -> Result<ExamRecord, sqlx::Error> {
    sqlx::query_as::<_, ExamRecord>(&format!(
        "UPDATE exam_records SET
            status = $1,
            start_time = $2,
            end_time = $3,
            submit_time = $3,
            duration_minutes = $4,
            total_score = $5,
            score = $6,
            correct_count = $7,
            wrong_count = $8,
            unanswered_count = $9,
            updated_at = $3
         WHERE id = $10
         RETURNING {COLUMNS}"
    ))
    .bind(params.status)
    .bind(params.start_time)
    .bind(params.finished_at)
    .bind(params.duration_minutes)
    .bind(params.total_score)
    .bind(params.summary.score)
    .bind(params.summary.correct_count)
    .bind(params.summary.wrong_count)
    .bind(params.summary.unanswered_count)
    .bind(id)
    .fetch_one(executor)
    .await
}

pub(crate) async fn update_score(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    score: f64,
    now: PrimitiveDateTime,
) -> Result<ExamRecord, sqlx::Error> {
    sqlx::query_as::<_, ExamRecord>(&format!(
        "UPDATE exam_records SET score = $1, updated_at = $2 WHERE id = $3 RETURNING {COLUMNS}"
    ))
    .bind(score)
    .bind(now)
    .bind(id)
    .fetch_one(executor)
    .await
}

pub(crate) async fn reset(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    now: PrimitiveDateTime,
) -> Result<ExamRecord, sqlx::Error> {
    sqlx::query_as::<_, ExamRecord>(&format!(
        "UPDATE exam_records SET
            status = $1,
            start_time = NULL,
            end_time = NULL,
            submit_time = NULL,
            duration_minutes = NULL,
            score = 0,
            correct_count = 0,
            wrong_count = 0,
            unanswered_count = 0,
            updated_at = $2
         WHERE id = $3
         RETURNING {COLUMNS}"
    ))
    .bind(RecordStatus::NotStarted)
    .bind(now)
    .bind(id)
    .fetch_one(executor)
    .await
}

pub(crate) async fn delete(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM exam_records WHERE id = $1").bind(id).execute(executor).await?;
    Ok(())
}

pub(crate) async fn count_by_exam(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM exam_records WHERE exam_id = $1")
        .bind(exam_id)
        .fetch_one(executor)
        .await
}

#[derive(Debug, FromRow)]
struct SampleRow {
    status: RecordStatus,
    score: f64,
}

pub(crate) async fn samples_for_exam(
    pool: &PgPool,
    exam_id: &str,
) -> Result<Vec<RecordSample>, sqlx::Error> {
    let rows = sqlx::query_as::<_, SampleRow>(
        "SELECT status, score FROM exam_records WHERE exam_id = $1",
    )
    .bind(exam_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|row| RecordSample { status: row.status, score: row.score }).collect())
}

#[derive(Debug, Default)]
pub(crate) struct RecordFilter<'a> {
    pub(crate) exam_id: Option<&'a str>,
    pub(crate) student_id: Option<&'a str>,
    pub(crate) student_name: Option<&'a str>,
    pub(crate) status: Option<RecordStatus>,
}

fn push_filters<'a>(builder: &mut QueryBuilder<'a, Postgres>, filter: &RecordFilter<'a>) {
    builder.push(" WHERE 1=1");

    if let Some(exam_id) = filter.exam_id {
        builder.push(" AND r.exam_id = ");
        builder.push_bind(exam_id);
    }

    if let Some(student_id) = filter.student_id {
        builder.push(" AND r.student_id = ");
        builder.push_bind(student_id);
    }

    if let Some(student_name) = filter.student_name {
        builder.push(" AND lower(COALESCE(r.student_name, '')) LIKE ");
        builder.push_bind(super::contains_pattern(student_name));
    }

    if let Some(status) = filter.status {
        builder.push(" AND r.status = ");
        builder.push_bind(status);
    }
}

pub(crate) async fn list(
    pool: &PgPool,
    filter: &RecordFilter<'_>,
    skip: i64,
    limit: i64,
) -> Result<Vec<ExamRecordWithExam>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(format!(
        "SELECT {JOINED_COLUMNS} FROM exam_records r JOIN exams e ON e.id = r.exam_id"
    ));
    push_filters(&mut builder, filter);
    builder.push(" ORDER BY r.created_at DESC, r.id ASC OFFSET ");
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 1000));

    builder.build_query_as::<ExamRecordWithExam>().fetch_all(pool).await
}

pub(crate) async fn count(pool: &PgPool, filter: &RecordFilter<'_>) -> Result<i64, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM exam_records r");
    push_filters(&mut builder, filter);
    builder.build_query_scalar::<i64>().fetch_one(pool).await
}

pub(crate) async fn list_in_progress_for_exam(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
) -> Result<Vec<ExamRecord>, sqlx::Error> {
    sqlx::query_as::<_, ExamRecord>(&format!(
        "SELECT {COLUMNS} FROM exam_records WHERE exam_id = $1 AND status = $2 FOR UPDATE"
    ))
    .bind(exam_id)
    .bind(RecordStatus::InProgress)
    .fetch_all(executor)
    .await
}

/// In-progress attempts whose personal deadline has passed. Locked rows held by other
/// transactions are skipped so concurrent sweeps do not block each other.
pub(crate) async fn lock_overdue(
    executor: impl sqlx::PgExecutor<'_>,
    now: PrimitiveDateTime,
    limit: i64,
) -> Result<Vec<ExamRecord>, sqlx::Error> {
    sqlx::query_as::<_, ExamRecord>(&format!(
        "SELECT {QUALIFIED_COLUMNS} FROM exam_records r
         JOIN exams e ON e.id = r.exam_id
         WHERE r.status = $1
           AND r.start_time IS NOT NULL
           AND r.start_time + make_interval(mins => e.duration_minutes) <= $2
         ORDER BY r.start_time ASC
         LIMIT $3
         FOR UPDATE OF r SKIP LOCKED"
    ))
    .bind(RecordStatus::InProgress)
    .bind(now)
    .bind(limit)
    .fetch_all(executor)
    .await
}
