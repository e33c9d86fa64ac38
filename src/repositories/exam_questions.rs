use time::PrimitiveDateTime;

use crate::db::models::{ExamQuestion, ExamQuestionDetail};
use crate::db::types::ExamStatus;

const COLUMNS: &str = "id, exam_id, question_id, question_order, score, created_at";

pub(crate) async fn find(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
    question_id: &str,
) -> Result<Option<ExamQuestion>, sqlx::Error> {
    sqlx::query_as::<_, ExamQuestion>(&format!(
        "SELECT {COLUMNS} FROM exam_questions WHERE exam_id = $1 AND question_id = $2"
    ))
    .bind(exam_id)
    .bind(question_id)
    .fetch_optional(executor)
    .await
}

/// Ids among `question_ids` that sit on an enabled exam whose window contains `now`.
pub(crate) async fn live_question_ids(
    executor: impl sqlx::PgExecutor<'_>,
    question_ids: &[String],
    now: PrimitiveDateTime,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT DISTINCT eq.question_id FROM exam_questions eq
         JOIN exams e ON e.id = eq.exam_id
         WHERE eq.question_id = ANY($1)
           AND e.status = $2
           AND e.start_time <= $3
           AND e.end_time > $3",
    )
    .bind(question_ids)
    .bind(ExamStatus::Enabled)
    .bind(now)
    .fetch_all(executor)
    .await
}

pub(crate) async fn next_order(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
) -> Result<i32, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COALESCE(MAX(question_order), 0) + 1 FROM exam_questions WHERE exam_id = $1",
    )
    .bind(exam_id)
    .fetch_one(executor)
    .await
}

pub(crate) struct CreateExamQuestion<'a> {
    pub(crate) id: &'a str,
    pub(crate) exam_id: &'a str,
    pub(crate) question_id: &'a str,
    pub(crate) question_order: i32,
    pub(crate) score: f64,
    pub(crate) created_at: PrimitiveDateTime,
}

/// Returns `None` when the question is already linked to the exam.
pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateExamQuestion<'_>,
) -> Result<Option<ExamQuestion>, sqlx::Error> {
    sqlx::query_as::<_, ExamQuestion>(&format!(
        "INSERT INTO exam_questions (id, exam_id, question_id, question_order, score, created_at)
         VALUES ($1,$2,$3,$4,$5,$6)
         ON CONFLICT (exam_id, question_id) DO NOTHING
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.exam_id)
    .bind(params.question_id)
    .bind(params.question_order)
    .bind(params.score)
    .bind(params.created_at)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn delete(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM exam_questions WHERE id = $1").bind(id).execute(executor).await?;
    Ok(())
}

pub(crate) async fn delete_by_exam(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM exam_questions WHERE exam_id = $1")
        .bind(exam_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

/// Closes the gap left by a removed link.
pub(crate) async fn shift_orders_after(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
    removed_order: i32,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE exam_questions SET question_order = question_order - 1
         WHERE exam_id = $1 AND question_order > $2",
    )
    .bind(exam_id)
    .bind(removed_order)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn update_score(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    score: f64,
) -> Result<ExamQuestion, sqlx::Error> {
    sqlx::query_as::<_, ExamQuestion>(&format!(
        "UPDATE exam_questions SET score = $1 WHERE id = $2 RETURNING {COLUMNS}"
    ))
    .bind(score)
    .bind(id)
    .fetch_one(executor)
    .await
}

pub(crate) async fn list_details(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
) -> Result<Vec<ExamQuestionDetail>, sqlx::Error> {
    sqlx::query_as::<_, ExamQuestionDetail>(
        "SELECT eq.id, eq.exam_id, eq.question_id, eq.question_order, eq.score,
                q.title, q.content, q.question_type, q.difficulty, q.options,
                q.correct_answers, q.correct_answer, q.tags
         FROM exam_questions eq
         JOIN questions q ON q.id = eq.question_id
         WHERE eq.exam_id = $1
         ORDER BY eq.question_order ASC",
    )
    .bind(exam_id)
    .fetch_all(executor)
    .await
}
