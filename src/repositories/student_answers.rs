use time::PrimitiveDateTime;

use crate::db::models::StudentAnswer;

pub(crate) const COLUMNS: &str = "\
    id, exam_record_id, exam_id, student_id, question_id, student_answer, correct_answer, \
    is_correct, answer_time, created_at, updated_at";

pub(crate) struct UpsertAnswer<'a> {
    pub(crate) id: &'a str,
    pub(crate) exam_record_id: &'a str,
    pub(crate) exam_id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) question_id: &'a str,
    pub(crate) student_answer: Option<&'a str>,
    pub(crate) correct_answer: Option<&'a str>,
    pub(crate) is_correct: Option<bool>,
    pub(crate) answered_at: PrimitiveDateTime,
}

/// Re-submitting an answer overwrites the previous one for the same question.
pub(crate) async fn upsert(
    executor: impl sqlx::PgExecutor<'_>,
    params: UpsertAnswer<'_>,
) -> Result<StudentAnswer, sqlx::Error> {
    sqlx::query_as::<_, StudentAnswer>(&format!(
        "INSERT INTO student_answers (
            id, exam_record_id, exam_id, student_id, question_id, student_answer,
            correct_answer, is_correct, answer_time, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$9,$9)
        ON CONFLICT (exam_record_id, question_id) DO UPDATE SET
            student_answer = EXCLUDED.student_answer,
            correct_answer = EXCLUDED.correct_answer,
            is_correct = EXCLUDED.is_correct,
            answer_time = EXCLUDED.answer_time,
            updated_at = EXCLUDED.updated_at
        RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.exam_record_id)
    .bind(params.exam_id)
    .bind(params.student_id)
    .bind(params.question_id)
    .bind(params.student_answer)
    .bind(params.correct_answer)
    .bind(params.is_correct)
    .bind(params.answered_at)
    .fetch_one(executor)
    .await
}

pub(crate) async fn list_by_record(
    executor: impl sqlx::PgExecutor<'_>,
    exam_record_id: &str,
) -> Result<Vec<StudentAnswer>, sqlx::Error> {
    sqlx::query_as::<_, StudentAnswer>(&format!(
        "SELECT {COLUMNS} FROM student_answers WHERE exam_record_id = $1 ORDER BY question_id"
    ))
    .bind(exam_record_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn delete_by_record(
    executor: impl sqlx::PgExecutor<'_>,
    exam_record_id: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM student_answers WHERE exam_record_id = $1")
        .bind(exam_record_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}
