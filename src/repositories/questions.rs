use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::Question;
use crate::db::types::{ActiveStatus, DifficultyLevel, QuestionType};

pub(crate) const COLUMNS: &str = "\
    id, title, content, question_type, difficulty, options, correct_answers, \
    correct_answer, tags, status, created_by, created_at, updated_at";

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!("SELECT {COLUMNS} FROM questions WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_by_ids(
    executor: impl sqlx::PgExecutor<'_>,
    ids: &[String],
) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!("SELECT {COLUMNS} FROM questions WHERE id = ANY($1)"))
        .bind(ids)
        .fetch_all(executor)
        .await
}

/// Whether another question already uses `title`.
pub(crate) async fn title_taken(
    pool: &PgPool,
    title: &str,
    exclude_id: Option<&str>,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT EXISTS(
            SELECT 1 FROM questions WHERE title = $1 AND ($2::varchar IS NULL OR id <> $2)
        )",
    )
    .bind(title)
    .bind(exclude_id)
    .fetch_one(pool)
    .await
}

pub(crate) struct QuestionFields<'a> {
    pub(crate) title: &'a str,
    pub(crate) content: &'a str,
    pub(crate) question_type: QuestionType,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) options: Option<Vec<String>>,
    pub(crate) correct_answers: Option<serde_json::Value>,
    pub(crate) correct_answer: Option<&'a str>,
    pub(crate) tags: Option<Vec<String>>,
    pub(crate) status: ActiveStatus,
}

pub(crate) async fn create(
    pool: &PgPool,
    id: &str,
    fields: QuestionFields<'_>,
    created_by: &str,
    now: PrimitiveDateTime,
) -> Result<Question, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "INSERT INTO questions (
            id, title, content, question_type, difficulty, options, correct_answers,
            correct_answer, tags, status, created_by, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$12)
        RETURNING {COLUMNS}",
    ))
    .bind(id)
    .bind(fields.title)
    .bind(fields.content)
    .bind(fields.question_type)
    .bind(fields.difficulty)
    .bind(fields.options.map(Json))
    .bind(fields.correct_answers.map(Json))
    .bind(fields.correct_answer)
    .bind(fields.tags.map(Json))
    .bind(fields.status)
    .bind(created_by)
    .bind(now)
    .fetch_one(pool)
    .await
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    fields: QuestionFields<'_>,
    now: PrimitiveDateTime,
) -> Result<Option<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "UPDATE questions SET
            title = $1,
            content = $2,
            question_type = $3,
            difficulty = $4,
            options = $5,
            correct_answers = $6,
            correct_answer = $7,
            tags = $8,
            status = $9,
            updated_at = $10
         WHERE id = $11
         RETURNING {COLUMNS}",
    ))
    .bind(fields.title)
    .bind(fields.content)
    .bind(fields.question_type)
    .bind(fields.difficulty)
    .bind(fields.options.map(Json))
    .bind(fields.correct_answers.map(Json))
    .bind(fields.correct_answer)
    .bind(fields.tags.map(Json))
    .bind(fields.status)
    .bind(now)
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM questions WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn count_exam_links(pool: &PgPool, id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM exam_questions WHERE question_id = $1")
        .bind(id)
        .fetch_one(pool)
        .await
}

#[derive(Debug, Default)]
pub(crate) struct QuestionFilter<'a> {
    pub(crate) keyword: Option<&'a str>,
    pub(crate) question_type: Option<QuestionType>,
    pub(crate) difficulty: Option<DifficultyLevel>,
    pub(crate) status: Option<ActiveStatus>,
}

fn push_filters<'a>(builder: &mut QueryBuilder<'a, Postgres>, filter: &QuestionFilter<'a>) {
    builder.push(" WHERE status = ");
    builder.push_bind(filter.status.unwrap_or(ActiveStatus::Enabled));

    if let Some(keyword) = filter.keyword {
        let pattern = super::contains_pattern(keyword);
        builder.push(" AND (lower(title) LIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR lower(content) LIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR lower(COALESCE(tags::text, '')) LIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }

    if let Some(question_type) = filter.question_type {
        builder.push(" AND question_type = ");
        builder.push_bind(question_type);
    }

    if let Some(difficulty) = filter.difficulty {
        builder.push(" AND difficulty = ");
        builder.push_bind(difficulty);
    }
}

pub(crate) async fn list(
    pool: &PgPool,
    filter: &QuestionFilter<'_>,
    skip: i64,
    limit: i64,
) -> Result<Vec<Question>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM questions"));
    push_filters(&mut builder, filter);
    builder.push(" ORDER BY created_at ASC, id ASC OFFSET ");
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 1000));

    builder.build_query_as::<Question>().fetch_all(pool).await
}

pub(crate) async fn count(pool: &PgPool, filter: &QuestionFilter<'_>) -> Result<i64, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM questions");
    push_filters(&mut builder, filter);
    builder.build_query_scalar::<i64>().fetch_one(pool).await
}

pub(crate) async fn count_all(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM questions").fetch_one(pool).await
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct TypeCount {
    pub(crate) question_type: QuestionType,
    pub(crate) count: i64,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct DifficultyCount {
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) count: i64,
}

pub(crate) async fn count_by_type(pool: &PgPool) -> Result<Vec<TypeCount>, sqlx::Error> {
    sqlx::query_as::<_, TypeCount>(
        "SELECT question_type, COUNT(*) AS count FROM questions
         GROUP BY question_type ORDER BY question_type",
    )
    .fetch_all(pool)
    .await
}

pub(crate) async fn count_by_difficulty(
    pool: &PgPool,
) -> Result<Vec<DifficultyCount>, sqlx::Error> {
    sqlx::query_as::<_, DifficultyCount>(
        "SELECT difficulty, COUNT(*) AS count FROM questions
         GROUP BY difficulty ORDER BY difficulty",
    )
    .fetch_all(pool)
    .await
}
