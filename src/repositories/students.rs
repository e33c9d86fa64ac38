use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::Student;
use crate::db::types::ActiveStatus;

const COLUMNS: &str = "\
    id, student_number, name, hashed_password, email, phone, class_name, major, grade, \
    status, last_login_at, created_at, updated_at";

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!("SELECT {COLUMNS} FROM students WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Students sign in with either their student number or e-mail.
pub(crate) async fn find_by_login(
    pool: &PgPool,
    identifier: &str,
) -> Result<Option<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!(
        "SELECT {COLUMNS} FROM students
         WHERE student_number = $1 OR lower(email) = lower($1)
         LIMIT 1"
    ))
    .bind(identifier)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn student_number_exists(
    pool: &PgPool,
    student_number: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM students WHERE student_number = $1)")
        .bind(student_number)
        .fetch_one(pool)
        .await
}

pub(crate) async fn email_exists(pool: &PgPool, email: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM students WHERE lower(email) = lower($1))")
        .bind(email)
        .fetch_one(pool)
        .await
}

pub(crate) struct CreateStudent<'a> {
    pub(crate) id: &'a str,
    pub(crate) student_number: &'a str,
    pub(crate) name: &'a str,
    pub(crate) hashed_password: String,
    pub(crate) email: Option<&'a str>,
    pub(crate) phone: Option<&'a str>,
    pub(crate) class_name: Option<&'a str>,
    pub(crate) major: Option<&'a str>,
    pub(crate) grade: Option<&'a str>,
    pub(crate) status: ActiveStatus,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateStudent<'_>,
) -> Result<Student, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!(
        "INSERT INTO students (
            id, student_number, name, hashed_password, email, phone, class_name, major,
            grade, status, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$11)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.student_number)
    .bind(params.name)
    .bind(params.hashed_password)
    .bind(params.email)
    .bind(params.phone)
    .bind(params.class_name)
    .bind(params.major)
    .bind(params.grade)
    .bind(params.status)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn touch_last_login(
    pool: &PgPool,
    id: &str,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE students SET last_login_at = $1 WHERE id = $2")
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub(crate) async fn update_status(
    pool: &PgPool,
    id: &str,
    status: ActiveStatus,
    now: PrimitiveDateTime,
) -> Result<Option<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>(&format!(
        "UPDATE students SET status = $1, updated_at = $2 WHERE id = $3 RETURNING {COLUMNS}"
    ))
    .bind(status)
    .bind(now)
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM students WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn delete_many(pool: &PgPool, ids: &[String]) -> Result<u64, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM students WHERE id = ANY($1)").bind(ids).execute(pool).await?;
    Ok(result.rows_affected())
}

#[derive(Debug, Default)]
pub(crate) struct StudentFilter<'a> {
    pub(crate) keyword: Option<&'a str>,
    pub(crate) status: Option<ActiveStatus>,
    pub(crate) class_name: Option<&'a str>,
    pub(crate) major: Option<&'a str>,
}

fn push_filters<'a>(builder: &mut QueryBuilder<'a, Postgres>, filter: &StudentFilter<'a>) {
    builder.push(" WHERE 1=1");

    if let Some(keyword) = filter.keyword {
        let pattern = super::contains_pattern(keyword);
        builder.push(" AND (");
        let mut separated = builder.separated(" OR ");
        for column in ["name", "student_number", "email", "class_name", "major"] {
            separated.push(format!("lower(COALESCE({column}, '')) LIKE "));
            separated.push_bind_unseparated(pattern.clone());
        }
        builder.push(")");
    }

    if let Some(status) = filter.status {
        builder.push(" AND status = ");
        builder.push_bind(status);
    }

    if let Some(class_name) = filter.class_name {
        builder.push(" AND class_name = ");
        builder.push_bind(class_name);
    }

    if let Some(major) = filter.major {
        builder.push(" AND major = ");
        builder.push_bind(major);
    }
}

pub(crate) async fn list(
    pool: &PgPool,
    filter: &StudentFilter<'_>,
    skip: i64,
    limit: i64,
) -> Result<Vec<Student>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM students"));
    push_filters(&mut builder, filter);
    builder.push(" ORDER BY created_at DESC OFFSET ");
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 1000));

    builder.build_query_as::<Student>().fetch_all(pool).await
}

pub(crate) async fn count(pool: &PgPool, filter: &StudentFilter<'_>) -> Result<i64, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM students");
    push_filters(&mut builder, filter);
    builder.build_query_scalar::<i64>().fetch_one(pool).await
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct StudentStatistics {
    pub(crate) total: i64,
    pub(crate) active: i64,
    pub(crate) inactive: i64,
}

pub(crate) async fn statistics(pool: &PgPool) -> Result<StudentStatistics, sqlx::Error> {
    sqlx::query_as::<_, StudentStatistics>(
        "SELECT
            COUNT(*) AS total,
            COUNT(*) FILTER (WHERE status = 'enabled') AS active,
            COUNT(*) FILTER (WHERE status = 'disabled') AS inactive
         FROM students",
    )
    .fetch_one(pool)
    .await
}

pub(crate) async fn count_active_since(
    pool: &PgPool,
    since: PrimitiveDateTime,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM students WHERE last_login_at >= $1")
        .bind(since)
        .fetch_one(pool)
        .await
}

/// Distinct non-empty values of one descriptive column.
#[derive(Debug, Clone, Copy)]
pub(crate) enum StudentFacet {
    ClassName,
    Major,
    Grade,
}

impl StudentFacet {
    fn column(self) -> &'static str {
        match self {
            StudentFacet::ClassName => "class_name",
            StudentFacet::Major => "major",
            StudentFacet::Grade => "grade",
        }
    }
}

pub(crate) async fn distinct_values(
    pool: &PgPool,
    facet: StudentFacet,
) -> Result<Vec<String>, sqlx::Error> {
    let column = facet.column();
    sqlx::query_scalar::<_, String>(&format!(
        "SELECT DISTINCT {column} FROM students
         WHERE {column} IS NOT NULL AND {column} <> ''
         ORDER BY {column}"
    ))
    .fetch_all(pool)
    .await
}
