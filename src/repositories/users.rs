use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::User;
use crate::db::types::ActiveStatus;

const COLUMNS: &str = "\
    id, username, email, hashed_password, nickname, avatar, status, is_superuser, \
    last_login_at, created_at, updated_at";

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Looks a user up by username or e-mail, whichever matches.
pub(crate) async fn find_by_login(
    pool: &PgPool,
    identifier: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {COLUMNS} FROM users WHERE username = $1 OR lower(email) = lower($1) LIMIT 1"
    ))
    .bind(identifier)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn username_exists(pool: &PgPool, username: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
        .bind(username)
        .fetch_one(pool)
        .await
}

pub(crate) async fn email_exists(pool: &PgPool, email: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE lower(email) = lower($1))")
        .bind(email)
        .fetch_one(pool)
        .await
}

pub(crate) struct CreateUser<'a> {
    pub(crate) id: &'a str,
    pub(crate) username: &'a str,
    pub(crate) email: &'a str,
    pub(crate) hashed_password: String,
    pub(crate) nickname: Option<&'a str>,
    pub(crate) status: ActiveStatus,
    pub(crate) is_superuser: bool,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateUser<'_>) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (
            id, username, email, hashed_password, nickname, status, is_superuser,
            created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$8)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.username)
    .bind(params.email)
    .bind(params.hashed_password)
    .bind(params.nickname)
    .bind(params.status)
    .bind(params.is_superuser)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn reset_superuser(
    pool: &PgPool,
    id: &str,
    hashed_password: String,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE users
         SET hashed_password = $1, status = $2, is_superuser = TRUE, updated_at = $3
         WHERE id = $4",
    )
    .bind(hashed_password)
    .bind(ActiveStatus::Enabled)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) async fn touch_last_login(
    pool: &PgPool,
    id: &str,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET last_login_at = $1 WHERE id = $2")
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
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET status = $1, updated_at = $2 WHERE id = $3 RETURNING {COLUMNS}"
    ))
    .bind(status)
    .bind(now)
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) struct ListUsersParams<'a> {
    pub(crate) keyword: Option<&'a str>,
    pub(crate) status: Option<ActiveStatus>,
    pub(crate) skip: i64,
    pub(crate) limit: i64,
}

fn push_filters<'a>(
    builder: &mut QueryBuilder<'a, Postgres>,
    keyword: Option<&'a str>,
    status: Option<ActiveStatus>,
) {
    builder.push(" WHERE 1=1");

    if let Some(keyword) = keyword {
        let pattern = super::contains_pattern(keyword);
        builder.push(" AND (lower(username) LIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR lower(email) LIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR lower(COALESCE(nickname, '')) LIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }

    if let Some(status) = status {
        builder.push(" AND status = ");
        builder.push_bind(status);
    }
}

pub(crate) async fn list(
    pool: &PgPool,
    params: ListUsersParams<'_>,
) -> Result<Vec<User>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM users"));
    push_filters(&mut builder, params.keyword, params.status);
    builder.push(" ORDER BY created_at DESC OFFSET ");
    builder.push_bind(params.skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(params.limit.clamp(1, 1000));

    builder.build_query_as::<User>().fetch_all(pool).await
}

pub(crate) async fn count(
    pool: &PgPool,
    keyword: Option<&str>,
    status: Option<ActiveStatus>,
) -> Result<i64, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users");
    push_filters(&mut builder, keyword, status);
    builder.build_query_scalar::<i64>().fetch_one(pool).await
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct UserStatistics {
    pub(crate) total: i64,
    pub(crate) active: i64,
    pub(crate) inactive: i64,
    pub(crate) recently_active: i64,
    pub(crate) never_logged_in: i64,
}

pub(crate) async fn statistics(
    pool: &PgPool,
    active_since: PrimitiveDateTime,
) -> Result<UserStatistics, sqlx::Error> {
    sqlx::query_as::<_, UserStatistics>(
        "SELECT
            COUNT(*) AS total,
            COUNT(*) FILTER (WHERE status = 'enabled') AS active,
            COUNT(*) FILTER (WHERE status = 'disabled') AS inactive,
            COUNT(*) FILTER (WHERE last_login_at >= $1) AS recently_active,
            COUNT(*) FILTER (WHERE last_login_at IS NULL) AS never_logged_in
         FROM users",
    )
    .bind(active_since)
    .fetch_one(pool)
    .await
}

pub(crate) async fn list_active_since(
    pool: &PgPool,
    since: PrimitiveDateTime,
) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {COLUMNS} FROM users WHERE last_login_at >= $1 ORDER BY last_login_at DESC"
    ))
    .bind(since)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_never_logged_in(pool: &PgPool) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {COLUMNS} FROM users WHERE last_login_at IS NULL ORDER BY created_at DESC"
    ))
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_created_between(
    pool: &PgPool,
    start: PrimitiveDateTime,
    end: PrimitiveDateTime,
) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {COLUMNS} FROM users WHERE created_at BETWEEN $1 AND $2 ORDER BY created_at DESC"
    ))
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await
}
