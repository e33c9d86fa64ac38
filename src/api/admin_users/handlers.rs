use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentAdmin;
use crate::api::pagination::PaginatedResponse;
use crate::api::validation::clean_filter;
use crate::core::state::AppState;
use crate::core::time::{days_before, primitive_now_utc, to_primitive_utc};
use crate::db::types::ActiveStatus;
use crate::repositories;
use crate::repositories::users::ListUsersParams;
use crate::schemas::datetime::parse_offset_datetime_flexible;
use crate::schemas::user::{StatusUpdate, UserResponse, UserStatisticsResponse};

const RECENT_ACTIVITY_DAYS: i64 = 7;

#[derive(Debug, Deserialize)]
pub(super) struct ListUsersQuery {
    #[serde(default)]
    skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    limit: i64,
    #[serde(default)]
    keyword: Option<String>,
    #[serde(default)]
    status: Option<ActiveStatus>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RecentActiveQuery {
    #[serde(default = "default_days")]
    days: i64,
}

fn default_days() -> i64 {
    RECENT_ACTIVITY_DAYS
}

#[derive(Debug, Deserialize)]
pub(super) struct CreatedBetweenQuery {
    start: String,
    end: String,
}

pub(super) async fn list_users(
    Query(params): Query<ListUsersQuery>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<UserResponse>>, ApiError> {
    let keyword = clean_filter(params.keyword.as_deref());

    let users = repositories::users::list(
        state.db(),
        ListUsersParams { keyword, status: params.status, skip: params.skip, limit: params.limit },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to list users"))?;
    let total_count = repositories::users::count(state.db(), keyword, params.status)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count users"))?;

    Ok(Json(PaginatedResponse::new(
        users.into_iter().map(UserResponse::from_db).collect(),
        total_count,
        params.skip,
        params.limit,
    )))
}

pub(super) async fn get_user(
    Path(user_id): Path<String>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = repositories::users::find_by_id(state.db(), &user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch user"))?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(UserResponse::from_db(user)))
}

pub(super) async fn update_user_status(
    Path(user_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<StatusUpdate>,
) -> Result<Json<UserResponse>, ApiError> {
    if user_id == admin.id && payload.status == ActiveStatus::Disabled {
        return Err(ApiError::BadRequest("You cannot disable your own account".to_string()));
    }

    let user =
        repositories::users::update_status(state.db(), &user_id, payload.status, primitive_now_utc())
            .await
            .map_err(|e| ApiError::internal(e, "Failed to update user status"))?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    tracing::info!(
        user_id = %user.id,
        admin_id = %admin.id,
        status = ?user.status,
        "Administrator status changed"
    );
    Ok(Json(UserResponse::from_db(user)))
}

pub(super) async fn user_statistics(
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<UserStatisticsResponse>, ApiError> {
    let since = days_before(primitive_now_utc(), RECENT_ACTIVITY_DAYS);
    let stats = repositories::users::statistics(state.db(), since)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load user statistics"))?;

    Ok(Json(UserStatisticsResponse {
        total: stats.total,
        active: stats.active,
        inactive: stats.inactive,
        recently_active: stats.recently_active,
        never_logged_in: stats.never_logged_in,
    }))
}

pub(super) async fn recent_active_users(
    Query(params): Query<RecentActiveQuery>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    if params.days <= 0 {
        return Err(ApiError::BadRequest("days must be positive".to_string()));
    }

    let since = days_before(primitive_now_utc(), params.days);
    let users = repositories::users::list_active_since(state.db(), since)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list active users"))?;

    Ok(Json(users.into_iter().map(UserResponse::from_db).collect()))
}

pub(super) async fn never_logged_in_users(
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = repositories::users::list_never_logged_in(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list users"))?;

    Ok(Json(users.into_iter().map(UserResponse::from_db).collect()))
}

pub(super) async fn users_created_between(
    Query(params): Query<CreatedBetweenQuery>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let start = parse_offset_datetime_flexible(&params.start)
        .ok_or_else(|| ApiError::BadRequest("start must be an RFC3339 timestamp".to_string()))?;
    let end = parse_offset_datetime_flexible(&params.end)
        .ok_or_else(|| ApiError::BadRequest("end must be an RFC3339 timestamp".to_string()))?;
    if start > end {
        return Err(ApiError::BadRequest("start must not be after end".to_string()));
    }

    let users = repositories::users::list_created_between(
        state.db(),
        to_primitive_utc(start),
        to_primitive_utc(end),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to list users"))?;

    Ok(Json(users.into_iter().map(UserResponse::from_db).collect()))
}
