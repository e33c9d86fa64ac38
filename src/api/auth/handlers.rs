use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentAdmin;
use crate::api::validation::validation_error;
use crate::core::redis::login_attempt_key;
use crate::core::security::{self, Principal};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::ActiveStatus;
use crate::repositories;
use crate::schemas::auth::{AdminLogin, AvailabilityResponse, StudentLogin, TokenResponse};
use crate::schemas::student::StudentResponse;
use crate::schemas::user::UserResponse;

#[derive(Debug, Deserialize)]
pub(super) struct UsernameQuery {
    username: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct EmailQuery {
    email: String,
}

pub(super) async fn admin_login(
    State(state): State<AppState>,
    Json(payload): Json<AdminLogin>,
) -> Result<Json<TokenResponse<UserResponse>>, ApiError> {
    payload.validate().map_err(validation_error)?;
    let identifier = payload.username.trim();
    enforce_login_rate(&state, "admin", identifier).await?;

    let user = repositories::users::find_by_login(state.db(), identifier)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load user"))?
        .ok_or(ApiError::Unauthorized("Incorrect username or password"))?;

    let verified = security::verify_password(&payload.password, &user.hashed_password)
        .map_err(|_| ApiError::Unauthorized("Incorrect username or password"))?;
    if !verified {
        return Err(ApiError::Unauthorized("Incorrect username or password"));
    }

    if user.status != ActiveStatus::Enabled {
        return Err(ApiError::Forbidden("Account is disabled"));
    }

    let token = security::create_access_token(&user.id, Principal::Admin, state.settings(), None)
        .map_err(|e| ApiError::internal(e, "Failed to create access token"))?;

    repositories::users::touch_last_login(state.db(), &user.id, primitive_now_utc())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to record login"))?;

    forget_login_attempts(&state, "admin", identifier).await;
    tracing::info!(user_id = %user.id, "Administrator logged in");
    Ok(Json(TokenResponse::bearer(token, UserResponse::from_db(user))))
}

pub(super) async fn student_login(
    State(state): State<AppState>,
    Json(payload): Json<StudentLogin>,
) -> Result<Json<TokenResponse<StudentResponse>>, ApiError> {
    payload.validate().map_err(validation_error)?;
    let identifier = payload.identifier.trim();
    enforce_login_rate(&state, "student", identifier).await?;

    let student = repositories::students::find_by_login(state.db(), identifier)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load student"))?
        .ok_or(ApiError::Unauthorized("Incorrect student number or password"))?;

    let verified = security::verify_password(&payload.password, &student.hashed_password)
        .map_err(|_| ApiError::Unauthorized("Incorrect student number or password"))?;
    if !verified {
        return Err(ApiError::Unauthorized("Incorrect student number or password"));
    }

    if student.status != ActiveStatus::Enabled {
        return Err(ApiError::Forbidden("Account is disabled"));
    }

    let token =
        security::create_access_token(&student.id, Principal::Student, state.settings(), None)
            .map_err(|e| ApiError::internal(e, "Failed to create access token"))?;

    let now = primitive_now_utc();
    repositories::students::touch_last_login(state.db(), &student.id, now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to record login"))?;

    let mut student = student;
    student.last_login_at = Some(now);

    forget_login_attempts(&state, "student", identifier).await;
    tracing::info!(student_id = %student.id, "Student logged in");
    Ok(Json(TokenResponse::bearer(token, StudentResponse::from_db(student))))
}

pub(super) async fn check_username(
    State(state): State<AppState>,
    Query(query): Query<UsernameQuery>,
) -> Result<Json<AvailabilityResponse>, ApiError> {
    let username = query.username.trim();
    if username.is_empty() {
        return Err(ApiError::BadRequest("username must not be empty".to_string()));
    }

    let taken = repositories::users::username_exists(state.db(), username)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check username"))?;

    Ok(Json(AvailabilityResponse { available: !taken }))
}

pub(super) async fn check_email(
    State(state): State<AppState>,
    Query(query): Query<EmailQuery>,
) -> Result<Json<AvailabilityResponse>, ApiError> {
    let email = query.email.trim();
    if email.is_empty() {
        return Err(ApiError::BadRequest("email must not be empty".to_string()));
    }

    let taken = repositories::users::email_exists(state.db(), email)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check email"))?;

    Ok(Json(AvailabilityResponse { available: !taken }))
}

/// Tokens are stateless; the client drops its copy.
pub(super) async fn logout() -> StatusCode {
    StatusCode::NO_CONTENT
}

pub(super) async fn me(CurrentAdmin(user): CurrentAdmin) -> Json<UserResponse> {
    Json(UserResponse::from_db(user))
}

async fn enforce_login_rate(
    state: &AppState,
    scope: &str,
    identifier: &str,
) -> Result<(), ApiError> {
    let auth = state.settings().auth();
    let rate_key = login_attempt_key(scope, identifier);

    let allowed = match state
        .redis()
        .rate_limit(&rate_key, auth.login_max_attempts, auth.login_window_seconds)
        .await
    {
        Ok(allowed) => allowed,
        Err(err) => {
            tracing::warn!(error = %err, "Login rate limiter unavailable; skipping");
            true
        }
    };

    if allowed {
        Ok(())
    } else {
        Err(ApiError::TooManyRequests("Too many login attempts, try again later"))
    }
}

async fn forget_login_attempts(state: &AppState, scope: &str, identifier: &str) {
    if let Err(err) = state.redis().clear_counter(&login_attempt_key(scope, identifier)).await {
        tracing::warn!(error = %err, "Failed to clear login attempts");
    }
}
