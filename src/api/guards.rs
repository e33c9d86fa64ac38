use async_trait::async_trait;
use axum::extract::{FromRequestParts, State};
use axum::http::{header, request::Parts};

use crate::api::errors::ApiError;
use crate::core::security::{self, Claims, Principal};
use crate::core::state::AppState;
use crate::db::models::{Student, User};
use crate::db::types::ActiveStatus;
use crate::repositories;

pub(crate) struct CurrentAdmin(pub(crate) User);
pub(crate) struct CurrentStudent(pub(crate) Student);

async fn bearer_claims(parts: &mut Parts, state: &AppState) -> Result<(AppState, Claims), ApiError> {
    let State(app_state) = State::<AppState>::from_request_parts(parts, state)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to access application state"))?;

    let auth_header = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(ApiError::Unauthorized("Invalid authentication credentials"))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(ApiError::Unauthorized("Invalid authentication credentials"))?;

    let claims = security::verify_token(token, app_state.settings())
        .map_err(|_| ApiError::Unauthorized("Invalid authentication credentials"))?;

    Ok((app_state, claims))
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let (app_state, claims) = bearer_claims(parts, state).await?;
        if claims.role != Principal::Admin {
            return Err(ApiError::Forbidden("Admin access required"));
        }

        let user = repositories::users::find_by_id(app_state.db(), &claims.sub)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load user"))?;

        let Some(user) = user else {
            return Err(ApiError::Unauthorized("User not found"));
        };

        if user.status != ActiveStatus::Enabled {
            return Err(ApiError::Unauthorized("Invalid authentication credentials"));
        }

        Ok(CurrentAdmin(user))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentStudent {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let (app_state, claims) = bearer_claims(parts, state).await?;
        if claims.role != Principal::Student {
            return Err(ApiError::Forbidden("Student access required"));
        }

        let student = repositories::students::find_by_id(app_state.db(), &claims.sub)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load student"))?;

        let Some(student) = student else {
            return Err(ApiError::Unauthorized("Student not found"));
        };

        if student.status != ActiveStatus::Enabled {
            return Err(ApiError::Unauthorized("Invalid authentication credentials"));
        }

        Ok(CurrentStudent(student))
    }
}
