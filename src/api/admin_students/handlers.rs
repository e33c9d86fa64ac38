use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentAdmin;
use crate::api::pagination::PaginatedResponse;
use crate::api::validation::{clean_filter, validate_password_len, validation_error};
use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::ActiveStatus;
use crate::repositories;
use crate::repositories::students::{StudentFacet, StudentFilter};
use crate::schemas::student::{
    BatchDeleteRequest, BatchDeleteResponse, StudentCreate, StudentResponse,
    StudentStatisticsResponse,
};
use crate::schemas::user::StatusUpdate;

#[derive(Debug, Deserialize)]
pub(super) struct ListStudentsQuery {
    #[serde(default)]
    skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    limit: i64,
    #[serde(default)]
    keyword: Option<String>,
    #[serde(default)]
    status: Option<ActiveStatus>,
    #[serde(default, alias = "className")]
    class_name: Option<String>,
    #[serde(default)]
    major: Option<String>,
}

pub(super) async fn list_students(
    Query(params): Query<ListStudentsQuery>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<StudentResponse>>, ApiError> {
    let filter = StudentFilter {
        keyword: clean_filter(params.keyword.as_deref()),
        status: params.status,
        class_name: clean_filter(params.class_name.as_deref()),
        major: clean_filter(params.major.as_deref()),
    };

    let students = repositories::students::list(state.db(), &filter, params.skip, params.limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list students"))?;
    let total_count = repositories::students::count(state.db(), &filter)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count students"))?;

    Ok(Json(PaginatedResponse::new(
        students.into_iter().map(StudentResponse::from_db).collect(),
        total_count,
        params.skip,
        params.limit,
    )))
}

pub(super) async fn create_student(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<StudentCreate>,
) -> Result<(StatusCode, Json<StudentResponse>), ApiError> {
    payload.validate().map_err(validation_error)?;
    validate_password_len(&payload.password)?;

    let student_number = payload.student_number.trim();
    let number_taken = repositories::students::student_number_exists(state.db(), student_number)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check student number"))?;
    if number_taken {
        return Err(ApiError::Conflict("Student number already exists".to_string()));
    }

    let email = clean_filter(payload.email.as_deref());
    if let Some(email) = email {
        let email_taken = repositories::students::email_exists(state.db(), email)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to check email"))?;
        if email_taken {
            return Err(ApiError::Conflict("Email already exists".to_string()));
        }
    }

    let hashed_password = security::hash_password(&payload.password)
        .map_err(|e| ApiError::internal(e, "Failed to hash password"))?;

    let student = repositories::students::create(
        state.db(),
        repositories::students::CreateStudent {
            id: &Uuid::new_v4().to_string(),
            student_number,
            name: payload.name.trim(),
            hashed_password,
            email,
            phone: clean_filter(payload.phone.as_deref()),
            class_name: clean_filter(payload.class_name.as_deref()),
            major: clean_filter(payload.major.as_deref()),
            grade: clean_filter(payload.grade.as_deref()),
            status: payload.status,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| {
        ApiError::from_write(
            e,
            "Student number or email already exists",
            "Failed to create student",
        )
    })?;

    tracing::info!(student_id = %student.id, admin_id = %admin.id, "Student created");
    Ok((StatusCode::CREATED, Json(StudentResponse::from_db(student))))
}

pub(super) async fn get_student(
    Path(student_id): Path<String>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<StudentResponse>, ApiError> {
    let student = repositories::students::find_by_id(state.db(), &student_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch student"))?
        .ok_or_else(|| ApiError::NotFound("Student not found".to_string()))?;

    Ok(Json(StudentResponse::from_db(student)))
}

pub(super) async fn update_student_status(
    Path(student_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<StatusUpdate>,
) -> Result<Json<StudentResponse>, ApiError> {
    let student = repositories::students::update_status(
        state.db(),
        &student_id,
        payload.status,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update student status"))?
    .ok_or_else(|| ApiError::NotFound("Student not found".to_string()))?;

    tracing::info!(
        student_id = %student.id,
        admin_id = %admin.id,
        status = ?student.status,
        "Student status changed"
    );
    Ok(Json(StudentResponse::from_db(student)))
}

pub(super) async fn delete_student(
    Path(student_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let deleted = repositories::students::delete(state.db(), &student_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete student"))?;
    if !deleted {
        return Err(ApiError::NotFound("Student not found".to_string()));
    }

    tracing::info!(student_id = %student_id, admin_id = %admin.id, "Student deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn batch_delete_students(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<BatchDeleteRequest>,
) -> Result<Json<BatchDeleteResponse>, ApiError> {
    payload.validate().map_err(validation_error)?;

    let deleted = repositories::students::delete_many(state.db(), &payload.ids)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete students"))?;

    tracing::info!(
        admin_id = %admin.id,
        requested = payload.ids.len(),
        deleted,
        "Students deleted in batch"
    );
    Ok(Json(BatchDeleteResponse { deleted }))
}

pub(super) async fn student_statistics(
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<StudentStatisticsResponse>, ApiError> {
    let stats = repositories::students::statistics(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load student statistics"))?;

    Ok(Json(StudentStatisticsResponse {
        total: stats.total,
        active: stats.active,
        inactive: stats.inactive,
    }))
}

pub(super) async fn list_classes(
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, ApiError> {
    facet_values(&state, StudentFacet::ClassName).await
}

pub(super) async fn list_majors(
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, ApiError> {
    facet_values(&state, StudentFacet::Major).await
}

pub(super) async fn list_grades(
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, ApiError> {
    facet_values(&state, StudentFacet::Grade).await
}

async fn facet_values(state: &AppState, facet: StudentFacet) -> Result<Json<Vec<String>>, ApiError> {
    repositories::students::distinct_values(state.db(), facet)
        .await
        .map(Json)
        .map_err(|e| ApiError::internal(e, "Failed to list student attributes"))
}
