use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentAdmin;
use crate::api::pagination::PaginatedResponse;
use crate::api::validation::{clean_filter, validation_error};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::ExamRecord;
use crate::db::types::RecordStatus;
use crate::repositories;
use crate::repositories::exam_records::RecordFilter;
use crate::schemas::record::{RecordResponse, RecordScoreUpdate, StudentAnswerResponse};

#[derive(Debug, Deserialize)]
pub(super) struct ListRecordsQuery {
    #[serde(default)]
    skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    limit: i64,
    #[serde(default, alias = "examId")]
    exam_id: Option<String>,
    #[serde(default, alias = "studentName")]
    student_name: Option<String>,
    #[serde(default)]
    status: Option<RecordStatus>,
}

pub(super) async fn list_records(
    Query(params): Query<ListRecordsQuery>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<RecordResponse>>, ApiError> {
    let filter = RecordFilter {
        exam_id: clean_filter(params.exam_id.as_deref()),
        student_id: None,
        student_name: clean_filter(params.student_name.as_deref()),
        status: params.status,
    };

    let records =
        repositories::exam_records::list(state.db(), &filter, params.skip, params.limit)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list records"))?;
    let total_count = repositories::exam_records::count(state.db(), &filter)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count records"))?;

    Ok(Json(PaginatedResponse::new(
        records.into_iter().map(RecordResponse::from_joined).collect(),
        total_count,
        params.skip,
        params.limit,
    )))
}

pub(super) async fn get_record(
    Path(record_id): Path<String>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<RecordResponse>, ApiError> {
    let record = fetch_record(&state, &record_id).await?;
    Ok(Json(RecordResponse::from_db(record)))
}

pub(super) async fn list_record_answers(
    Path(record_id): Path<String>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<StudentAnswerResponse>>, ApiError> {
    fetch_record(&state, &record_id).await?;

    let answers = repositories::student_answers::list_by_record(state.db(), &record_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list answers"))?;

    Ok(Json(answers.into_iter().map(StudentAnswerResponse::from_db).collect()))
}

pub(super) async fn update_record_score(
    Path(record_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<RecordScoreUpdate>,
) -> Result<Json<RecordResponse>, ApiError> {
    payload.validate().map_err(validation_error)?;
    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let record = repositories::exam_records::lock_by_id(&mut *tx, &record_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to lock record"))?
        .ok_or_else(|| ApiError::NotFound("Record not found".to_string()))?;

    if !record.status.is_completed() {
        return Err(ApiError::BadRequest(
            "Only submitted or timed out records can be scored".to_string(),
        ));
    }
    if let Some(total) = record.total_score {
        if payload.score > total {
            return Err(ApiError::BadRequest(format!(
                "score must not exceed the exam total of {total}"
            )));
        }
    }

    let updated = repositories::exam_records::update_score(
        &mut *tx,
        &record_id,
        payload.score,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update record score"))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    tracing::info!(
        record_id = %record_id,
        admin_id = %admin.id,
        previous = record.score,
        score = updated.score,
        "Record score adjusted"
    );
    Ok(Json(RecordResponse::from_db(updated)))
}

pub(super) async fn reset_record(
    Path(record_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<RecordResponse>, ApiError> {
    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    repositories::exam_records::lock_by_id(&mut *tx, &record_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to lock record"))?
        .ok_or_else(|| ApiError::NotFound("Record not found".to_string()))?;

    let removed = repositories::student_answers::delete_by_record(&mut *tx, &record_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete answers"))?;
    let record = repositories::exam_records::reset(&mut *tx, &record_id, primitive_now_utc())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to reset record"))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    tracing::info!(record_id = %record_id, admin_id = %admin.id, removed, "Record reset");
    Ok(Json(RecordResponse::from_db(record)))
}

pub(super) async fn delete_record(
    Path(record_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    repositories::exam_records::lock_by_id(&mut *tx, &record_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to lock record"))?
        .ok_or_else(|| ApiError::NotFound("Record not found".to_string()))?;

    repositories::student_answers::delete_by_record(&mut *tx, &record_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete answers"))?;
    repositories::exam_records::delete(&mut *tx, &record_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete record"))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    tracing::info!(record_id = %record_id, admin_id = %admin.id, "Record deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_record(state: &AppState, record_id: &str) -> Result<ExamRecord, ApiError> {
    repositories::exam_records::find_by_id(state.db(), record_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch record"))?
        .ok_or_else(|| ApiError::NotFound("Record not found".to_string()))
}
