use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use time::PrimitiveDateTime;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentAdmin;
use crate::api::validation::validation_error;
use crate::core::state::AppState;
use crate::core::time::{primitive_now_utc, to_primitive_utc};
use crate::db::types::ExamStatus;
use crate::repositories;
use crate::schemas::exam::{ExamResponse, ExamStatusUpdate, ExamUpdate};
use crate::services::lifecycle::{self, ExamStatistics, ScheduleMode};

use super::super::helpers;

pub(in crate::api::exams) async fn get_exam(
    Path(exam_id): Path<String>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<ExamResponse>, ApiError> {
    let exam = helpers::fetch_exam(&state, &exam_id).await?;
    Ok(Json(helpers::exam_response(exam, primitive_now_utc())))
}

pub(in crate::api::exams) async fn update_exam(
    Path(exam_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<ExamUpdate>,
) -> Result<Json<ExamResponse>, ApiError> {
    payload.validate().map_err(validation_error)?;
    let existing = helpers::fetch_exam(&state, &exam_id).await?;

    let now = primitive_now_utc();
    let start_time: PrimitiveDateTime =
        payload.start_time.map(to_primitive_utc).unwrap_or(existing.start_time);
    let end_time: PrimitiveDateTime =
        payload.end_time.map(to_primitive_utc).unwrap_or(existing.end_time);
    let duration_minutes = payload.duration_minutes.unwrap_or(existing.duration_minutes);
    lifecycle::validate_schedule(
        start_time,
        end_time,
        duration_minutes,
        now,
        time::Duration::ZERO,
        ScheduleMode::Update,
    )?;

    let title = payload.title.as_deref().map(str::trim).unwrap_or(&existing.title);
    if title != existing.title {
        let taken = repositories::exams::title_taken(state.db(), title, Some(&exam_id))
            .await
            .map_err(|e| ApiError::internal(e, "Failed to check exam title"))?;
        if taken {
            return Err(ApiError::Conflict("An exam with this title already exists".to_string()));
        }
    }

    let exam = repositories::exams::update(
        state.db(),
        &exam_id,
        repositories::exams::ExamFields {
            title,
            description: payload.description.as_deref().or(existing.description.as_deref()),
            start_time,
            end_time,
            duration_minutes,
            pass_score: payload.pass_score.unwrap_or(existing.pass_score),
            status: payload.status.unwrap_or(existing.status),
        },
        now,
    )
    .await
    .map_err(|e| {
        ApiError::from_write(
            e,
            "An exam with this title already exists",
            "Failed to update exam",
        )
    })?
    .ok_or_else(|| ApiError::NotFound("Exam not found".to_string()))?;

    tracing::info!(exam_id = %exam.id, admin_id = %admin.id, "Exam updated");
    Ok(Json(helpers::exam_response(exam, now)))
}

pub(in crate::api::exams) async fn delete_exam(
    Path(exam_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    helpers::lock_exam(&mut tx, &exam_id).await?;

    let records = repositories::exam_records::count_by_exam(&mut *tx, &exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count exam records"))?;
    if records > 0 {
        return Err(ApiError::Conflict(
            "Exam has attempt records and cannot be deleted".to_string(),
        ));
    }

    let links = repositories::exam_questions::delete_by_exam(&mut *tx, &exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to remove exam questions"))?;
    repositories::exams::delete_by_id(&mut *tx, &exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete exam"))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    tracing::info!(exam_id = %exam_id, admin_id = %admin.id, links, "Exam deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub(in crate::api::exams) async fn update_exam_status(
    Path(exam_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<ExamStatusUpdate>,
) -> Result<Json<ExamResponse>, ApiError> {
    let now = primitive_now_utc();
    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let exam = helpers::lock_exam(&mut tx, &exam_id).await?;
    let submitted = if payload.status == ExamStatus::Finished {
        helpers::submit_open_records(&mut tx, &exam, now).await?
    } else {
        0
    };

    let exam = repositories::exams::update_status(&mut *tx, &exam_id, payload.status, now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to update exam status"))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    if payload.status == ExamStatus::Finished {
        metrics::counter!("exams_finished_total").increment(1);
    }
    tracing::info!(
        exam_id = %exam.id,
        admin_id = %admin.id,
        status = ?exam.status,
        submitted_records = submitted,
        "Exam status changed"
    );

    Ok(Json(helpers::exam_response(exam, now)))
}

pub(in crate::api::exams) async fn exam_statistics(
    Path(exam_id): Path<String>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<ExamStatistics>, ApiError> {
    let exam = helpers::fetch_exam(&state, &exam_id).await?;

    let samples = repositories::exam_records::samples_for_exam(state.db(), &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load exam records"))?;

    Ok(Json(lifecycle::exam_statistics(&samples, exam.pass_score)))
}
