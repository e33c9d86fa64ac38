use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentAdmin;
use crate::api::pagination::PaginatedResponse;
use crate::api::validation::clean_filter;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::repositories::exam_records::RecordFilter;
use crate::repositories::exams::ExamFilter;
use crate::schemas::exam::ExamResponse;
use crate::schemas::record::RecordResponse;

use super::super::helpers;
use super::super::queries::{ListExamRecordsQuery, ListExamsQuery, SortDirection};

pub(in crate::api::exams) async fn list_exams(
    Query(params): Query<ListExamsQuery>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<ExamResponse>>, ApiError> {
    let filter = ExamFilter {
        title: clean_filter(params.title.as_deref()),
        status: params.status,
        created_by: clean_filter(params.created_by.as_deref()),
    };
    let descending = matches!(params.sort_dir, SortDirection::Desc);

    let exams = repositories::exams::list(
        state.db(),
        &filter,
        params.sort_by,
        descending,
        params.skip,
        params.limit,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to list exams"))?;
    let total_count = repositories::exams::count(state.db(), &filter)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count exams"))?;

    let now = primitive_now_utc();
    Ok(Json(PaginatedResponse::new(
        exams.into_iter().map(|exam| helpers::exam_response(exam, now)).collect(),
        total_count,
        params.skip,
        params.limit,
    )))
}

pub(in crate::api::exams) async fn list_active_exams(
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<ExamResponse>>, ApiError> {
    let now = primitive_now_utc();
    let exams = repositories::exams::list_active(state.db(), now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list active exams"))?;
    Ok(Json(exams.into_iter().map(|exam| helpers::exam_response(exam, now)).collect()))
}

pub(in crate::api::exams) async fn list_upcoming_exams(
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<ExamResponse>>, ApiError> {
    let now = primitive_now_utc();
    let exams = repositories::exams::list_upcoming(state.db(), now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list upcoming exams"))?;
    Ok(Json(exams.into_iter().map(|exam| helpers::exam_response(exam, now)).collect()))
}

pub(in crate::api::exams) async fn list_finished_exams(
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<ExamResponse>>, ApiError> {
    let now = primitive_now_utc();
    let exams = repositories::exams::list_finished(state.db(), now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list finished exams"))?;
    Ok(Json(exams.into_iter().map(|exam| helpers::exam_response(exam, now)).collect()))
}

pub(in crate::api::exams) async fn list_exam_records(
    Path(exam_id): Path<String>,
    Query(params): Query<ListExamRecordsQuery>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<RecordResponse>>, ApiError> {
    helpers::fetch_exam(&state, &exam_id).await?;

    let filter = RecordFilter {
        exam_id: Some(&exam_id),
        status: params.status,
        ..RecordFilter::default()
    };
    let records =
        repositories::exam_records::list(state.db(), &filter, params.skip, params.limit)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list exam records"))?;
    let total_count = repositories::exam_records::count(state.db(), &filter)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count exam records"))?;

    Ok(Json(PaginatedResponse::new(
        records.into_iter().map(RecordResponse::from_joined).collect(),
        total_count,
        params.skip,
        params.limit,
    )))
}
