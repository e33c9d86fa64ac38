use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentAdmin;
use crate::api::validation::validation_error;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::exam::{
    ExamQuestionAdd, ExamQuestionResponse, ExamQuestionScoreUpdate, DEFAULT_QUESTION_SCORE,
};

use super::super::helpers;

type Tx<'a> = sqlx::Transaction<'a, sqlx::Postgres>;

pub(in crate::api::exams) async fn list_exam_questions(
    Path(exam_id): Path<String>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<ExamQuestionResponse>>, ApiError> {
    helpers::fetch_exam(&state, &exam_id).await?;

    let details = repositories::exam_questions::list_details(state.db(), &exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list exam questions"))?;

    Ok(Json(details.into_iter().map(ExamQuestionResponse::from_db).collect()))
}

pub(in crate::api::exams) async fn add_exam_question(
    Path(exam_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<ExamQuestionAdd>,
) -> Result<(StatusCode, Json<ExamQuestionResponse>), ApiError> {
    payload.validate().map_err(validation_error)?;

    repositories::questions::find_by_id(state.db(), &payload.question_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch question"))?
        .ok_or_else(|| ApiError::NotFound("Question not found".to_string()))?;

    let now = primitive_now_utc();
    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;
    helpers::lock_exam(&mut tx, &exam_id).await?;

    let question_order = match payload.question_order {
        Some(order) => order,
        None => repositories::exam_questions::next_order(&mut *tx, &exam_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to compute question order"))?,
    };

    let link = repositories::exam_questions::create(
        &mut *tx,
        repositories::exam_questions::CreateExamQuestion {
            id: &Uuid::new_v4().to_string(),
            exam_id: &exam_id,
            question_id: &payload.question_id,
            question_order,
            score: payload.score.unwrap_or(DEFAULT_QUESTION_SCORE),
            created_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to add exam question"))?
    .ok_or_else(|| ApiError::Conflict("Question is already part of this exam".to_string()))?;

    let response = refresh_and_describe(&mut tx, &exam_id, &link.question_id).await?;
    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    tracing::info!(
        exam_id = %exam_id,
        question_id = %link.question_id,
        admin_id = %admin.id,
        question_order,
        "Question added to exam"
    );
    Ok((StatusCode::CREATED, Json(response)))
}

pub(in crate::api::exams) async fn remove_exam_question(
    Path((exam_id, question_id)): Path<(String, String)>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let now = primitive_now_utc();
    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let exam = helpers::lock_exam(&mut tx, &exam_id).await?;
    if exam.start_time <= now {
        return Err(ApiError::Conflict(
            "Questions cannot be removed after the exam has started".to_string(),
        ));
    }

    let link = find_link(&mut tx, &exam_id, &question_id).await?;
    repositories::exam_questions::delete(&mut *tx, &link.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to remove exam question"))?;
    repositories::exam_questions::shift_orders_after(&mut *tx, &exam_id, link.question_order)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to reorder exam questions"))?;
    repositories::exams::refresh_totals(&mut *tx, &exam_id, now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to refresh exam totals"))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    tracing::info!(
        exam_id = %exam_id,
        question_id = %question_id,
        admin_id = %admin.id,
        "Question removed from exam"
    );
    Ok(StatusCode::NO_CONTENT)
}

pub(in crate::api::exams) async fn update_exam_question_score(
    Path((exam_id, question_id)): Path<(String, String)>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<ExamQuestionScoreUpdate>,
) -> Result<Json<ExamQuestionResponse>, ApiError> {
    payload.validate().map_err(validation_error)?;

    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;
    helpers::lock_exam(&mut tx, &exam_id).await?;

    let link = find_link(&mut tx, &exam_id, &question_id).await?;
    repositories::exam_questions::update_score(&mut *tx, &link.id, payload.score)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to update question score"))?;

    let response = refresh_and_describe(&mut tx, &exam_id, &question_id).await?;
    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    Ok(Json(response))
}

async fn find_link(
    tx: &mut Tx<'_>,
    exam_id: &str,
    question_id: &str,
) -> Result<crate::db::models::ExamQuestion, ApiError> {
    repositories::exam_questions::find(&mut **tx, exam_id, question_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam question"))?
        .ok_or_else(|| ApiError::NotFound("Question is not part of this exam".to_string()))
}

/// Recomputes the exam totals and returns the joined view of one link.
async fn refresh_and_describe(
    tx: &mut Tx<'_>,
    exam_id: &str,
    question_id: &str,
) -> Result<ExamQuestionResponse, ApiError> {
    repositories::exams::refresh_totals(&mut **tx, exam_id, primitive_now_utc())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to refresh exam totals"))?;

    let details = repositories::exam_questions::list_details(&mut **tx, exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list exam questions"))?;

    details
        .into_iter()
        .find(|detail| detail.question_id == question_id)
        .map(ExamQuestionResponse::from_db)
        .ok_or_else(|| ApiError::NotFound("Question is not part of this exam".to_string()))
}
