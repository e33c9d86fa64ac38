use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentAdmin;
use crate::api::pagination::PaginatedResponse;
use crate::api::validation::{clean_filter, validation_error};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::Question;
use crate::repositories;
use crate::repositories::questions::{QuestionFields, QuestionFilter};
use crate::schemas::question::{
    non_empty_list, non_empty_value, QuestionCreate, QuestionInfoResponse, QuestionResponse,
    QuestionStatsResponse, QuestionUpdate,
};

use super::queries::ListQuestionsQuery;

pub(super) async fn list_questions(
    Query(params): Query<ListQuestionsQuery>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<QuestionResponse>>, ApiError> {
    let filter = QuestionFilter {
        keyword: clean_filter(params.keyword.as_deref()),
        question_type: params.question_type,
        difficulty: params.difficulty,
        status: params.status,
    };

    let questions = repositories::questions::list(state.db(), &filter, params.skip, params.limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list questions"))?;
    let total_count = repositories::questions::count(state.db(), &filter)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count questions"))?;

    Ok(Json(PaginatedResponse::new(
        questions.into_iter().map(QuestionResponse::from_db).collect(),
        total_count,
        params.skip,
        params.limit,
    )))
}

pub(super) async fn create_question(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<QuestionCreate>,
) -> Result<(StatusCode, Json<QuestionResponse>), ApiError> {
    payload.validate().map_err(validation_error)?;
    let title = payload.title.trim();

    let taken = repositories::questions::title_taken(state.db(), title, None)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check question title"))?;
    if taken {
        return Err(ApiError::Conflict("A question with this title already exists".to_string()));
    }

    let question = repositories::questions::create(
        state.db(),
        &Uuid::new_v4().to_string(),
        QuestionFields {
            title,
            content: &payload.content,
            question_type: payload.question_type,
            difficulty: payload.difficulty,
            options: non_empty_list(payload.options),
            correct_answers: non_empty_value(payload.correct_answers),
            correct_answer: payload.correct_answer.as_deref().filter(|value| !value.is_empty()),
            tags: non_empty_list(payload.tags),
            status: payload.status,
        },
        &admin.id,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| {
        ApiError::from_write(
            e,
            "A question with this title already exists",
            "Failed to create question",
        )
    })?;

    tracing::info!(question_id = %question.id, admin_id = %admin.id, "Question created");
    Ok((StatusCode::CREATED, Json(QuestionResponse::from_db(question))))
}

pub(super) async fn get_question(
    Path(question_id): Path<String>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<QuestionResponse>, ApiError> {
    let question = fetch_question(&state, &question_id).await?;
    Ok(Json(QuestionResponse::from_db(question)))
}

pub(super) async fn update_question(
    Path(question_id): Path<String>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<QuestionUpdate>,
) -> Result<Json<QuestionResponse>, ApiError> {
    payload.validate().map_err(validation_error)?;
    let existing = fetch_question(&state, &question_id).await?;

    let title = payload.title.as_deref().map(str::trim).unwrap_or(&existing.title);
    if title != existing.title {
        let taken = repositories::questions::title_taken(state.db(), title, Some(&question_id))
            .await
            .map_err(|e| ApiError::internal(e, "Failed to check question title"))?;
        if taken {
            return Err(ApiError::Conflict(
                "A question with this title already exists".to_string(),
            ));
        }
    }

    let options = match payload.options {
        Some(options) => non_empty_list(Some(options)),
        None => existing.options.clone().map(|json| json.0),
    };
    let correct_answers = match payload.correct_answers {
        Some(value) => non_empty_value(Some(value)),
        None => existing.correct_answers.clone().map(|json| json.0),
    };
    let tags = match payload.tags {
        Some(tags) => non_empty_list(Some(tags)),
        None => existing.tags.clone().map(|json| json.0),
    };
    let correct_answer = match payload.correct_answer.as_deref() {
        Some(value) => Some(value).filter(|value| !value.is_empty()),
        None => existing.correct_answer.as_deref(),
    };

    let question = repositories::questions::update(
        state.db(),
        &question_id,
        QuestionFields {
            title,
            content: payload.content.as_deref().unwrap_or(&existing.content),
            question_type: payload.question_type.unwrap_or(existing.question_type),
            difficulty: payload.difficulty.unwrap_or(existing.difficulty),
            options,
            correct_answers,
            correct_answer,
            tags,
            status: payload.status.unwrap_or(existing.status),
        },
        primitive_now_utc(),
    )
    .await
    .map_err(|e| {
        ApiError::from_write(
            e,
            "A question with this title already exists",
            "Failed to update question",
        )
    })?
    .ok_or_else(|| ApiError::NotFound("Question not found".to_string()))?;

    Ok(Json(QuestionResponse::from_db(question)))
}

pub(super) async fn delete_question(
    Path(question_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    fetch_question(&state, &question_id).await?;

    let links = repositories::questions::count_exam_links(state.db(), &question_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check exam links"))?;
    if links > 0 {
        return Err(ApiError::Conflict(
            "Question is used by an exam; remove it from the exam first".to_string(),
        ));
    }

    let deleted = repositories::questions::delete(state.db(), &question_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete question"))?;
    if !deleted {
        return Err(ApiError::NotFound("Question not found".to_string()));
    }

    tracing::info!(question_id = %question_id, admin_id = %admin.id, "Question deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn question_stats(
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<QuestionStatsResponse>, ApiError> {
    Ok(Json(load_question_stats(&state).await?))
}

pub(super) async fn question_info(
    Path(question_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<QuestionInfoResponse>, ApiError> {
    let question = fetch_question(&state, &question_id).await?;
    Ok(Json(QuestionInfoResponse::from_db(question)))
}

pub(crate) async fn load_question_stats(
    state: &AppState,
) -> Result<QuestionStatsResponse, ApiError> {
    let total = repositories::questions::count_all(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count questions"))?;
    let by_type = repositories::questions::count_by_type(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count questions by type"))?;
    let by_difficulty = repositories::questions::count_by_difficulty(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count questions by difficulty"))?;

    Ok(QuestionStatsResponse {
        total,
        by_type: by_type
            .into_iter()
            .map(|row| (row.question_type.as_str().to_string(), row.count))
            .collect(),
        by_difficulty: by_difficulty
            .into_iter()
            .map(|row| (row.difficulty.as_str().to_string(), row.count))
            .collect(),
    })
}

async fn fetch_question(state: &AppState, question_id: &str) -> Result<Question, ApiError> {
    repositories::questions::find_by_id(state.db(), question_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch question"))?
        .ok_or_else(|| ApiError::NotFound("Question not found".to_string()))
}
