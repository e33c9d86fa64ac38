use axum::{extract::State, routing::get, Json, Router};

use crate::api::errors::ApiError;
use crate::api::exams::exam_response;
use crate::api::guards::CurrentAdmin;
use crate::api::questions::load_question_stats;
use crate::core::state::AppState;
use crate::core::time::{days_before, primitive_now_utc, start_of_day};
use crate::repositories;
use crate::schemas::dashboard::{
    ActivityResponse, DashboardStatsResponse, ExamStatsResponse, RecentActivitiesResponse,
    UserStatsResponse,
};
use crate::schemas::question::QuestionStatsResponse;
use crate::services::lifecycle::{percentage, round1};

const RECENT_EXAMS: i64 = 5;
const RECENT_ACTIVITIES: i64 = 10;
const ACTIVE_STUDENT_DAYS: i64 = 7;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/stats", get(stats))
        .route("/user-stats", get(user_stats))
        .route("/exam-stats", get(exam_stats))
        .route("/question-stats", get(question_stats))
        .route("/recent-activities", get(recent_activities))
}

async fn stats(
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<DashboardStatsResponse>, ApiError> {
    let db = state.db();
    let admin_count = repositories::users::count(db, None, None)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count administrators"))?;
    let students = repositories::students::statistics(db)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count students"))?;
    let exams = repositories::exams::counts(db, primitive_now_utc())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count exams"))?;
    let question_count = repositories::questions::count_all(db)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count questions"))?;
    let records = repositories::dashboard::record_totals(db)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to aggregate records"))?;

    Ok(Json(DashboardStatsResponse {
        admin_count,
        student_count: students.total,
        exam_count: exams.total,
        question_count,
        record_count: records.total,
        active_exam_count: exams.enabled,
        completed_record_count: records.completed,
        completion_rate: round1(percentage(records.completed, records.total)),
        average_score: round1(records.average_score.unwrap_or(0.0)),
    }))
}

async fn user_stats(
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<UserStatsResponse>, ApiError> {
    let admin_count = repositories::users::count(state.db(), None, None)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count administrators"))?;
    let students = repositories::students::statistics(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count students"))?;
    let since = days_before(primitive_now_utc(), ACTIVE_STUDENT_DAYS);
    let active_students = repositories::students::count_active_since(state.db(), since)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count active students"))?;

    Ok(Json(UserStatsResponse {
        admin_count,
        student_count: students.total,
        active_students,
        activity_rate: round1(percentage(active_students, students.total)),
    }))
}

async fn exam_stats(
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<ExamStatsResponse>, ApiError> {
    let now = primitive_now_utc();
    let counts = repositories::exams::counts(state.db(), now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count exams"))?;
    let recent = repositories::exams::list_recent(state.db(), RECENT_EXAMS)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list recent exams"))?;

    Ok(Json(ExamStatsResponse {
        total: counts.total,
        pending: counts.pending,
        active: counts.in_window,
        finished: counts.finished,
        recent_exams: recent.into_iter().map(|exam| exam_response(exam, now)).collect(),
    }))
}

async fn question_stats(
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<QuestionStatsResponse>, ApiError> {
    Ok(Json(load_question_stats(&state).await?))
}

async fn recent_activities(
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<RecentActivitiesResponse>, ApiError> {
    let activities = repositories::dashboard::recent_activities(state.db(), RECENT_ACTIVITIES)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list recent activities"))?;
    let today = repositories::dashboard::record_totals_since(
        state.db(),
        start_of_day(primitive_now_utc()),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to aggregate today's records"))?;

    Ok(Json(RecentActivitiesResponse {
        activities: activities.into_iter().map(ActivityResponse::from_db).collect(),
        today_count: today.started,
        today_completed: today.completed,
    }))
}
