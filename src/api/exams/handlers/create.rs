use axum::{extract::State, http::StatusCode, Json};
use time::Duration;
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentAdmin;
use crate::api::validation::validation_error;
use crate::core::state::AppState;
use crate::core::time::{primitive_now_utc, to_primitive_utc};
use crate::repositories;
use crate::schemas::exam::{ExamCreate, ExamResponse};
use crate::services::lifecycle::{self, ScheduleMode};

use super::super::helpers;

pub(in crate::api::exams) async fn create_exam(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<ExamCreate>,
) -> Result<(StatusCode, Json<ExamResponse>), ApiError> {
    payload.validate().map_err(validation_error)?;

    let now = primitive_now_utc();
    let start_time = to_primitive_utc(payload.start_time);
    let end_time = to_primitive_utc(payload.end_time);
    let grace = Duration::seconds(state.settings().exam().start_grace_seconds as i64);
    lifecycle::validate_schedule(
        start_time,
        end_time,
        payload.duration_minutes,
        now,
        grace,
        ScheduleMode::Create,
    )?;

    let title = payload.title.trim();
    let taken = repositories::exams::title_taken(state.db(), title, None)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check exam title"))?;
    if taken {
        return Err(ApiError::Conflict("An exam with this title already exists".to_string()));
    }

    let exam = repositories::exams::create(
        state.db(),
        &Uuid::new_v4().to_string(),
        repositories::exams::ExamFields {
            title,
            description: payload.description.as_deref(),
            start_time,
            end_time,
            duration_minutes: payload.duration_minutes,
            pass_score: payload.pass_score,
            status: payload.status,
        },
        payload.total_score,
        &admin.id,
        now,
    )
    .await
    .map_err(|e| {
        ApiError::from_write(
            e,
            "An exam with this title already exists",
            "Failed to create exam",
        )
    })?;

    tracing::info!(
        exam_id = %exam.id,
        admin_id = %admin.id,
        start_time = %exam.start_time,
        end_time = %exam.end_time,
        "Exam created"
    );

    Ok((StatusCode::CREATED, Json(helpers::exam_response(exam, now))))
}
