use time::PrimitiveDateTime;

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::db::models::Exam;
use crate::repositories;
use crate::schemas::exam::ExamResponse;
use crate::services::lifecycle;
use crate::services::record_finalize::{finalize_record, FinalizeMode};

pub(crate) fn exam_response(exam: Exam, now: PrimitiveDateTime) -> ExamResponse {
    let phase = lifecycle::exam_phase(&exam, now);
    ExamResponse::from_db(exam, phase)
}

pub(super) async fn fetch_exam(state: &AppState, exam_id: &str) -> Result<Exam, ApiError> {
    repositories::exams::find_by_id(state.db(), exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam"))?
        .ok_or_else(|| ApiError::NotFound("Exam not found".to_string()))
}

pub(super) async fn lock_exam(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    exam_id: &str,
) -> Result<Exam, ApiError> {
    repositories::exams::lock_by_id(&mut **tx, exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to lock exam"))?
        .ok_or_else(|| ApiError::NotFound("Exam not found".to_string()))
}

/// Submits every in-progress attempt of `exam` with whatever answers were saved.
pub(super) async fn submit_open_records(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    exam: &Exam,
    now: PrimitiveDateTime,
) -> Result<usize, ApiError> {
    let records = repositories::exam_records::list_in_progress_for_exam(&mut **tx, &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load open records"))?;

    for record in &records {
        finalize_record(tx, exam, record, None, FinalizeMode::Submit, now).await?;
    }

    Ok(records.len())
}
