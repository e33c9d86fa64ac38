use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::exams::exam_response;
use crate::api::guards::CurrentStudent;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{Exam, ExamRecord, Student};
use crate::db::types::RecordStatus;
use crate::repositories;
use crate::repositories::exam_records::{CreateRecord, RecordFilter};
use crate::schemas::exam::{ExamResponse, PaperQuestionResponse};
use crate::schemas::record::{RecordResponse, StudentAnswerResponse, SubmitExamRequest};
use crate::schemas::student::StudentResponse;
use crate::services::grading;
use crate::services::lifecycle::{self, RecordEvent};
use crate::services::record_finalize::{finalize_record, FinalizeMode};

const MAX_USER_AGENT_LEN: usize = 500;

#[derive(Debug, Deserialize)]
pub(super) struct RecentRecordsQuery {
    #[serde(default = "default_recent_limit")]
    limit: i64,
}

fn default_recent_limit() -> i64 {
    5
}

pub(super) async fn me(CurrentStudent(student): CurrentStudent) -> Json<StudentResponse> {
    Json(StudentResponse::from_db(student))
}

pub(super) async fn available_exams(
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<Vec<ExamResponse>>, ApiError> {
    let now = primitive_now_utc();
    let exams = repositories::exams::list_available_for_student(state.db(), &student.id, now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list available exams"))?;
    Ok(Json(exams.into_iter().map(|exam| exam_response(exam, now)).collect()))
}

pub(super) async fn participated_exams(
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<Vec<ExamResponse>>, ApiError> {
    let now = primitive_now_utc();
    let exams = repositories::exams::list_participated_by_student(state.db(), &student.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list participated exams"))?;
    Ok(Json(exams.into_iter().map(|exam| exam_response(exam, now)).collect()))
}

pub(super) async fn exam_paper(
    Path(exam_id): Path<String>,
    CurrentStudent(_student): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<Vec<PaperQuestionResponse>>, ApiError> {
    let exam = fetch_exam(&state, &exam_id).await?;
    lifecycle::ensure_in_progress(&exam, primitive_now_utc())?;

    let details = repositories::exam_questions::list_details(state.db(), &exam.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load exam questions"))?;

    Ok(Json(details.into_iter().map(PaperQuestionResponse::from_db).collect()))
}

pub(super) async fn start_exam(
    Path(exam_id): Path<String>,
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RecordResponse>, ApiError> {
    let now = primitive_now_utc();
    let exam = fetch_exam(&state, &exam_id).await?;
    lifecycle::ensure_in_progress(&exam, now)?;

    let client = ClientInfo::from_headers(&headers);
    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let record = find_or_create_record(&mut tx, &exam, &student, None, &client).await?;
    let record = match record.status {
        RecordStatus::InProgress => record,
        status => {
            lifecycle::transition(status, RecordEvent::Start)?;
            repositories::exam_records::mark_started(
                &mut *tx,
                &record.id,
                now,
                client.ip_address.as_deref(),
                client.user_agent.as_deref(),
            )
            .await
            .map_err(|e| ApiError::internal(e, "Failed to start exam"))?
        }
    };

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    tracing::info!(
        record_id = %record.id,
        exam_id = %exam.id,
        student_id = %student.id,
        "Exam attempt started"
    );
    Ok(Json(RecordResponse::from_db(record)))
}

pub(super) async fn submit_exam(
    Path(exam_id): Path<String>,
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<SubmitExamRequest>,
) -> Result<Json<RecordResponse>, ApiError> {
    let now = primitive_now_utc();
    let exam = fetch_exam(&state, &exam_id).await?;
    lifecycle::ensure_in_progress(&exam, now)?;

    let answers: HashMap<String, String> = payload
        .answers
        .iter()
        .filter_map(|(question_id, value)| {
            grading::answer_text(value).map(|text| (question_id.clone(), text))
        })
        .collect();

    let client = ClientInfo::from_headers(&headers);
    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let backfill = lifecycle::backfilled_start(&exam, now);
    let record = find_or_create_record(&mut tx, &exam, &student, Some(backfill), &client).await?;
    if record.status.is_completed() {
        return Err(ApiError::Conflict("Exam has already been submitted".to_string()));
    }

    let record =
        finalize_record(&mut tx, &exam, &record, Some(&answers), FinalizeMode::Submit, now)
            .await?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    Ok(Json(RecordResponse::from_db(record)))
}

pub(super) async fn recent_records(
    Query(params): Query<RecentRecordsQuery>,
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<Vec<RecordResponse>>, ApiError> {
    let filter = RecordFilter { student_id: Some(&student.id), ..RecordFilter::default() };
    let records = repositories::exam_records::list(state.db(), &filter, 0, params.limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list recent records"))?;

    Ok(Json(records.into_iter().map(RecordResponse::from_joined).collect()))
}

pub(super) async fn record_answers(
    Path(record_id): Path<String>,
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<Vec<StudentAnswerResponse>>, ApiError> {
    let record = repositories::exam_records::find_by_id(state.db(), &record_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch record"))?
        .ok_or_else(|| ApiError::NotFound("Record not found".to_string()))?;

    if record.student_id != student.id {
        return Err(ApiError::Forbidden("Access denied"));
    }

    let answers = repositories::student_answers::list_by_record(state.db(), &record.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list answers"))?;

    Ok(Json(answers.into_iter().map(StudentAnswerResponse::from_db).collect()))
}

#[derive(Debug, Default)]
struct ClientInfo {
    ip_address: Option<String>,
    user_agent: Option<String>,
}

impl ClientInfo {
    fn from_headers(headers: &HeaderMap) -> Self {
        let header_text = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
        };

        let ip_address = header_text("x-forwarded-for")
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .or_else(|| header_text("x-real-ip"))
            .map(str::to_string);
        let user_agent = headers
            .get(header::USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.chars().take(MAX_USER_AGENT_LEN).collect());

        Self { ip_address, user_agent }
    }
}

async fn fetch_exam(state: &AppState, exam_id: &str) -> Result<Exam, ApiError> {
    repositories::exams::find_by_id(state.db(), exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam"))?
        .ok_or_else(|| ApiError::NotFound("Exam not found".to_string()))
}

/// Locks the student's record for `exam`, creating a not-started one when absent.
async fn find_or_create_record(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    exam: &Exam,
    student: &Student,
    start_time: Option<time::PrimitiveDateTime>,
    client: &ClientInfo,
) -> Result<ExamRecord, ApiError> {
    let existing =
        repositories::exam_records::lock_by_exam_and_student(&mut **tx, &exam.id, &student.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load record"))?;
    if let Some(record) = existing {
        return Ok(record);
    }

    let created = repositories::exam_records::create(
        &mut **tx,
        CreateRecord {
            id: &Uuid::new_v4().to_string(),
            exam_id: &exam.id,
            student_id: &student.id,
            student_number: &student.student_number,
            student_name: &student.name,
            start_time,
            total_score: exam.total_score,
            status: RecordStatus::NotStarted,
            ip_address: client.ip_address.as_deref(),
            user_agent: client.user_agent.as_deref(),
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create record"))?;

    match created {
        Some(record) => Ok(record),
        // Lost a race with a concurrent request from the same student.
        None => repositories::exam_records::lock_by_exam_and_student(
            &mut **tx,
            &exam.id,
            &student.id,
        )
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load record"))?
        .ok_or_else(|| ApiError::Conflict("Record was removed concurrently".to_string())),
    }
}
