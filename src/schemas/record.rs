use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{ExamRecord, ExamRecordWithExam, StudentAnswer};
use crate::db::types::RecordStatus;
use crate::services::lifecycle;

#[derive(Debug, Serialize)]
pub(crate) struct RecordResponse {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) exam_title: Option<String>,
    pub(crate) student_id: String,
    pub(crate) student_number: Option<String>,
    pub(crate) student_name: Option<String>,
    pub(crate) start_time: Option<String>,
    pub(crate) end_time: Option<String>,
    pub(crate) submit_time: Option<String>,
    pub(crate) total_score: Option<f64>,
    pub(crate) score: f64,
    pub(crate) score_rate: f64,
    pub(crate) correct_count: i32,
    pub(crate) wrong_count: i32,
    pub(crate) unanswered_count: i32,
    pub(crate) accuracy: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) passed: Option<bool>,
    pub(crate) status: RecordStatus,
    pub(crate) duration_minutes: Option<i32>,
    pub(crate) ip_address: Option<String>,
    pub(crate) user_agent: Option<String>,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl RecordResponse {
    pub(crate) fn from_db(record: ExamRecord) -> Self {
        Self {
            score_rate: lifecycle::round1(lifecycle::score_rate(record.score, record.total_score)),
            accuracy: lifecycle::round1(lifecycle::accuracy(
                record.correct_count,
                record.wrong_count,
            )),
            id: record.id,
            exam_id: record.exam_id,
            exam_title: None,
            student_id: record.student_id,
            student_number: record.student_number,
            student_name: record.student_name,
            start_time: record.start_time.map(format_primitive),
            end_time: record.end_time.map(format_primitive),
            submit_time: record.submit_time.map(format_primitive),
            total_score: record.total_score,
            score: record.score,
            correct_count: record.correct_count,
            wrong_count: record.wrong_count,
            unanswered_count: record.unanswered_count,
            passed: None,
            status: record.status,
            duration_minutes: record.duration_minutes,
            ip_address: record.ip_address,
            user_agent: record.user_agent,
            created_at: format_primitive(record.created_at),
            updated_at: format_primitive(record.updated_at),
        }
    }

    pub(crate) fn from_joined(joined: ExamRecordWithExam) -> Self {
        let passed = joined
            .record
            .status
            .is_completed()
            .then_some(joined.record.score >= joined.exam_pass_score);
        let mut response = Self::from_db(joined.record);
        response.exam_title = Some(joined.exam_title);
        response.passed = passed;
        response
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct RecordScoreUpdate {
    #[validate(range(min = 0.0, message = "score must be non-negative"))]
    pub(crate) score: f64,
}

/// Answer values may be strings, numbers, booleans or lists; they are flattened to text
/// before grading.
#[derive(Debug, Deserialize)]
pub(crate) struct SubmitExamRequest {
    #[serde(default)]
    pub(crate) answers: HashMap<String, Value>,
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentAnswerResponse {
    pub(crate) id: String,
    pub(crate) exam_record_id: String,
    pub(crate) exam_id: String,
    pub(crate) question_id: String,
    pub(crate) student_answer: Option<String>,
    pub(crate) correct_answer: Option<String>,
    pub(crate) is_correct: Option<bool>,
    pub(crate) answer_time: String,
}

impl StudentAnswerResponse {
    pub(crate) fn from_db(answer: StudentAnswer) -> Self {
        Self {
            id: answer.id,
            exam_record_id: answer.exam_record_id,
            exam_id: answer.exam_id,
            question_id: answer.question_id,
            student_answer: answer.student_answer,
            correct_answer: answer.correct_answer,
            is_correct: answer.is_correct,
            answer_time: format_primitive(answer.answer_time),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn record() -> ExamRecord {
        ExamRecord {
            id: "record-1".to_string(),
            exam_id: "exam-1".to_string(),
            student_id: "student-1".to_string(),
            student_number: Some("20250001".to_string()),
            student_name: Some("Ada".to_string()),
            start_time: Some(datetime!(2025-03-01 09:00)),
            end_time: Some(datetime!(2025-03-01 09:45)),
            submit_time: Some(datetime!(2025-03-01 09:45)),
            total_score: Some(80.0),
            score: 60.0,
            correct_count: 6,
            wrong_count: 2,
            unanswered_count: 0,
            status: RecordStatus::Submitted,
            duration_minutes: Some(45),
            ip_address: None,
            user_agent: None,
            created_at: datetime!(2025-03-01 09:00),
            updated_at: datetime!(2025-03-01 09:45),
        }
    }

    #[test]
    fn response_derives_rates() {
        let response = RecordResponse::from_db(record());
        assert_eq!(response.score_rate, 75.0);
        assert_eq!(response.accuracy, 75.0);
        assert_eq!(response.submit_time.as_deref(), Some("2025-03-01T09:45:00Z"));
    }

    #[test]
    fn joined_response_reports_pass_for_completed_records() {
        let response = RecordResponse::from_joined(ExamRecordWithExam {
            record: record(),
            exam_title: "Midterm".to_string(),
            exam_pass_score: 60.0,
        });
        assert_eq!(response.exam_title.as_deref(), Some("Midterm"));
        assert_eq!(response.passed, Some(true));
    }
}
