use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use validator::Validate;

pub(crate) use crate::core::time::format_primitive;
use crate::db::models::{Exam, ExamQuestionDetail};
use crate::db::types::{DifficultyLevel, ExamStatus, QuestionType};
use crate::schemas::datetime::{
    deserialize_offset_datetime_flexible, deserialize_option_offset_datetime_flexible,
};
use crate::services::lifecycle::ExamPhase;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ExamCreate {
    #[validate(length(min = 1, max = 200, message = "title must be 1..=200 characters"))]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(alias = "startTime", deserialize_with = "deserialize_offset_datetime_flexible")]
    pub(crate) start_time: OffsetDateTime,
    #[serde(alias = "endTime", deserialize_with = "deserialize_offset_datetime_flexible")]
    pub(crate) end_time: OffsetDateTime,
    #[serde(alias = "durationMinutes", alias = "duration")]
    #[validate(range(min = 1, message = "duration_minutes must be positive"))]
    pub(crate) duration_minutes: i32,
    #[serde(default = "default_total_score", alias = "totalScore")]
    #[validate(range(min = 0.0, message = "total_score must be non-negative"))]
    pub(crate) total_score: f64,
    #[serde(default = "default_pass_score", alias = "passScore")]
    #[validate(range(min = 0.0, message = "pass_score must be non-negative"))]
    pub(crate) pass_score: f64,
    #[serde(default = "default_status")]
    pub(crate) status: ExamStatus,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub(crate) struct ExamUpdate {
    #[serde(default)]
    #[validate(length(min = 1, max = 200, message = "title must be 1..=200 characters"))]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(
        default,
        alias = "startTime",
        deserialize_with = "deserialize_option_offset_datetime_flexible"
    )]
    pub(crate) start_time: Option<OffsetDateTime>,
    #[serde(
        default,
        alias = "endTime",
        deserialize_with = "deserialize_option_offset_datetime_flexible"
    )]
    pub(crate) end_time: Option<OffsetDateTime>,
    #[serde(default, alias = "durationMinutes", alias = "duration")]
    #[validate(range(min = 1, message = "duration_minutes must be positive"))]
    pub(crate) duration_minutes: Option<i32>,
    #[serde(default, alias = "passScore")]
    #[validate(range(min = 0.0, message = "pass_score must be non-negative"))]
    pub(crate) pass_score: Option<f64>,
    #[serde(default)]
    pub(crate) status: Option<ExamStatus>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExamStatusUpdate {
    pub(crate) status: ExamStatus,
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) start_time: String,
    pub(crate) end_time: String,
    pub(crate) duration_minutes: i32,
    pub(crate) total_score: f64,
    pub(crate) pass_score: f64,
    pub(crate) question_count: i32,
    pub(crate) status: ExamStatus,
    pub(crate) phase: ExamPhase,
    pub(crate) created_by: Option<String>,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl ExamResponse {
    pub(crate) fn from_db(exam: Exam, phase: ExamPhase) -> Self {
        Self {
            id: exam.id,
            title: exam.title,
            description: exam.description,
            start_time: format_primitive(exam.start_time),
            end_time: format_primitive(exam.end_time),
            duration_minutes: exam.duration_minutes,
            total_score: exam.total_score,
            pass_score: exam.pass_score,
            question_count: exam.question_count,
            status: exam.status,
            phase,
            created_by: exam.created_by,
            created_at: format_primitive(exam.created_at),
            updated_at: format_primitive(exam.updated_at),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ExamQuestionAdd {
    #[serde(alias = "questionId")]
    #[validate(length(min = 1, message = "question_id must not be empty"))]
    pub(crate) question_id: String,
    #[serde(default, alias = "questionOrder")]
    #[validate(range(min = 1, message = "question_order must be positive"))]
    pub(crate) question_order: Option<i32>,
    #[serde(default)]
    #[validate(range(exclusive_min = 0.0, message = "score must be positive"))]
    pub(crate) score: Option<f64>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ExamQuestionScoreUpdate {
    #[validate(range(exclusive_min = 0.0, message = "score must be positive"))]
    pub(crate) score: f64,
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamQuestionResponse {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) question_id: String,
    pub(crate) question_order: i32,
    pub(crate) score: f64,
    pub(crate) title: String,
    pub(crate) content: String,
    #[serde(rename = "type")]
    pub(crate) question_type: QuestionType,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) options: Vec<String>,
    pub(crate) correct_answers: Option<Value>,
    pub(crate) correct_answer: Option<String>,
    pub(crate) tags: Vec<String>,
}

impl ExamQuestionResponse {
    pub(crate) fn from_db(detail: ExamQuestionDetail) -> Self {
        Self {
            id: detail.id,
            exam_id: detail.exam_id,
            question_id: detail.question_id,
            question_order: detail.question_order,
            score: detail.score,
            title: detail.title,
            content: detail.content,
            question_type: detail.question_type,
            difficulty: detail.difficulty,
            options: detail.options.map(|json| json.0).unwrap_or_default(),
            correct_answers: detail.correct_answers.map(|json| json.0),
            correct_answer: detail.correct_answer,
            tags: detail.tags.map(|json| json.0).unwrap_or_default(),
        }
    }
}

/// Exam question as shown to a student sitting the exam: no answer key.
#[derive(Debug, Serialize)]
pub(crate) struct PaperQuestionResponse {
    pub(crate) question_id: String,
    pub(crate) question_order: i32,
    pub(crate) score: f64,
    pub(crate) title: String,
    pub(crate) content: String,
    #[serde(rename = "type")]
    pub(crate) question_type: QuestionType,
    pub(crate) options: Vec<String>,
}

impl PaperQuestionResponse {
    pub(crate) fn from_db(detail: ExamQuestionDetail) -> Self {
        Self {
            question_id: detail.question_id,
            question_order: detail.question_order,
            score: detail.score,
            title: detail.title,
            content: detail.content,
            question_type: detail.question_type,
            options: detail.options.map(|json| json.0).unwrap_or_default(),
        }
    }
}

pub(crate) const DEFAULT_QUESTION_SCORE: f64 = 10.0;

fn default_total_score() -> f64 {
    100.0
}

fn default_pass_score() -> f64 {
    60.0
}

fn default_status() -> ExamStatus {
    ExamStatus::Disabled
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::datetime;

    #[test]
    fn create_applies_defaults_and_parses_local_times() {
        let payload: ExamCreate = serde_json::from_value(json!({
            "title": "Midterm",
            "startTime": "2025-03-01T09:00",
            "endTime": "2025-03-01T12:00:00Z",
            "durationMinutes": 90
        }))
        .expect("payload");

        assert_eq!(payload.start_time, datetime!(2025-03-01 09:00 UTC));
        assert_eq!(payload.total_score, 100.0);
        assert_eq!(payload.pass_score, 60.0);
        assert_eq!(payload.status, ExamStatus::Disabled);
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn question_add_rejects_non_positive_score() {
        let payload: ExamQuestionAdd =
            serde_json::from_value(json!({ "questionId": "q-1", "score": 0 })).expect("payload");
        assert!(payload.validate().is_err());
    }
}
