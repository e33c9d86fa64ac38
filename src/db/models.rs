use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{ActiveStatus, DifficultyLevel, ExamStatus, QuestionType, RecordStatus};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct User {
    pub(crate) id: String,
    pub(crate) username: String,
    pub(crate) email: String,
    pub(crate) hashed_password: String,
    pub(crate) nickname: Option<String>,
    pub(crate) avatar: Option<String>,
    pub(crate) status: ActiveStatus,
    pub(crate) is_superuser: bool,
    pub(crate) last_login_at: Option<PrimitiveDateTime>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Student {
    pub(crate) id: String,
    pub(crate) student_number: String,
    pub(crate) name: String,
    pub(crate) hashed_password: String,
    pub(crate) email: Option<String>,
    pub(crate) phone: Option<String>,
    pub(crate) class_name: Option<String>,
    pub(crate) major: Option<String>,
    pub(crate) grade: Option<String>,
    pub(crate) status: ActiveStatus,
    pub(crate) last_login_at: Option<PrimitiveDateTime>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Question {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) content: String,
    pub(crate) question_type: QuestionType,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) options: Option<Json<Vec<String>>>,
    /// Legacy rows hold letters, option indexes or a bare string here.
    pub(crate) correct_answers: Option<Json<serde_json::Value>>,
    pub(crate) correct_answer: Option<String>,
    pub(crate) tags: Option<Json<Vec<String>>>,
    pub(crate) status: ActiveStatus,
    pub(crate) created_by: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Exam {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) start_time: PrimitiveDateTime,
    pub(crate) end_time: PrimitiveDateTime,
    pub(crate) duration_minutes: i32,
    pub(crate) total_score: f64,
    pub(crate) pass_score: f64,
    pub(crate) question_count: i32,
    pub(crate) status: ExamStatus,
    pub(crate) created_by: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct ExamQuestion {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) question_id: String,
    pub(crate) question_order: i32,
    pub(crate) score: f64,
    pub(crate) created_at: PrimitiveDateTime,
}

/// Exam link joined with the linked question.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct ExamQuestionDetail {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) question_id: String,
    pub(crate) question_order: i32,
    pub(crate) score: f64,
    pub(crate) title: String,
    pub(crate) content: String,
    pub(crate) question_type: QuestionType,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) options: Option<Json<Vec<String>>>,
    pub(crate) correct_answers: Option<Json<serde_json::Value>>,
    pub(crate) correct_answer: Option<String>,
    pub(crate) tags: Option<Json<Vec<String>>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct ExamRecord {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) student_id: String,
    pub(crate) student_number: Option<String>,
    pub(crate) student_name: Option<String>,
    pub(crate) start_time: Option<PrimitiveDateTime>,
    pub(crate) end_time: Option<PrimitiveDateTime>,
    pub(crate) submit_time: Option<PrimitiveDateTime>,
    pub(crate) total_score: Option<f64>,
    pub(crate) score: f64,
    pub(crate) correct_count: i32,
    pub(crate) wrong_count: i32,
    pub(crate) unanswered_count: i32,
    pub(crate) status: RecordStatus,
    pub(crate) duration_minutes: Option<i32>,
    pub(crate) ip_address: Option<String>,
    pub(crate) user_agent: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

/// Record joined with its exam title, for listings shown to people.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct ExamRecordWithExam {
    #[sqlx(flatten)]
    pub(crate) record: ExamRecord,
    pub(crate) exam_title: String,
    pub(crate) exam_pass_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct StudentAnswer {
    pub(crate) id: String,
    pub(crate) exam_record_id: String,
    pub(crate) exam_id: String,
    pub(crate) student_id: String,
    pub(crate) question_id: String,
    pub(crate) student_answer: Option<String>,
    pub(crate) correct_answer: Option<String>,
    pub(crate) is_correct: Option<bool>,
    pub(crate) answer_time: PrimitiveDateTime,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}
