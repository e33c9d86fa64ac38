use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Question;
use crate::db::types::{ActiveStatus, DifficultyLevel, QuestionType};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuestionCreate {
    #[validate(length(min = 1, max = 255, message = "title must be 1..=255 characters"))]
    pub(crate) title: String,
    #[validate(length(min = 1, message = "content must not be empty"))]
    pub(crate) content: String,
    #[serde(rename = "type", alias = "questionType", alias = "question_type")]
    pub(crate) question_type: QuestionType,
    #[serde(default = "default_difficulty")]
    pub(crate) difficulty: DifficultyLevel,
    #[serde(default)]
    pub(crate) options: Option<Vec<String>>,
    #[serde(default, alias = "correctAnswers")]
    pub(crate) correct_answers: Option<Value>,
    #[serde(default, alias = "correctAnswer")]
    pub(crate) correct_answer: Option<String>,
    #[serde(default)]
    pub(crate) tags: Option<Vec<String>>,
    #[serde(default = "default_status")]
    pub(crate) status: ActiveStatus,
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Default, Deserialize, Validate)]
pub(crate) struct QuestionUpdate {
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "title must be 1..=255 characters"))]
    pub(crate) title: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, message = "content must not be empty"))]
    pub(crate) content: Option<String>,
    #[serde(default, rename = "type", alias = "questionType", alias = "question_type")]
    pub(crate) question_type: Option<QuestionType>,
    #[serde(default)]
    pub(crate) difficulty: Option<DifficultyLevel>,
    #[serde(default)]
    pub(crate) options: Option<Vec<String>>,
    #[serde(default, alias = "correctAnswers")]
    pub(crate) correct_answers: Option<Value>,
    #[serde(default, alias = "correctAnswer")]
    pub(crate) correct_answer: Option<String>,
    #[serde(default)]
    pub(crate) tags: Option<Vec<String>>,
    #[serde(default)]
    pub(crate) status: Option<ActiveStatus>,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) content: String,
    #[serde(rename = "type")]
    pub(crate) question_type: QuestionType,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) options: Vec<String>,
    pub(crate) correct_answers: Option<Value>,
    pub(crate) correct_answer: Option<String>,
    pub(crate) tags: Vec<String>,
    pub(crate) status: ActiveStatus,
    pub(crate) created_by: Option<String>,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl QuestionResponse {
    pub(crate) fn from_db(question: Question) -> Self {
        Self {
            id: question.id,
            title: question.title,
            content: question.content,
            question_type: question.question_type,
            difficulty: question.difficulty,
            options: question.options.map(|json| json.0).unwrap_or_default(),
            correct_answers: question.correct_answers.map(|json| json.0),
            correct_answer: question.correct_answer,
            tags: question.tags.map(|json| json.0).unwrap_or_default(),
            status: question.status,
            created_by: question.created_by,
            created_at: format_primitive(question.created_at),
            updated_at: format_primitive(question.updated_at),
        }
    }
}

/// Public view of a question: no answer key.
#[derive(Debug, Serialize)]
pub(crate) struct QuestionInfoResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) content: String,
    #[serde(rename = "type")]
    pub(crate) question_type: QuestionType,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) options: Vec<String>,
}

impl QuestionInfoResponse {
    pub(crate) fn from_db(question: Question) -> Self {
        Self {
            id: question.id,
            title: question.title,
            content: question.content,
            question_type: question.question_type,
            difficulty: question.difficulty,
            options: question.options.map(|json| json.0).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionStatsResponse {
    pub(crate) total: i64,
    pub(crate) by_type: BTreeMap<String, i64>,
    pub(crate) by_difficulty: BTreeMap<String, i64>,
}

/// Empty lists are stored as NULL.
pub(crate) fn non_empty_list(list: Option<Vec<String>>) -> Option<Vec<String>> {
    list.filter(|items| !items.is_empty())
}

pub(crate) fn non_empty_value(value: Option<Value>) -> Option<Value> {
    value.filter(|value| match value {
        Value::Null => false,
        Value::Array(items) => !items.is_empty(),
        Value::String(text) => !text.trim().is_empty(),
        _ => true,
    })
}

fn default_difficulty() -> DifficultyLevel {
    DifficultyLevel::Medium
}

fn default_status() -> ActiveStatus {
    ActiveStatus::Enabled
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_accepts_type_and_camel_case_aliases() {
        let payload: QuestionCreate = serde_json::from_value(json!({
            "title": "Ownership",
            "content": "Which types are Copy?",
            "type": "multiple",
            "options": ["i32", "String", "bool"],
            "correctAnswers": ["A", "C"]
        }))
        .expect("payload");

        assert_eq!(payload.question_type, QuestionType::Multiple);
        assert_eq!(payload.difficulty, DifficultyLevel::Medium);
        assert_eq!(payload.status, ActiveStatus::Enabled);
        assert_eq!(payload.correct_answers, Some(json!(["A", "C"])));
    }

    #[test]
    fn create_rejects_overlong_title() {
        let payload: QuestionCreate = serde_json::from_value(json!({
            "title": "x".repeat(256),
            "content": "body",
            "type": "fill"
        }))
        .expect("payload");

        assert!(payload.validate().is_err());
    }

    #[test]
    fn empty_lists_collapse_to_none() {
        assert_eq!(non_empty_list(Some(Vec::new())), None);
        assert_eq!(non_empty_value(Some(json!([]))), None);
        assert_eq!(non_empty_value(Some(json!(" "))), None);
        assert_eq!(non_empty_value(Some(json!([0, 2]))), Some(json!([0, 2])));
    }
}
