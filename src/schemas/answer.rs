use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub(crate) struct CheckAnswerRequest {
    #[serde(alias = "questionId")]
    #[validate(length(min = 1, message = "question_id must not be empty"))]
    pub(crate) question_id: String,
    #[serde(default)]
    pub(crate) answer: Value,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct CheckAnswersRequest {
    #[validate(length(min = 1, message = "answers must not be empty"), nested)]
    pub(crate) answers: Vec<CheckAnswerRequest>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CheckAnswerResponse {
    pub(crate) question_id: String,
    pub(crate) is_correct: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) correct_answer: Option<String>,
    pub(crate) student_answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) error: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CheckAnswersResponse {
    pub(crate) results: Vec<CheckAnswerResponse>,
    pub(crate) correct_count: i64,
    pub(crate) total_count: i64,
    pub(crate) accuracy: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn batch_requires_items_and_checks_each_one() {
        let empty: CheckAnswersRequest =
            serde_json::from_value(json!({ "answers": [] })).expect("payload");
        assert!(empty.validate().is_err());

        let blank_id: CheckAnswersRequest = serde_json::from_value(json!({
            "answers": [{ "questionId": "q-1", "answer": "A" }, { "questionId": "", "answer": "B" }]
        }))
        .expect("payload");
        assert!(blank_id.validate().is_err());

        let valid: CheckAnswersRequest = serde_json::from_value(json!({
            "answers": [{ "questionId": "q-1", "answer": ["A", "C"] }]
        }))
        .expect("payload");
        assert!(valid.validate().is_ok());
    }
}
