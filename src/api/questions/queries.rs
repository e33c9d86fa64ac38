use serde::Deserialize;

use crate::db::types::{ActiveStatus, DifficultyLevel, QuestionType};

#[derive(Debug, Deserialize)]
pub(super) struct ListQuestionsQuery {
    #[serde(default)]
    pub(super) skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    pub(super) limit: i64,
    #[serde(default)]
    pub(super) keyword: Option<String>,
    #[serde(default, rename = "type", alias = "questionType")]
    pub(super) question_type: Option<QuestionType>,
    #[serde(default)]
    pub(super) difficulty: Option<DifficultyLevel>,
    #[serde(default)]
    pub(super) status: Option<ActiveStatus>,
}
