use serde::Deserialize;

use crate::db::types::{ExamStatus, RecordStatus};
use crate::repositories::exams::ExamSort;

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(super) enum SortDirection {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Deserialize)]
pub(super) struct ListExamsQuery {
    #[serde(default)]
    pub(super) skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    pub(super) limit: i64,
    #[serde(default)]
    pub(super) title: Option<String>,
    #[serde(default)]
    pub(super) status: Option<ExamStatus>,
    #[serde(default, alias = "createdBy")]
    pub(super) created_by: Option<String>,
    #[serde(default, alias = "sortBy")]
    pub(super) sort_by: ExamSort,
    #[serde(default, alias = "sortDir")]
    pub(super) sort_dir: SortDirection,
}

#[derive(Debug, Deserialize)]
pub(super) struct ListExamRecordsQuery {
    #[serde(default)]
    pub(super) skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    pub(super) limit: i64,
    #[serde(default)]
    pub(super) status: Option<RecordStatus>,
}
