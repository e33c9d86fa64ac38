use serde::Serialize;

use crate::core::time::format_primitive;
use crate::db::types::RecordStatus;
use crate::repositories::dashboard::RecentActivity;
use crate::schemas::exam::ExamResponse;

#[derive(Debug, Serialize)]
pub(crate) struct DashboardStatsResponse {
    pub(crate) admin_count: i64,
    pub(crate) student_count: i64,
    pub(crate) exam_count: i64,
    pub(crate) question_count: i64,
    pub(crate) record_count: i64,
    pub(crate) active_exam_count: i64,
    pub(crate) completed_record_count: i64,
    pub(crate) completion_rate: f64,
    pub(crate) average_score: f64,
}

#[derive(Debug, Serialize)]
pub(crate) struct UserStatsResponse {
    pub(crate) admin_count: i64,
    pub(crate) student_count: i64,
    pub(crate) active_students: i64,
    pub(crate) activity_rate: f64,
}

#[derive(Debug, Serialize)]
pub(crate) struct ExamStatsResponse {
    pub(crate) total: i64,
    pub(crate) pending: i64,
    pub(crate) active: i64,
    pub(crate) finished: i64,
    pub(crate) recent_exams: Vec<ExamResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ActivityResponse {
    pub(crate) record_id: String,
    pub(crate) exam_id: String,
    pub(crate) exam_title: String,
    pub(crate) student_id: String,
    pub(crate) student_name: Option<String>,
    pub(crate) status: RecordStatus,
    pub(crate) score: f64,
    pub(crate) submit_time: Option<String>,
    pub(crate) created_at: String,
}

impl ActivityResponse {
    pub(crate) fn from_db(activity: RecentActivity) -> Self {
        Self {
            record_id: activity.record_id,
            exam_id: activity.exam_id,
            exam_title: activity.exam_title,
            student_id: activity.student_id,
            student_name: activity.student_name,
            status: activity.status,
            score: activity.score,
            submit_time: activity.submit_time.map(format_primitive),
            created_at: format_primitive(activity.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct RecentActivitiesResponse {
    pub(crate) activities: Vec<ActivityResponse>,
    pub(crate) today_count: i64,
    pub(crate) today_completed: i64,
}
