//! Exam-taking endpoints. The acting student always comes from the bearer token.

mod handlers;

use axum::{
    routing::{get, post},
    Router,
};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(handlers::me))
        .route("/exams/available", get(handlers::available_exams))
        .route("/exams/participated", get(handlers::participated_exams))
        .route("/exams/:exam_id/questions", get(handlers::exam_paper))
        .route("/exams/:exam_id/start", post(handlers::start_exam))
        .route("/exams/:exam_id/submit", post(handlers::submit_exam))
        .route("/exam-records/recent", get(handlers::recent_records))
        .route("/exam-records/:record_id/answers", get(handlers::record_answers))
}
