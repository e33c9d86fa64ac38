mod handlers;
mod helpers;
mod queries;

use axum::{
    routing::{delete, get, put},
    Router,
};

use crate::core::state::AppState;

pub(crate) use helpers::exam_response;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_exams).post(handlers::create_exam))
        .route("/active", get(handlers::list_active_exams))
        .route("/upcoming", get(handlers::list_upcoming_exams))
        .route("/finished", get(handlers::list_finished_exams))
        .route(
            "/:exam_id",
            get(handlers::get_exam).put(handlers::update_exam).delete(handlers::delete_exam),
        )
        .route("/:exam_id/status", put(handlers::update_exam_status))
        .route("/:exam_id/statistics", get(handlers::exam_statistics))
        .route(
            "/:exam_id/questions",
            get(handlers::list_exam_questions).post(handlers::add_exam_question),
        )
        .route("/:exam_id/questions/:question_id", delete(handlers::remove_exam_question))
        .route(
            "/:exam_id/questions/:question_id/score",
            put(handlers::update_exam_question_score),
        )
        .route("/:exam_id/records", get(handlers::list_exam_records))
}

#[cfg(test)]
mod tests;
