mod handlers;
mod queries;

use axum::{routing::get, Router};

use crate::core::state::AppState;

pub(crate) use handlers::load_question_stats;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_questions).post(handlers::create_question))
        .route("/stats", get(handlers::question_stats))
        .route(
            "/:question_id",
            get(handlers::get_question)
                .put(handlers::update_question)
                .delete(handlers::delete_question),
        )
}

/// Unauthenticated view used by the exam page.
pub(crate) fn info_router() -> Router<AppState> {
    Router::new().route("/:question_id", get(handlers::question_info))
}
