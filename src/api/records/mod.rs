//! Attempt records as seen by administrators. Mounted under `/exams/records`.

mod handlers;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/records", get(handlers::list_records))
        .route("/records/:record_id", get(handlers::get_record).delete(handlers::delete_record))
        .route("/records/:record_id/answers", get(handlers::list_record_answers))
        .route("/records/:record_id/score", put(handlers::update_record_score))
        .route("/records/:record_id/reset", post(handlers::reset_record))
}
