mod handlers;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_students).post(handlers::create_student))
        .route("/statistics", get(handlers::student_statistics))
        .route("/classes", get(handlers::list_classes))
        .route("/majors", get(handlers::list_majors))
        .route("/grades", get(handlers::list_grades))
        .route("/batch-delete", post(handlers::batch_delete_students))
        .route("/:student_id", get(handlers::get_student).delete(handlers::delete_student))
        .route("/:student_id/status", put(handlers::update_student_status))
}

#[cfg(test)]
mod tests;
