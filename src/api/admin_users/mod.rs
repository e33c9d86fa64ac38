mod handlers;

use axum::{
    routing::{get, put},
    Router,
};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_users))
        .route("/statistics", get(handlers::user_statistics))
        .route("/recent-active", get(handlers::recent_active_users))
        .route("/never-logged-in", get(handlers::never_logged_in_users))
        .route("/created-between", get(handlers::users_created_between))
        .route("/:user_id", get(handlers::get_user))
        .route("/:user_id/status", put(handlers::update_user_status))
}

#[cfg(test)]
mod tests;
