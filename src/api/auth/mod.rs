mod handlers;

use axum::{
    routing::{get, post},
    Router,
};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(handlers::admin_login))
        .route("/student/login", post(handlers::student_login))
        .route("/check-username", get(handlers::check_username))
        .route("/check-email", get(handlers::check_email))
        .route("/logout", post(handlers::logout))
        .route("/me", get(handlers::me))
}

#[cfg(test)]
mod tests;
