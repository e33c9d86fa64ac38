use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::test_support;

#[tokio::test]
async fn admin_login_returns_token_and_profile() {
    let ctx = test_support::setup_test_context().await;
    test_support::insert_admin(ctx.state.db(), "root-admin", "admin-pass").await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "username": "root-admin", "password": "admin-pass" })),
        ))
        .await
        .expect("login");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["token_type"], "bearer");
    assert_eq!(body["user"]["username"], "root-admin");
    assert!(body["user"].get("hashed_password").is_none());
    let token = body["access_token"].as_str().expect("token").to_string();

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::GET, "/api/v1/auth/me", Some(&token), None))
        .await
        .expect("me");
    let me = test_support::read_json(response).await;
    assert_eq!(me["username"], "root-admin");

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "root-admin@example.com", "password": "wrong" })),
        ))
        .await
        .expect("bad login");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn student_login_accepts_student_number() {
    let ctx = test_support::setup_test_context().await;
    let student =
        test_support::insert_student(ctx.state.db(), "S2025001", "Ada", "student-pass").await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/auth/student/login",
            None,
            Some(json!({ "studentNumber": "S2025001", "password": "student-pass" })),
        ))
        .await
        .expect("student login");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["user"]["id"], student.id.as_str());
    assert!(body["user"]["last_login_at"].is_string());

    let student_token = body["access_token"].as_str().expect("token").to_string();
    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/auth/me",
            Some(&student_token),
            None,
        ))
        .await
        .expect("me as student");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn repeated_failures_are_rate_limited() {
    let ctx = test_support::setup_test_context().await;
    test_support::insert_student(ctx.state.db(), "S2025002", "Grace", "student-pass").await;

    let limit = ctx.state.settings().auth().login_max_attempts;
    let mut last = StatusCode::OK;
    for _ in 0..=limit {
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/auth/student/login",
                None,
                Some(json!({ "identifier": "S2025002", "password": "nope" })),
            ))
            .await
            .expect("login attempt");
        last = response.status();
    }
    assert_eq!(last, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn availability_checks_report_taken_names() {
    let ctx = test_support::setup_test_context().await;
    test_support::insert_admin(ctx.state.db(), "taken", "admin-pass").await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/auth/check-username?username=taken",
            None,
            None,
        ))
        .await
        .expect("check username");
    assert_eq!(test_support::read_json(response).await["available"], false);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/auth/check-email?email=free@example.com",
            None,
            None,
        ))
        .await
        .expect("check email");
    assert_eq!(test_support::read_json(response).await["available"], true);
}

#[tokio::test]
async fn logout_needs_no_session() {
    let _guard = test_support::env_lock().await;
    test_support::set_test_env();

    let settings = crate::core::config::Settings::load().expect("settings");
    let app = crate::api::router::router(test_support::lazy_state(settings));

    let response = app
        .oneshot(test_support::json_request(Method::POST, "/api/v1/auth/logout", None, None))
        .await
        .expect("logout");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
