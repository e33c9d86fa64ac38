use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::test_support;

#[tokio::test]
async fn admin_cannot_disable_self_but_can_disable_others() {
    let ctx = test_support::setup_test_context().await;
    let admin = test_support::insert_admin(ctx.state.db(), "chief", "admin-pass").await;
    let other = test_support::insert_admin(ctx.state.db(), "deputy", "admin-pass").await;
    let token = test_support::admin_token(&admin.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PUT,
            &format!("/api/v1/admin/users/{}/status", admin.id),
            Some(&token),
            Some(json!({ "status": "disabled" })),
        ))
        .await
        .expect("disable self");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PUT,
            &format!("/api/v1/admin/users/{}/status", other.id),
            Some(&token),
            Some(json!({ "status": "disabled" })),
        ))
        .await
        .expect("disable other");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["status"], "disabled");

    let other_token = test_support::admin_token(&other.id, ctx.state.settings());
    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/admin/users",
            Some(&other_token),
            None,
        ))
        .await
        .expect("disabled admin");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn user_reports_cover_login_activity() {
    let ctx = test_support::setup_test_context().await;
    test_support::insert_admin(ctx.state.db(), "reporter", "admin-pass").await;
    let idle = test_support::insert_admin(ctx.state.db(), "idle", "admin-pass").await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "username": "reporter", "password": "admin-pass" })),
        ))
        .await
        .expect("login");
    let login = test_support::read_json(response).await;
    let token = login["access_token"].as_str().expect("token").to_string();

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/admin/users/statistics",
            Some(&token),
            None,
        ))
        .await
        .expect("statistics");
    let stats = test_support::read_json(response).await;
    assert_eq!(stats["total"], 2);
    assert_eq!(stats["recently_active"], 1);
    assert_eq!(stats["never_logged_in"], 1);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/admin/users/never-logged-in",
            Some(&token),
            None,
        ))
        .await
        .expect("never logged in");
    let idle_users = test_support::read_json(response).await;
    assert_eq!(idle_users[0]["id"], idle.id.as_str());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/admin/users/created-between?start=2000-01-01T00:00:00Z&end=2100-01-01T00:00:00Z",
            Some(&token),
            None,
        ))
        .await
        .expect("created between");
    let created = test_support::read_json(response).await;
    assert_eq!(created.as_array().map(Vec::len), Some(2));

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/admin/users/created-between?start=soon&end=later",
            Some(&token),
            None,
        ))
        .await
        .expect("bad range");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
