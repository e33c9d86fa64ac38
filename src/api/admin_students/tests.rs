use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::test_support;

#[tokio::test]
async fn admin_manages_students() {
    let ctx = test_support::setup_test_context().await;
    let admin = test_support::insert_admin(ctx.state.db(), "student-admin", "admin-pass").await;
    let token = test_support::admin_token(&admin.id, ctx.state.settings());
    test_support::insert_student(ctx.state.db(), "S2025400", "Existing", "student-pass").await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/admin/students",
            Some(&token),
            Some(json!({
                "studentNumber": "S2025401",
                "name": "Sun",
                "password": "123",
                "className": "CS-2"
            })),
        ))
        .await
        .expect("short password");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/admin/students",
            Some(&token),
            Some(json!({
                "studentNumber": "S2025400",
                "name": "Clash",
                "password": "student-pass"
            })),
        ))
        .await
        .expect("duplicate number");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/admin/students",
            Some(&token),
            Some(json!({
                "studentNumber": "S2025401",
                "name": "Sun",
                "password": "student-pass",
                "email": "sun@example.com",
                "className": "CS-2",
                "major": "Mathematics"
            })),
        ))
        .await
        .expect("create student");
    let status = response.status();
    let created = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {created}");
    assert!(created.get("hashed_password").is_none());
    let student_id = created["id"].as_str().expect("student id").to_string();

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PUT,
            &format!("/api/v1/admin/students/{student_id}/status"),
            Some(&token),
            Some(json!({ "status": "disabled" })),
        ))
        .await
        .expect("disable student");
    assert_eq!(test_support::read_json(response).await["status"], "disabled");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/admin/students/statistics",
            Some(&token),
            None,
        ))
        .await
        .expect("statistics");
    let stats = test_support::read_json(response).await;
    assert_eq!(stats, json!({ "total": 2, "active": 1, "inactive": 1 }));

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/admin/students/classes",
            Some(&token),
            None,
        ))
        .await
        .expect("classes");
    assert_eq!(test_support::read_json(response).await, json!(["CS-1", "CS-2"]));

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/admin/students?keyword=MATH",
            Some(&token),
            None,
        ))
        .await
        .expect("search");
    let listed = test_support::read_json(response).await;
    assert_eq!(listed["total_count"], 1);
    assert_eq!(listed["items"][0]["id"], student_id.as_str());

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/admin/students/batch-delete",
            Some(&token),
            Some(json!({ "ids": [student_id, "missing"] })),
        ))
        .await
        .expect("batch delete");
    assert_eq!(test_support::read_json(response).await["deleted"], 1);
}
