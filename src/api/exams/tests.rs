use axum::http::{Method, StatusCode};
use serde_json::{json, Value};
use time::{Duration, OffsetDateTime};
use tower::ServiceExt;

use crate::db::types::QuestionType;
use crate::test_support;

fn rfc3339(value: OffsetDateTime) -> String {
    value
        .format(&time::format_description::well_known::Rfc3339)
        .expect("format timestamp")
}

async fn call(
    ctx: &test_support::TestContext,
    method: Method,
    uri: &str,
    token: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(method, uri, Some(token), body))
        .await
        .expect("response");
    let status = response.status();
    (status, test_support::read_json(response).await)
}

#[tokio::test]
async fn exam_crud_validates_schedule_and_titles() {
    let ctx = test_support::setup_test_context().await;
    let admin = test_support::insert_admin(ctx.state.db(), "exam-admin", "admin-pass").await;
    let token = test_support::admin_token(&admin.id, ctx.state.settings());

    let start = OffsetDateTime::now_utc() + Duration::hours(1);
    let (status, body) = call(
        &ctx,
        Method::POST,
        "/api/v1/exams",
        &token,
        Some(json!({
            "title": "Too short",
            "startTime": rfc3339(start),
            "endTime": rfc3339(start + Duration::minutes(30)),
            "durationMinutes": 45
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "response: {body}");

    let (status, body) = call(
        &ctx,
        Method::POST,
        "/api/v1/exams",
        &token,
        Some(json!({
            "title": "Yesterday",
            "startTime": rfc3339(start - Duration::days(1)),
            "endTime": rfc3339(start),
            "durationMinutes": 45
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "response: {body}");

    let (status, created) = call(
        &ctx,
        Method::POST,
        "/api/v1/exams",
        &token,
        Some(json!({
            "title": "Final",
            "startTime": rfc3339(start),
            "endTime": rfc3339(start + Duration::hours(2)),
            "durationMinutes": 90,
            "status": "enabled"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "response: {created}");
    assert_eq!(created["phase"], "not_started");
    assert_eq!(created["pass_score"], 60.0);
    let exam_id = created["id"].as_str().expect("exam id").to_string();

    let (status, _) = call(
        &ctx,
        Method::POST,
        "/api/v1/exams",
        &token,
        Some(json!({
            "title": "Final",
            "startTime": rfc3339(start),
            "endTime": rfc3339(start + Duration::hours(2)),
            "durationMinutes": 90
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, updated) = call(
        &ctx,
        Method::PUT,
        &format!("/api/v1/exams/{exam_id}"),
        &token,
        Some(json!({ "title": "Final (rescheduled)", "durationMinutes": 120 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "response: {updated}");
    assert_eq!(updated["duration_minutes"], 120);

    let (status, _) = call(
        &ctx,
        Method::PUT,
        &format!("/api/v1/exams/{exam_id}"),
        &token,
        Some(json!({ "durationMinutes": 180 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, listed) =
        call(&ctx, Method::GET, "/api/v1/exams?title=final&sort_by=title&sort_dir=asc", &token, None)
            .await;
    assert_eq!(listed["total_count"], 1);

    let (_, upcoming) = call(&ctx, Method::GET, "/api/v1/exams/upcoming", &token, None).await;
    assert_eq!(upcoming[0]["id"], exam_id.as_str());

    let (status, _) =
        call(&ctx, Method::DELETE, &format!("/api/v1/exams/{exam_id}"), &token, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) =
        call(&ctx, Method::GET, &format!("/api/v1/exams/{exam_id}"), &token, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn question_links_keep_totals_in_sync() {
    let ctx = test_support::setup_test_context().await;
    let admin = test_support::insert_admin(ctx.state.db(), "link-admin", "admin-pass").await;
    let token = test_support::admin_token(&admin.id, ctx.state.settings());

    let first = test_support::insert_question(
        ctx.state.db(),
        "First",
        QuestionType::Single,
        Some(json!(["A"])),
        None,
        &admin.id,
    )
    .await;
    let second = test_support::insert_question(
        ctx.state.db(),
        "Second",
        QuestionType::Fill,
        None,
        Some("ownership"),
        &admin.id,
    )
    .await;
    let exam = test_support::insert_exam(
        ctx.state.db(),
        "Later",
        Duration::hours(-2),
        Duration::hours(5),
        60,
        &admin.id,
    )
    .await;
    let base = format!("/api/v1/exams/{}/questions", exam.id);

    let (status, link) =
        call(&ctx, Method::POST, &base, &token, Some(json!({ "questionId": first.id }))).await;
    assert_eq!(status, StatusCode::CREATED, "response: {link}");
    assert_eq!(link["question_order"], 1);
    assert_eq!(link["score"], 10.0);

    let (status, link) = call(
        &ctx,
        Method::POST,
        &base,
        &token,
        Some(json!({ "question_id": second.id, "score": 15 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "response: {link}");
    assert_eq!(link["question_order"], 2);

    let (status, _) =
        call(&ctx, Method::POST, &base, &token, Some(json!({ "questionId": first.id }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = call(
        &ctx,
        Method::PUT,
        &format!("{base}/{}/score", first.id),
        &token,
        Some(json!({ "score": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &ctx,
        Method::PUT,
        &format!("{base}/{}/score", first.id),
        &token,
        Some(json!({ "score": 25 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, exam_body) =
        call(&ctx, Method::GET, &format!("/api/v1/exams/{}", exam.id), &token, None).await;
    assert_eq!(exam_body["question_count"], 2);
    assert_eq!(exam_body["total_score"], 40.0);

    let (status, _) =
        call(&ctx, Method::DELETE, &format!("{base}/{}", first.id), &token, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, links) = call(&ctx, Method::GET, &base, &token, None).await;
    assert_eq!(links[0]["question_id"], second.id.as_str());
    assert_eq!(links[0]["question_order"], 1);

    let (_, exam_body) =
        call(&ctx, Method::GET, &format!("/api/v1/exams/{}", exam.id), &token, None).await;
    assert_eq!(exam_body["question_count"], 1);
    assert_eq!(exam_body["total_score"], 15.0);
}

#[tokio::test]
async fn started_exam_keeps_its_questions_and_records() {
    let ctx = test_support::setup_test_context().await;
    let admin = test_support::insert_admin(ctx.state.db(), "live-admin", "admin-pass").await;
    let token = test_support::admin_token(&admin.id, ctx.state.settings());
    let question = test_support::insert_question(
        ctx.state.db(),
        "Live",
        QuestionType::Judge,
        None,
        Some("false"),
        &admin.id,
    )
    .await;
    let exam = test_support::insert_exam(
        ctx.state.db(),
        "Live exam",
        Duration::minutes(5),
        Duration::hours(1),
        30,
        &admin.id,
    )
    .await;

    let (status, _) = call(
        &ctx,
        Method::POST,
        &format!("/api/v1/exams/{}/questions", exam.id),
        &token,
        Some(json!({ "questionId": question.id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = call(
        &ctx,
        Method::DELETE,
        &format!("/api/v1/exams/{}/questions/{}", exam.id, question.id),
        &token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let student = test_support::insert_student(ctx.state.db(), "S2025200", "Zhao", "pw").await;
    let student_token = test_support::student_token(&student.id, ctx.state.settings());
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/student/exams/{}/start", exam.id),
            Some(&student_token),
            None,
        ))
        .await
        .expect("start");
    assert_eq!(response.status(), StatusCode::OK);

    let (status, _) =
        call(&ctx, Method::DELETE, &format!("/api/v1/exams/{}", exam.id), &token, None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, finished) = call(
        &ctx,
        Method::PUT,
        &format!("/api/v1/exams/{}/status", exam.id),
        &token,
        Some(json!({ "status": "finished" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "response: {finished}");
    assert_eq!(finished["phase"], "finished");

    let (_, records) =
        call(&ctx, Method::GET, &format!("/api/v1/exams/{}/records", exam.id), &token, None)
            .await;
    assert_eq!(records["total_count"], 1);
    assert_eq!(records["items"][0]["status"], "submitted");
    assert_eq!(records["items"][0]["unanswered_count"], 1);
    assert!(records["items"][0]["submit_time"].is_string());
}

#[tokio::test]
async fn finishing_an_exam_scores_saved_answers_of_open_attempts() {
    let ctx = test_support::setup_test_context().await;
    let pool = ctx.state.db();
    let admin = test_support::insert_admin(pool, "finish-admin", "admin-pass").await;
    let token = test_support::admin_token(&admin.id, ctx.state.settings());
    let right = test_support::insert_question(
        pool,
        "Saved right",
        QuestionType::Single,
        Some(json!(["A"])),
        None,
        &admin.id,
    )
    .await;
    let wrong = test_support::insert_question(
        pool,
        "Saved wrong",
        QuestionType::Judge,
        None,
        Some("true"),
        &admin.id,
    )
    .await;
    let exam =
        test_support::insert_exam(pool, "Finish early", Duration::minutes(30), Duration::hours(1), 60, &admin.id)
            .await;
    test_support::link_question(pool, &exam.id, &right.id, 1, 70.0).await;
    let exam = test_support::link_question(pool, &exam.id, &wrong.id, 2, 30.0).await;

    let student = test_support::insert_student(pool, "S2025300", "Qian", "pw").await;
    let started = crate::core::time::primitive_now_utc() - Duration::minutes(15);
    let record = test_support::insert_started_record(pool, &exam, &student, started).await;
    test_support::save_answer(pool, &record, &right.id, "a").await;
    test_support::save_answer(pool, &record, &wrong.id, "false").await;

    let (status, finished) = call(
        &ctx,
        Method::PUT,
        &format!("/api/v1/exams/{}/status", exam.id),
        &token,
        Some(json!({ "status": "finished" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "response: {finished}");

    let (status, body) =
        call(&ctx, Method::GET, &format!("/api/v1/exams/records/{}", record.id), &token, None)
            .await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["status"], "submitted");
    assert_eq!(body["score"], 70.0);
    assert_eq!(body["correct_count"], 1);
    assert_eq!(body["wrong_count"], 1);
    assert_eq!(body["unanswered_count"], 0);
}

#[tokio::test]
async fn admin_adjusts_resets_and_deletes_records() {
    let ctx = test_support::setup_test_context().await;
    let admin = test_support::insert_admin(ctx.state.db(), "record-admin", "admin-pass").await;
    let token = test_support::admin_token(&admin.id, ctx.state.settings());
    let question = test_support::insert_question(
        ctx.state.db(),
        "Graded",
        QuestionType::Single,
        Some(json!(["C"])),
        None,
        &admin.id,
    )
    .await;
    let exam = test_support::insert_exam(
        ctx.state.db(),
        "Graded exam",
        Duration::minutes(5),
        Duration::hours(1),
        30,
        &admin.id,
    )
    .await;
    call(
        &ctx,
        Method::POST,
        &format!("/api/v1/exams/{}/questions", exam.id),
        &token,
        Some(json!({ "questionId": question.id, "score": 50 })),
    )
    .await;

    let student = test_support::insert_student(ctx.state.db(), "S2025300", "Qian", "pw").await;
    let student_token = test_support::student_token(&student.id, ctx.state.settings());
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/student/exams/{}/submit", exam.id),
            Some(&student_token),
            Some(json!({ "answers": { question.id.clone(): 2 } })),
        ))
        .await
        .expect("submit");
    let submitted = test_support::read_json(response).await;
    assert_eq!(submitted["score"], 50.0, "response: {submitted}");
    let record_id = submitted["id"].as_str().expect("record id").to_string();

    let (_, listed) =
        call(&ctx, Method::GET, "/api/v1/exams/records?student_name=qia", &token, None).await;
    assert_eq!(listed["items"][0]["id"], record_id.as_str());
    assert_eq!(listed["items"][0]["passed"], false);

    let (status, _) = call(
        &ctx,
        Method::PUT,
        &format!("/api/v1/exams/records/{record_id}/score"),
        &token,
        Some(json!({ "score": 80 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, scored) = call(
        &ctx,
        Method::PUT,
        &format!("/api/v1/exams/records/{record_id}/score"),
        &token,
        Some(json!({ "score": 45 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "response: {scored}");
    assert_eq!(scored["score"], 45.0);

    let (status, reset) = call(
        &ctx,
        Method::POST,
        &format!("/api/v1/exams/records/{record_id}/reset"),
        &token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "response: {reset}");
    assert_eq!(reset["status"], "not_started");
    assert_eq!(reset["score"], 0.0);
    assert!(reset["start_time"].is_null());

    let (_, answers) = call(
        &ctx,
        Method::GET,
        &format!("/api/v1/exams/records/{record_id}/answers"),
        &token,
        None,
    )
    .await;
    assert_eq!(answers, json!([]));

    let (status, _) = call(
        &ctx,
        Method::PUT,
        &format!("/api/v1/exams/records/{record_id}/score"),
        &token,
        Some(json!({ "score": 10 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &ctx,
        Method::DELETE,
        &format!("/api/v1/exams/records/{record_id}"),
        &token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = call(
        &ctx,
        Method::GET,
        &format!("/api/v1/exams/records/{record_id}"),
        &token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn score_update_racing_a_reset_never_scores_a_reset_record() {
    let ctx = test_support::setup_test_context().await;
    let pool = ctx.state.db();
    let admin = test_support::insert_admin(pool, "race-record-admin", "admin-pass").await;
    let token = test_support::admin_token(&admin.id, ctx.state.settings());
    let question = test_support::insert_question(
        pool,
        "Raced",
        QuestionType::Judge,
        None,
        Some("true"),
        &admin.id,
    )
    .await;
    let exam =
        test_support::insert_exam(pool, "Race exam", Duration::minutes(30), Duration::hours(1), 60, &admin.id)
            .await;
    let exam = test_support::link_question(pool, &exam.id, &question.id, 1, 100.0).await;

    for round in 0..5 {
        let student =
            test_support::insert_student(pool, &format!("S-RACE-{round}"), "Racer", "pw").await;
        let started = crate::core::time::primitive_now_utc() - Duration::minutes(5);
        let record = test_support::insert_started_record(pool, &exam, &student, started).await;
        let student_token = test_support::student_token(&student.id, ctx.state.settings());
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                &format!("/api/v1/student/exams/{}/submit", exam.id),
                Some(&student_token),
                Some(json!({ "answers": { question.id.clone(): "true" } })),
            ))
            .await
            .expect("submit");
        assert_eq!(response.status(), StatusCode::OK);

        let score_app = ctx.app.clone();
        let score_token = token.clone();
        let score_uri = format!("/api/v1/exams/records/{}/score", record.id);
        let scoring = tokio::spawn(async move {
            score_app
                .oneshot(test_support::json_request(
                    Method::PUT,
                    &score_uri,
                    Some(&score_token),
                    Some(json!({ "score": 55 })),
                ))
                .await
                .expect("score")
                .status()
        });
        let reset_app = ctx.app.clone();
        let reset_token = token.clone();
        let reset_uri = format!("/api/v1/exams/records/{}/reset", record.id);
        let resetting = tokio::spawn(async move {
            reset_app
                .oneshot(test_support::json_request(Method::POST, &reset_uri, Some(&reset_token), None))
                .await
                .expect("reset")
                .status()
        });

        let scored = scoring.await.expect("join score");
        assert!(scored == StatusCode::OK || scored == StatusCode::BAD_REQUEST, "status {scored}");
        assert_eq!(resetting.await.expect("join reset"), StatusCode::OK);

        let (_, body) =
            call(&ctx, Method::GET, &format!("/api/v1/exams/records/{}", record.id), &token, None)
                .await;
        assert_eq!(body["status"], "not_started");
        assert_eq!(body["score"], 0.0);
    }
}
