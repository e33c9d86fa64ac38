//! Practice answer checking against the question bank. No exam record is touched.

use std::collections::{HashMap, HashSet};

use axum::{extract::State, routing::post, Json, Router};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::validation::validation_error;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::Question;
use crate::repositories;
use crate::schemas::answer::{
    CheckAnswerRequest, CheckAnswerResponse, CheckAnswersRequest, CheckAnswersResponse,
};
use crate::services::grading::{self, AnswerKey, MISSING_KEY_MESSAGE};
use crate::services::lifecycle::{percentage, round1};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/check-answer", post(check_answer))
        .route("/check-answers", post(check_answers))
}

async fn check_answer(
    State(state): State<AppState>,
    Json(payload): Json<CheckAnswerRequest>,
) -> Result<Json<CheckAnswerResponse>, ApiError> {
    payload.validate().map_err(validation_error)?;

    let question = repositories::questions::find_by_id(state.db(), &payload.question_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch question"))?
        .ok_or_else(|| ApiError::NotFound("Question not found".to_string()))?;
    let live = live_questions(&state, std::slice::from_ref(&question.id)).await?;

    Ok(Json(check_one(&question, &payload, !live.contains(&question.id))))
}

async fn check_answers(
    State(state): State<AppState>,
    Json(payload): Json<CheckAnswersRequest>,
) -> Result<Json<CheckAnswersResponse>, ApiError> {
    payload.validate().map_err(validation_error)?;

    let ids: Vec<String> = payload.answers.iter().map(|item| item.question_id.clone()).collect();
    let questions = repositories::questions::find_by_ids(state.db(), &ids)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch questions"))?;
    let by_id: HashMap<&str, &Question> =
        questions.iter().map(|question| (question.id.as_str(), question)).collect();
    let live = live_questions(&state, &ids).await?;

    let results: Vec<CheckAnswerResponse> = payload
        .answers
        .iter()
        .map(|item| match by_id.get(item.question_id.as_str()) {
            Some(question) => check_one(question, item, !live.contains(&question.id)),
            None => CheckAnswerResponse {
                question_id: item.question_id.clone(),
                is_correct: false,
                correct_answer: None,
                student_answer: grading::answer_text(&item.answer),
                error: Some("Question not found".to_string()),
            },
        })
        .collect();

    let correct_count = results.iter().filter(|result| result.is_correct).count() as i64;
    let total_count = results.len() as i64;

    Ok(Json(CheckAnswersResponse {
        results,
        correct_count,
        total_count,
        accuracy: round1(percentage(correct_count, total_count)),
    }))
}

/// Questions on an exam that is running right now. Their keys stay hidden.
async fn live_questions(state: &AppState, ids: &[String]) -> Result<HashSet<String>, ApiError> {
    let live = repositories::exam_questions::live_question_ids(state.db(), ids, primitive_now_utc())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check running exams"))?;
    Ok(live.into_iter().collect())
}

fn check_one(
    question: &Question,
    request: &CheckAnswerRequest,
    reveal_key: bool,
) -> CheckAnswerResponse {
    let key = AnswerKey::from_question(question);
    let student_answer = grading::answer_text(&request.answer);
    let is_correct =
        student_answer.as_deref().is_some_and(|answer| grading::is_correct(&key, answer));

    let correct_answer = (reveal_key && !is_correct).then(|| {
        grading::display_correct_answer(&key).unwrap_or_else(|| MISSING_KEY_MESSAGE.to_string())
    });

    CheckAnswerResponse {
        question_id: question.id.clone(),
        is_correct,
        correct_answer,
        student_answer,
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::types::{ActiveStatus, DifficultyLevel, QuestionType};
    use serde_json::json;
    use sqlx::types::Json as SqlJson;
    use time::macros::datetime;

    fn question(question_type: QuestionType, key: serde_json::Value) -> Question {
        Question {
            id: "q-1".to_string(),
            title: "Title".to_string(),
            content: "Content".to_string(),
            question_type,
            difficulty: DifficultyLevel::Easy,
            options: Some(SqlJson(vec!["a".into(), "b".into(), "c".into()])),
            correct_answers: Some(SqlJson(key)),
            correct_answer: None,
            tags: None,
            status: ActiveStatus::Enabled,
            created_by: None,
            created_at: datetime!(2025-01-01 0:00),
            updated_at: datetime!(2025-01-01 0:00),
        }
    }

    fn request(answer: serde_json::Value) -> CheckAnswerRequest {
        CheckAnswerRequest { question_id: "q-1".to_string(), answer }
    }

    #[test]
    fn correct_answer_hides_the_key() {
        let question = question(QuestionType::Multiple, json!(["A", "C"]));
        let result = check_one(&question, &request(json!([2, 0])), true);

        assert!(result.is_correct);
        assert!(result.correct_answer.is_none());
    }

    #[test]
    fn wrong_answer_reveals_the_key() {
        let question = question(QuestionType::Single, json!(["B"]));
        let result = check_one(&question, &request(json!("a")), true);

        assert!(!result.is_correct);
        assert_eq!(result.correct_answer.as_deref(), Some("B"));
        assert_eq!(result.student_answer.as_deref(), Some("a"));
    }

    #[test]
    fn null_answer_counts_as_wrong() {
        let question = question(QuestionType::Single, json!(["B"]));
        let result = check_one(&question, &request(serde_json::Value::Null), true);

        assert!(!result.is_correct);
        assert!(result.student_answer.is_none());
    }

    #[test]
    fn hidden_key_is_not_revealed_for_wrong_answers() {
        let question = question(QuestionType::Single, json!(["B"]));
        let result = check_one(&question, &request(json!("a")), false);

        assert!(!result.is_correct);
        assert!(result.correct_answer.is_none());
    }

    #[tokio::test]
    async fn keys_of_questions_on_a_running_exam_stay_hidden() {
        use axum::http::{Method, StatusCode};
        use time::Duration;
        use tower::ServiceExt;

        use crate::test_support;

        let ctx = test_support::setup_test_context().await;
        let pool = ctx.state.db();
        let admin = test_support::insert_admin(pool, "check-admin", "admin-pass").await;
        let live = test_support::insert_question(
            pool,
            "On a running exam",
            QuestionType::Single,
            Some(json!(["B"])),
            None,
            &admin.id,
        )
        .await;
        let practice = test_support::insert_question(
            pool,
            "Practice only",
            QuestionType::Single,
            Some(json!(["C"])),
            None,
            &admin.id,
        )
        .await;
        let exam = test_support::insert_exam(
            pool,
            "Running exam",
            Duration::minutes(10),
            Duration::hours(1),
            60,
            &admin.id,
        )
        .await;
        test_support::link_question(pool, &exam.id, &live.id, 1, 100.0).await;

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/check-answers",
                None,
                Some(json!({
                    "answers": [
                        { "questionId": live.id, "answer": "a" },
                        { "questionId": practice.id, "answer": "a" }
                    ]
                })),
            ))
            .await
            .expect("check answers");
        let status = response.status();
        let body = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::OK, "response: {body}");
        assert_eq!(body["results"][0]["is_correct"], false);
        assert!(body["results"][0]["correct_answer"].is_null());
        assert_eq!(body["results"][1]["correct_answer"], "C");
        assert_eq!(body["correct_count"], 0);
    }
}
