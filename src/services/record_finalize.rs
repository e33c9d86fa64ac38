use std::collections::HashMap;

use thiserror::Error;
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::db::models::{Exam, ExamQuestionDetail, ExamRecord};
use crate::repositories;
use crate::services::grading::{self, AnswerKey};
use crate::services::lifecycle::{self, AnswerOutcome, LifecycleError, RecordEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FinalizeMode {
    Submit,
    TimeOut,
}

impl FinalizeMode {
    fn event(self) -> RecordEvent {
        match self {
            FinalizeMode::Submit => RecordEvent::Submit,
            FinalizeMode::TimeOut => RecordEvent::TimeOut,
        }
    }

    fn label(self) -> &'static str {
        match self {
            FinalizeMode::Submit => "submitted",
            FinalizeMode::TimeOut => "timed_out",
        }
    }

    fn record_metric(self) {
        match self {
            FinalizeMode::Submit => metrics::counter!("exam_submissions_total").increment(1),
            FinalizeMode::TimeOut => {
                metrics::counter!("exam_records_timed_out_total").increment(1)
            }
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum FinalizeError {
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Stores `answers` (when given), grades every saved answer of the record and closes it.
/// Runs inside the caller's transaction; the record row must already be locked.
pub(crate) async fn finalize_record(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    exam: &Exam,
    record: &ExamRecord,
    answers: Option<&HashMap<String, String>>,
    mode: FinalizeMode,
    finished_at: PrimitiveDateTime,
) -> Result<ExamRecord, FinalizeError> {
    let status = lifecycle::transition(record.status, mode.event())?;

    let details = repositories::exam_questions::list_details(&mut **tx, &exam.id).await?;
    let by_question: HashMap<&str, &ExamQuestionDetail> =
        details.iter().map(|detail| (detail.question_id.as_str(), detail)).collect();

    if let Some(answers) = answers {
        let mut question_ids: Vec<&String> = answers.keys().collect();
        question_ids.sort();

        for question_id in question_ids {
            let Some(detail) = by_question.get(question_id.as_str()) else {
                tracing::debug!(
                    record_id = %record.id,
                    question_id = %question_id,
                    "Ignoring answer for a question outside the exam"
                );
                continue;
            };
            let text = answers[question_id].trim();
            let key = AnswerKey::from_detail(detail);
            let correct_answer = grading::snapshot(&key);
            let is_correct = (!text.is_empty()).then(|| grading::is_correct(&key, text));

            repositories::student_answers::upsert(
                &mut **tx,
                repositories::student_answers::UpsertAnswer {
                    id: &Uuid::new_v4().to_string(),
                    exam_record_id: &record.id,
                    exam_id: &exam.id,
                    student_id: &record.student_id,
                    question_id,
                    student_answer: Some(text),
                    correct_answer: correct_answer.as_deref(),
                    is_correct,
                    answered_at: finished_at,
                },
            )
            .await?;
        }
    }

    let stored = repositories::student_answers::list_by_record(&mut **tx, &record.id).await?;
    let graded = stored.iter().map(|answer| {
        let text = answer.student_answer.as_deref().unwrap_or_default();
        let outcome = if text.trim().is_empty() {
            AnswerOutcome::Blank
        } else {
            let correct = match by_question.get(answer.question_id.as_str()) {
                Some(detail) => grading::is_correct(&AnswerKey::from_detail(detail), text),
                None => grading::matches_snapshot(answer.correct_answer.as_deref(), text),
            };
            if correct {
                AnswerOutcome::Correct
            } else {
                AnswerOutcome::Wrong
            }
        };
        (answer.question_id.as_str(), outcome)
    });

    let question_scores: HashMap<&str, f64> =
        details.iter().map(|detail| (detail.question_id.as_str(), detail.score)).collect();
    let summary =
        lifecycle::summarize(&question_scores, graded, exam.question_count, exam.total_score);

    let start_time =
        record.start_time.unwrap_or_else(|| lifecycle::backfilled_start(exam, finished_at));

    let completed = repositories::exam_records::complete(
        &mut **tx,
        &record.id,
        repositories::exam_records::CompleteRecord {
            status,
            start_time,
            finished_at,
            duration_minutes: lifecycle::elapsed_minutes(start_time, finished_at),
            total_score: exam.total_score,
            summary,
        },
    )
    .await?;

    tracing::info!(
        record_id = %completed.id,
        exam_id = %exam.id,
        status = mode.label(),
        score = completed.score,
        correct = completed.correct_count,
        wrong = completed.wrong_count,
        unanswered = completed.unanswered_count,
        "Exam record finalized"
    );
    mode.record_metric();

    Ok(completed)
}
