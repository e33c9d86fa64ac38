use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;
use time::{Duration, PrimitiveDateTime};

use crate::db::models::Exam;
use crate::db::types::{ExamStatus, RecordStatus};

#[derive(Debug, Error, PartialEq)]
pub(crate) enum LifecycleError {
    #[error("start_time must not be after end_time")]
    StartAfterEnd,
    #[error("start_time must not be in the past")]
    StartInPast,
    #[error("exam window of {window} minutes is shorter than the {duration} minute duration")]
    WindowTooShort { window: i64, duration: i32 },
    #[error("duration_minutes must be positive")]
    InvalidDuration,
    #[error("exam is not in progress")]
    ExamNotInProgress,
    #[error("exam record cannot move from {from:?} to {to:?}")]
    InvalidTransition { from: RecordStatus, to: RecordStatus },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScheduleMode {
    Create,
    Update,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum ExamPhase {
    Disabled,
    NotStarted,
    InProgress,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RecordEvent {
    Start,
    Submit,
    TimeOut,
    Reset,
}

pub(crate) fn validate_schedule(
    start: PrimitiveDateTime,
    end: PrimitiveDateTime,
    duration_minutes: i32,
    now: PrimitiveDateTime,
    grace: Duration,
    mode: ScheduleMode,
) -> Result<(), LifecycleError> {
    if duration_minutes <= 0 {
        return Err(LifecycleError::InvalidDuration);
    }
    if start > end {
        return Err(LifecycleError::StartAfterEnd);
    }
    if mode == ScheduleMode::Create && start < now - grace {
        return Err(LifecycleError::StartInPast);
    }

    let window = (end - start).whole_minutes();
    if window < i64::from(duration_minutes) {
        return Err(LifecycleError::WindowTooShort { window, duration: duration_minutes });
    }

    Ok(())
}

pub(crate) fn exam_phase(exam: &Exam, now: PrimitiveDateTime) -> ExamPhase {
    if exam.status == ExamStatus::Finished || exam.end_time <= now {
        ExamPhase::Finished
    } else if exam.status == ExamStatus::Disabled {
        ExamPhase::Disabled
    } else if now < exam.start_time {
        ExamPhase::NotStarted
    } else {
        ExamPhase::InProgress
    }
}

pub(crate) fn ensure_in_progress(exam: &Exam, now: PrimitiveDateTime) -> Result<(), LifecycleError> {
    match exam_phase(exam, now) {
        ExamPhase::InProgress => Ok(()),
        _ => Err(LifecycleError::ExamNotInProgress),
    }
}

pub(crate) fn transition(
    from: RecordStatus,
    event: RecordEvent,
) -> Result<RecordStatus, LifecycleError> {
    let to = match event {
        RecordEvent::Start => RecordStatus::InProgress,
        RecordEvent::Submit => RecordStatus::Submitted,
        RecordEvent::TimeOut => RecordStatus::TimedOut,
        RecordEvent::Reset => RecordStatus::NotStarted,
    };

    let allowed = match event {
        RecordEvent::Start => from == RecordStatus::NotStarted,
        RecordEvent::Submit => {
            matches!(from, RecordStatus::NotStarted | RecordStatus::InProgress)
        }
        RecordEvent::TimeOut => from == RecordStatus::InProgress,
        RecordEvent::Reset => true,
    };

    if allowed {
        Ok(to)
    } else {
        Err(LifecycleError::InvalidTransition { from, to })
    }
}

/// Personal deadline of an attempt: its start plus the exam duration. The exam window
/// does not shorten it.
pub(crate) fn record_deadline(
    started_at: PrimitiveDateTime,
    duration_minutes: i32,
) -> PrimitiveDateTime {
    started_at + Duration::minutes(i64::from(duration_minutes))
}

/// Start time for a record that is submitted without ever being started.
pub(crate) fn backfilled_start(exam: &Exam, now: PrimitiveDateTime) -> PrimitiveDateTime {
    let candidate = now - Duration::minutes(i64::from(exam.duration_minutes));
    if candidate > exam.start_time {
        candidate
    } else {
        exam.start_time
    }
}

pub(crate) fn elapsed_minutes(start: PrimitiveDateTime, end: PrimitiveDateTime) -> i32 {
    let minutes = (end - start).whole_minutes().max(0);
    i32::try_from(minutes).unwrap_or(i32::MAX)
}

pub(crate) fn score_rate(score: f64, total: Option<f64>) -> f64 {
    match total {
        Some(total) if total > 0.0 => score / total * 100.0,
        _ => 0.0,
    }
}

pub(crate) fn accuracy(correct: i32, wrong: i32) -> f64 {
    let answered = correct + wrong;
    if answered <= 0 {
        return 0.0;
    }
    f64::from(correct) / f64::from(answered) * 100.0
}

pub(crate) fn percentage(part: i64, whole: i64) -> f64 {
    if whole <= 0 {
        return 0.0;
    }
    part as f64 / whole as f64 * 100.0
}

pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AnswerOutcome {
    Correct,
    Wrong,
    Blank,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ScoreSummary {
    pub(crate) score: f64,
    pub(crate) correct_count: i32,
    pub(crate) wrong_count: i32,
    pub(crate) unanswered_count: i32,
}

/// Aggregates graded answers into a record score. Only questions linked to the exam
/// contribute points, and the result is capped at the exam's total.
pub(crate) fn summarize<'a>(
    question_scores: &HashMap<&str, f64>,
    graded: impl IntoIterator<Item = (&'a str, AnswerOutcome)>,
    question_count: i32,
    total_score: f64,
) -> ScoreSummary {
    let mut score = 0.0;
    let mut correct_count = 0;
    let mut wrong_count = 0;

    for (question_id, outcome) in graded {
        match outcome {
            AnswerOutcome::Correct => {
                correct_count += 1;
                score += question_scores.get(question_id).copied().unwrap_or(0.0);
            }
            AnswerOutcome::Wrong => wrong_count += 1,
            AnswerOutcome::Blank => {}
        }
    }

    let unanswered_count = (question_count - correct_count - wrong_count).max(0);
    let score = if total_score > 0.0 { score.min(total_score) } else { score };

    ScoreSummary { score: score.max(0.0), correct_count, wrong_count, unanswered_count }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct RecordSample {
    pub(crate) status: RecordStatus,
    pub(crate) score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct ExamStatistics {
    pub(crate) total_participants: i64,
    pub(crate) completed_count: i64,
    pub(crate) passed_count: i64,
    pub(crate) failed_count: i64,
    pub(crate) average_score: f64,
    pub(crate) max_score: f64,
    pub(crate) min_score: f64,
    pub(crate) completion_rate: f64,
    pub(crate) pass_rate: f64,
}

pub(crate) fn exam_statistics(samples: &[RecordSample], pass_score: f64) -> ExamStatistics {
    let total_participants = samples.len() as i64;
    let completed: Vec<f64> =
        samples.iter().filter(|sample| sample.status.is_completed()).map(|s| s.score).collect();
    let completed_count = completed.len() as i64;
    let passed_count = completed.iter().filter(|score| **score >= pass_score).count() as i64;

    let (average_score, max_score, min_score) = if completed.is_empty() {
        (0.0, 0.0, 0.0)
    } else {
        let sum: f64 = completed.iter().sum();
        let max = completed.iter().copied().fold(f64::MIN, f64::max);
        let min = completed.iter().copied().fold(f64::MAX, f64::min);
        (sum / completed.len() as f64, max, min)
    };

    ExamStatistics {
        total_participants,
        completed_count,
        passed_count,
        failed_count: completed_count - passed_count,
        average_score: round1(average_score),
        max_score,
        min_score,
        completion_rate: round1(percentage(completed_count, total_participants)),
        pass_rate: round1(percentage(passed_count, completed_count)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn exam(status: ExamStatus) -> Exam {
        Exam {
            id: "exam-1".to_string(),
            title: "Rust basics".to_string(),
            description: None,
            start_time: datetime!(2025-03-01 09:00),
            end_time: datetime!(2025-03-01 12:00),
            duration_minutes: 90,
            total_score: 100.0,
            pass_score: 60.0,
            question_count: 4,
            status,
            created_by: None,
            created_at: datetime!(2025-02-01 00:00),
            updated_at: datetime!(2025-02-01 00:00),
        }
    }

    #[test]
    fn schedule_rejects_inverted_window() {
        let result = validate_schedule(
            datetime!(2025-03-01 12:00),
            datetime!(2025-03-01 09:00),
            60,
            datetime!(2025-02-01 00:00),
            Duration::minutes(1),
            ScheduleMode::Update,
        );
        assert_eq!(result, Err(LifecycleError::StartAfterEnd));
    }

    #[test]
    fn schedule_rejects_past_start_only_on_create() {
        let now = datetime!(2025-03-01 10:00);
        let start = datetime!(2025-03-01 09:58);
        let end = datetime!(2025-03-01 12:00);

        let created =
            validate_schedule(start, end, 60, now, Duration::minutes(1), ScheduleMode::Create);
        assert_eq!(created, Err(LifecycleError::StartInPast));

        let updated =
            validate_schedule(start, end, 60, now, Duration::minutes(1), ScheduleMode::Update);
        assert_eq!(updated, Ok(()));

        let within_grace = validate_schedule(
            datetime!(2025-03-01 09:59:30),
            end,
            60,
            now,
            Duration::minutes(1),
            ScheduleMode::Create,
        );
        assert_eq!(within_grace, Ok(()));
    }

    #[test]
    fn schedule_requires_window_to_fit_duration() {
        let result = validate_schedule(
            datetime!(2025-03-01 09:00),
            datetime!(2025-03-01 09:45),
            60,
            datetime!(2025-02-01 00:00),
            Duration::minutes(1),
            ScheduleMode::Create,
        );
        assert_eq!(result, Err(LifecycleError::WindowTooShort { window: 45, duration: 60 }));

        let zero = validate_schedule(
            datetime!(2025-03-01 09:00),
            datetime!(2025-03-01 09:45),
            0,
            datetime!(2025-02-01 00:00),
            Duration::minutes(1),
            ScheduleMode::Create,
        );
        assert_eq!(zero, Err(LifecycleError::InvalidDuration));
    }

    #[test]
    fn phase_follows_status_and_window() {
        let enabled = exam(ExamStatus::Enabled);
        assert_eq!(exam_phase(&enabled, datetime!(2025-03-01 08:59)), ExamPhase::NotStarted);
        assert_eq!(exam_phase(&enabled, datetime!(2025-03-01 09:00)), ExamPhase::InProgress);
        assert_eq!(exam_phase(&enabled, datetime!(2025-03-01 12:00)), ExamPhase::Finished);

        let disabled = exam(ExamStatus::Disabled);
        assert_eq!(exam_phase(&disabled, datetime!(2025-03-01 10:00)), ExamPhase::Disabled);

        let finished = exam(ExamStatus::Finished);
        assert_eq!(exam_phase(&finished, datetime!(2025-03-01 10:00)), ExamPhase::Finished);
        assert_eq!(
            ensure_in_progress(&finished, datetime!(2025-03-01 10:00)),
            Err(LifecycleError::ExamNotInProgress)
        );
    }

    #[test]
    fn record_transitions() {
        use RecordStatus::*;

        assert_eq!(transition(NotStarted, RecordEvent::Start), Ok(InProgress));
        assert_eq!(transition(InProgress, RecordEvent::Submit), Ok(Submitted));
        assert_eq!(transition(NotStarted, RecordEvent::Submit), Ok(Submitted));
        assert_eq!(transition(InProgress, RecordEvent::TimeOut), Ok(TimedOut));
        assert_eq!(transition(TimedOut, RecordEvent::Reset), Ok(NotStarted));

        assert_eq!(
            transition(Submitted, RecordEvent::Submit),
            Err(LifecycleError::InvalidTransition { from: Submitted, to: Submitted })
        );
        assert!(transition(NotStarted, RecordEvent::TimeOut).is_err());
        assert!(transition(TimedOut, RecordEvent::Start).is_err());
    }

    #[test]
    fn deadline_runs_the_full_duration_past_the_window() {
        assert_eq!(
            record_deadline(datetime!(2025-03-01 09:30), 90),
            datetime!(2025-03-01 11:00)
        );
        // Window closes at 12:00; a late starter still gets the full 90 minutes.
        assert_eq!(
            record_deadline(datetime!(2025-03-01 11:30), 90),
            datetime!(2025-03-01 13:00)
        );
    }

    #[test]
    fn backfilled_start_never_precedes_exam_start() {
        let exam = exam(ExamStatus::Enabled);
        assert_eq!(
            backfilled_start(&exam, datetime!(2025-03-01 11:00)),
            datetime!(2025-03-01 09:30)
        );
        assert_eq!(
            backfilled_start(&exam, datetime!(2025-03-01 09:20)),
            datetime!(2025-03-01 09:00)
        );
    }

    #[test]
    fn rates_handle_empty_denominators() {
        assert_eq!(score_rate(45.0, Some(90.0)), 50.0);
        assert_eq!(score_rate(45.0, Some(0.0)), 0.0);
        assert_eq!(score_rate(45.0, None), 0.0);
        assert_eq!(accuracy(3, 1), 75.0);
        assert_eq!(accuracy(0, 0), 0.0);
        assert_eq!(elapsed_minutes(datetime!(2025-03-01 10:00), datetime!(2025-03-01 09:00)), 0);
        assert_eq!(round1(66.666), 66.7);
    }

    #[test]
    fn summarize_scores_only_linked_correct_answers() {
        let scores = HashMap::from([("q1", 10.0), ("q2", 20.0), ("q3", 30.0)]);
        let graded = vec![
            ("q1", AnswerOutcome::Correct),
            ("q2", AnswerOutcome::Wrong),
            ("q3", AnswerOutcome::Blank),
            ("gone", AnswerOutcome::Correct),
        ];

        let summary = summarize(&scores, graded, 4, 100.0);
        assert_eq!(summary.score, 10.0);
        assert_eq!(summary.correct_count, 2);
        assert_eq!(summary.wrong_count, 1);
        assert_eq!(summary.unanswered_count, 1);
    }

    #[test]
    fn summarize_caps_score_at_total() {
        let scores = HashMap::from([("q1", 80.0), ("q2", 80.0)]);
        let graded = vec![("q1", AnswerOutcome::Correct), ("q2", AnswerOutcome::Correct)];
        let summary = summarize(&scores, graded, 2, 100.0);
        assert_eq!(summary.score, 100.0);
        assert_eq!(summary.unanswered_count, 0);
    }

    #[test]
    fn statistics_count_submitted_and_timed_out_as_completed() {
        let samples = [
            RecordSample { status: RecordStatus::Submitted, score: 80.0 },
            RecordSample { status: RecordStatus::TimedOut, score: 40.0 },
            RecordSample { status: RecordStatus::Submitted, score: 60.0 },
            RecordSample { status: RecordStatus::InProgress, score: 0.0 },
        ];

        let stats = exam_statistics(&samples, 60.0);
        assert_eq!(stats.total_participants, 4);
        assert_eq!(stats.completed_count, 3);
        assert_eq!(stats.passed_count, 2);
        assert_eq!(stats.failed_count, 1);
        assert_eq!(stats.average_score, 60.0);
        assert_eq!(stats.max_score, 80.0);
        assert_eq!(stats.min_score, 40.0);
        assert_eq!(stats.completion_rate, 75.0);
        assert_eq!(stats.pass_rate, 66.7);
    }

    #[test]
    fn statistics_without_records_are_zero() {
        let stats = exam_statistics(&[], 60.0);
        assert_eq!(stats.total_participants, 0);
        assert_eq!(stats.completion_rate, 0.0);
        assert_eq!(stats.pass_rate, 0.0);
        assert_eq!(stats.max_score, 0.0);
    }
}
