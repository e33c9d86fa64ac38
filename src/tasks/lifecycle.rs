use std::collections::HashMap;

use anyhow::{Context, Result};
use time::PrimitiveDateTime;

use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::Exam;
use crate::repositories;
use crate::services::lifecycle;
use crate::services::record_finalize::{finalize_record, FinalizeMode};

const TIMEOUT_BATCH_SIZE: i64 = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct SweepSummary {
    pub(crate) finished_exams: usize,
    pub(crate) timed_out_records: usize,
}

/// One pass of the lifecycle sweep: close exams past their end time, then time out
/// attempts past their personal deadline.
pub(crate) async fn run_sweep(state: &AppState) -> Result<SweepSummary> {
    let now = primitive_now_utc();
    let finished_exams = finish_expired_exams(state, now).await?;
    let timed_out_records = time_out_overdue_records(state, now).await?;

    let summary = SweepSummary { finished_exams, timed_out_records };
    tracing::info!(
        finished_exams = summary.finished_exams,
        timed_out_records = summary.timed_out_records,
        "Lifecycle sweep completed"
    );

    Ok(summary)
}

pub(crate) async fn finish_expired_exams(state: &AppState, now: PrimitiveDateTime) -> Result<usize> {
    let finished = repositories::exams::finish_expired(state.db(), now)
        .await
        .context("Failed to finish expired exams")?;

    for exam_id in &finished {
        tracing::info!(exam_id = %exam_id, "Exam finished");
    }
    metrics::counter!("exams_finished_total").increment(finished.len() as u64);

    Ok(finished.len())
}

pub(crate) async fn time_out_overdue_records(
    state: &AppState,
    now: PrimitiveDateTime,
) -> Result<usize> {
    let mut timed_out = 0;
    let mut exams: HashMap<String, Exam> = HashMap::new();

    loop {
        let mut tx = state.db().begin().await.context("Failed to start transaction")?;

        let records = repositories::exam_records::lock_overdue(&mut *tx, now, TIMEOUT_BATCH_SIZE)
            .await
            .context("Failed to fetch overdue records")?;
        let batch_len = records.len();

        for record in records {
            let Some(start_time) = record.start_time else {
                continue;
            };

            if !exams.contains_key(&record.exam_id) {
                let exam = repositories::exams::find_by_id(&mut *tx, &record.exam_id)
                    .await
                    .context("Failed to fetch exam")?
                    .with_context(|| format!("Exam {} not found", record.exam_id))?;
                exams.insert(record.exam_id.clone(), exam);
            }
            let Some(exam) = exams.get(&record.exam_id) else {
                continue;
            };

            let deadline = lifecycle::record_deadline(start_time, exam.duration_minutes);
            finalize_record(&mut tx, exam, &record, None, FinalizeMode::TimeOut, deadline)
                .await
                .with_context(|| format!("Failed to time out record {}", record.id))?;
            timed_out += 1;
        }

        tx.commit().await.context("Failed to commit timed out records")?;

        if batch_len < TIMEOUT_BATCH_SIZE as usize {
            break;
        }
    }

    Ok(timed_out)
}
