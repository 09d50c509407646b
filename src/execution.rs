/*
Execution state machine for a single (task, owner, date) record.
Module was independently written from HTTP / Axum for testing

States: NotStarted -> InProgress -> {Paused, Completed, Skipped};
Paused -> {InProgress, Skipped, Completed}. Completed and Skipped are
terminal. NotStarted is virtual: the record is created lazily on the first
transition and only persisted once it carries a real status.
*/

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{ExecutionRecord, ExecutionStatus, Task};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    /// The record already reached Completed or Skipped.
    #[error("execution is already {0}")]
    Terminal(&'static str),

    #[error("cannot {action} an execution that is {from}")]
    Illegal {
        action: &'static str,
        from: &'static str,
    },
}

fn status_name(status: ExecutionStatus) -> &'static str {
    match status {
        ExecutionStatus::NotStarted => "not started",
        ExecutionStatus::InProgress => "in progress",
        ExecutionStatus::Paused => "paused",
        ExecutionStatus::Completed => "completed",
        ExecutionStatus::Skipped => "skipped",
    }
}

fn reject_terminal(rec: &ExecutionRecord) -> Result<(), TransitionError> {
    if rec.status.is_terminal() {
        return Err(TransitionError::Terminal(status_name(rec.status)));
    }
    Ok(())
}

/// Fresh record for a (task, owner, date) key that has no persisted state
/// yet. Expected duration is snapshotted from the task here, not read live.
pub fn blank(task: &Task, owner_id: Uuid, date: NaiveDate) -> ExecutionRecord {
    ExecutionRecord {
        task_id: task.id,
        owner_id,
        execution_date: date,
        status: ExecutionStatus::NotStarted,
        actual_start_time: None,
        actual_end_time: None,
        expected_duration_minutes: task.planned_minutes().unwrap_or(0),
        actual_duration_minutes: 0,
        completion_percentage: 0.0,
        efficiency_score: 0.0,
        interruption_count: 0,
        notes: None,
    }
}

/// NotStarted | Paused -> InProgress. Sets the start timestamp only if it
/// was never set, so a resume-via-start cannot rewrite it.
pub fn start(rec: &mut ExecutionRecord, now: DateTime<Utc>) -> Result<(), TransitionError> {
    reject_terminal(rec)?;
    if rec.status == ExecutionStatus::InProgress {
        return Err(TransitionError::Illegal {
            action: "start",
            from: status_name(rec.status),
        });
    }
    rec.status = ExecutionStatus::InProgress;
    if rec.actual_start_time.is_none() {
        rec.actual_start_time = Some(now);
    }
    Ok(())
}

/// InProgress -> Paused.
pub fn pause(rec: &mut ExecutionRecord) -> Result<(), TransitionError> {
    reject_terminal(rec)?;
    if rec.status != ExecutionStatus::InProgress {
        return Err(TransitionError::Illegal {
            action: "pause",
            from: status_name(rec.status),
        });
    }
    rec.status = ExecutionStatus::Paused;
    Ok(())
}

/// Paused -> InProgress; each resume counts one interruption.
pub fn resume(rec: &mut ExecutionRecord) -> Result<(), TransitionError> {
    reject_terminal(rec)?;
    if rec.status != ExecutionStatus::Paused {
        return Err(TransitionError::Illegal {
            action: "resume",
            from: status_name(rec.status),
        });
    }
    rec.status = ExecutionStatus::InProgress;
    rec.interruption_count += 1;
    Ok(())
}

/// Any non-terminal state -> Skipped. Terminal.
pub fn skip(rec: &mut ExecutionRecord, notes: Option<String>) -> Result<(), TransitionError> {
    reject_terminal(rec)?;
    rec.status = ExecutionStatus::Skipped;
    if notes.is_some() {
        rec.notes = notes;
    }
    Ok(())
}

#[derive(Debug, Default, Clone)]
pub struct CompletionInput {
    /// Caller-supplied end timestamp; defaults to now.
    pub end_time: Option<DateTime<Utc>>,
    /// Caller-supplied duration; defaults to (end - start) in minutes.
    pub duration_minutes: Option<i64>,
    pub completion_percentage: Option<f64>,
    pub notes: Option<String>,
}

/// Any non-terminal state -> Completed. Terminal.
///
/// Efficiency is actual/expected minutes; 1.0 when either side is
/// unmeasurable (no start timestamp and no supplied duration, or an
/// expected duration of zero).
pub fn complete(
    rec: &mut ExecutionRecord,
    input: CompletionInput,
    now: DateTime<Utc>,
) -> Result<(), TransitionError> {
    reject_terminal(rec)?;

    let end = input.end_time.unwrap_or(now);
    let duration = input
        .duration_minutes
        .or_else(|| rec.actual_start_time.map(|s| (end - s).num_minutes()))
        .unwrap_or(0);

    rec.status = ExecutionStatus::Completed;
    rec.actual_end_time = Some(end);
    rec.actual_duration_minutes = duration.max(0);
    rec.completion_percentage = input.completion_percentage.unwrap_or(100.0);
    rec.efficiency_score = if rec.expected_duration_minutes > 0 && rec.actual_duration_minutes > 0 {
        rec.actual_duration_minutes as f64 / rec.expected_duration_minutes as f64
    } else {
        1.0
    };
    if input.notes.is_some() {
        rec.notes = input.notes;
    }
    Ok(())
}
