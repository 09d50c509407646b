/*
Day reconciliation: fold a user's due tasks and their execution records
into per-status buckets plus the day's statistics block.
Module was independently written from HTTP / Axum for testing
*/

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::models::{parse_hhmm, ExecutionRecord, ExecutionStatus, Task};
use crate::recurrence;

// One due task with whatever execution state exists for the day.
#[derive(Debug, Clone, Serialize)]
pub struct DayEntry {
    pub task: Task,
    pub execution: Option<ExecutionRecord>,
    pub is_overdue: bool,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct DayStatistics {
    pub total_tasks: u32,
    pub completed_tasks: u32,
    pub pending_tasks: u32,
    pub skipped_tasks: u32,
    pub overdue_tasks: u32,
    /// Completed / total, percent. 0 when no tasks are due.
    pub completion_rate: f64,
    pub total_planned_minutes: i64,
    /// Actual minutes from Completed and InProgress executions only.
    pub total_actual_minutes: i64,
    /// Actual / planned, percent. 0 when nothing is planned.
    pub productivity_score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DayView {
    pub date: NaiveDate,
    pub upcoming: Vec<DayEntry>,
    pub in_progress: Vec<DayEntry>,
    pub completed: Vec<DayEntry>,
    pub skipped: Vec<DayEntry>,
    pub statistics: DayStatistics,
}

impl DayView {
    fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            upcoming: Vec::new(),
            in_progress: Vec::new(),
            completed: Vec::new(),
            skipped: Vec::new(),
            statistics: DayStatistics::default(),
        }
    }
}

/// Filter `tasks` down to the ones due on `date`: active, valid for the
/// date range, and matched by their recurrence rule. This owns the range
/// pre-filter the evaluator itself does not repeat.
pub fn due_tasks(tasks: &[Task], date: NaiveDate) -> Vec<Task> {
    tasks
        .iter()
        .filter(|t| t.is_active)
        .filter(|t| t.from_date <= date && date <= t.to_date)
        .filter(|t| recurrence::is_scheduled(t, date))
        .cloned()
        .collect()
}

// An upcoming task is overdue once `now` passes its wall-clock start on the
// reconciled date. Read-time property, never persisted.
fn is_overdue(task: &Task, date: NaiveDate, now: DateTime<Utc>) -> bool {
    match parse_hhmm(&task.start_time) {
        Some(start) => now > date.and_time(start).and_utc(),
        None => false,
    }
}

/// Partition due tasks by execution status and compute the statistics
/// block. An absent record means NotStarted; Paused buckets as InProgress
/// for day-view purposes. Zero due tasks yields an empty view, not an
/// error.
pub fn reconcile_day(
    due: Vec<Task>,
    executions: &[ExecutionRecord],
    date: NaiveDate,
    now: DateTime<Utc>,
) -> DayView {
    let mut view = DayView::empty(date);

    for task in due {
        let execution = executions
            .iter()
            .find(|e| e.task_id == task.id && e.execution_date == date)
            .cloned();
        let status = execution
            .as_ref()
            .map(|e| e.status)
            .unwrap_or(ExecutionStatus::NotStarted);

        let planned = execution
            .as_ref()
            .map(|e| e.expected_duration_minutes)
            .or_else(|| task.planned_minutes())
            .unwrap_or(0);
        view.statistics.total_planned_minutes += planned;
        view.statistics.total_tasks += 1;

        match status {
            ExecutionStatus::NotStarted => {
                let overdue = is_overdue(&task, date, now);
                if overdue {
                    view.statistics.overdue_tasks += 1;
                }
                view.statistics.pending_tasks += 1;
                view.upcoming.push(DayEntry {
                    task,
                    execution,
                    is_overdue: overdue,
                });
            }
            ExecutionStatus::InProgress | ExecutionStatus::Paused => {
                view.statistics.pending_tasks += 1;
                view.statistics.total_actual_minutes += execution
                    .as_ref()
                    .map(|e| e.actual_duration_minutes)
                    .unwrap_or(0);
                view.in_progress.push(DayEntry {
                    task,
                    execution,
                    is_overdue: false,
                });
            }
            ExecutionStatus::Completed => {
                view.statistics.completed_tasks += 1;
                view.statistics.total_actual_minutes += execution
                    .as_ref()
                    .map(|e| e.actual_duration_minutes)
                    .unwrap_or(0);
                view.completed.push(DayEntry {
                    task,
                    execution,
                    is_overdue: false,
                });
            }
            ExecutionStatus::Skipped => {
                view.statistics.skipped_tasks += 1;
                view.skipped.push(DayEntry {
                    task,
                    execution,
                    is_overdue: false,
                });
            }
        }
    }

    let stats = &mut view.statistics;
    if stats.total_tasks > 0 {
        stats.completion_rate = stats.completed_tasks as f64 / stats.total_tasks as f64 * 100.0;
    }
    if stats.total_planned_minutes > 0 {
        stats.productivity_score =
            stats.total_actual_minutes as f64 / stats.total_planned_minutes as f64 * 100.0;
    }

    view
}
