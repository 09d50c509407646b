// --------------------------------------------------
// Handles execution lifecycle endpoints.
//
// Responsibilities:
// - start / pause / resume / skip / complete per (task, date)
// - completed-task snapshots (denormalized, survive task deletion)
//
// Every transition runs under the store's write lock: the prior-status
// check and the persisted result are one atomic step, so racing calls on
// the same (task, user, date) key cannot both pass validation.
// --------------------------------------------------

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::analytics;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::execution::{self, CompletionInput, TransitionError};
use crate::models::{CompletedTask, ExecutionRecord};
use crate::store::Store;

impl From<TransitionError> for ApiError {
    fn from(err: TransitionError) -> Self {
        ApiError::State(err.to_string())
    }
}

#[derive(Debug, Deserialize)]
pub struct TransitionInput {
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct SkipInput {
    pub date: NaiveDate,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CompleteInput {
    pub date: NaiveDate,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i64>,
    pub completion_percentage: Option<f64>,
    pub notes: Option<String>,
}

/// Fetch-or-create the record for (task, caller, date), apply one state
/// machine step, and persist. A task owned by someone else reads as absent
/// so existence is never confirmed across users.
async fn apply_transition(
    store: &Arc<Store>,
    user: &AuthUser,
    task_id: Uuid,
    date: NaiveDate,
    step: impl FnOnce(&mut ExecutionRecord) -> Result<(), TransitionError>,
) -> Result<ExecutionRecord, ApiError> {
    let user_id = user.id;
    store
        .write(move |db| {
            let Some(task) = db.task(task_id).filter(|t| t.owner_id == user_id) else {
                return Err(ApiError::NotFound("task not found".to_string()));
            };

            let mut record = db
                .execution(task_id, user_id, date)
                .cloned()
                .unwrap_or_else(|| execution::blank(task, user_id, date));
            step(&mut record)?;

            db.upsert_execution(record.clone());
            Ok(record)
        })
        .await
}

/// Rolling task stats are recomputed from the full history off the request
/// path; a failed recompute is deferred, never surfaced to the caller.
fn spawn_stats_recompute(store: Arc<Store>, task_id: Uuid) {
    tokio::spawn(async move {
        let result = store
            .write(|db| {
                let history = db.task_history(task_id);
                if let Some(task) = db.task_mut(task_id) {
                    analytics::recompute_task_stats(&mut task.stats, &history, Utc::now());
                }
                Ok(())
            })
            .await;
        if let Err(err) = result {
            tracing::warn!(task = %task_id, %err, "task stats recompute deferred");
        }
    });
}

// -----------------------------
// POST /api/executions/:task_id/start
// -----------------------------
pub async fn start_execution(
    State(store): State<Arc<Store>>,
    user: AuthUser,
    Path(task_id): Path<Uuid>,
    Json(input): Json<TransitionInput>,
) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now();
    let record = apply_transition(&store, &user, task_id, input.date, |rec| {
        execution::start(rec, now)
    })
    .await?;
    Ok(Json(record))
}

// -----------------------------
// POST /api/executions/:task_id/pause
// -----------------------------
pub async fn pause_execution(
    State(store): State<Arc<Store>>,
    user: AuthUser,
    Path(task_id): Path<Uuid>,
    Json(input): Json<TransitionInput>,
) -> Result<impl IntoResponse, ApiError> {
    let record = apply_transition(&store, &user, task_id, input.date, execution::pause).await?;
    Ok(Json(record))
}

// -----------------------------
// POST /api/executions/:task_id/resume
// -----------------------------
pub async fn resume_execution(
    State(store): State<Arc<Store>>,
    user: AuthUser,
    Path(task_id): Path<Uuid>,
    Json(input): Json<TransitionInput>,
) -> Result<impl IntoResponse, ApiError> {
    let record = apply_transition(&store, &user, task_id, input.date, execution::resume).await?;
    Ok(Json(record))
}

// -----------------------------
// POST /api/executions/:task_id/skip
// Terminal; triggers the rolling-stat recompute.
// -----------------------------
pub async fn skip_execution(
    State(store): State<Arc<Store>>,
    user: AuthUser,
    Path(task_id): Path<Uuid>,
    Json(input): Json<SkipInput>,
) -> Result<impl IntoResponse, ApiError> {
    let record = apply_transition(&store, &user, task_id, input.date, |rec| {
        execution::skip(rec, input.notes)
    })
    .await?;

    spawn_stats_recompute(store, task_id);
    Ok(Json(record))
}

// -----------------------------
// POST /api/executions/:task_id/complete
// Terminal; bumps the owner's counters and triggers the recompute. The
// counter increments sit inside the same conditional write as the status
// check, so two racing completes increment exactly once.
// -----------------------------
pub async fn complete_execution(
    State(store): State<Arc<Store>>,
    user: AuthUser,
    Path(task_id): Path<Uuid>,
    Json(input): Json<CompleteInput>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(pct) = input.completion_percentage {
        if !(0.0..=100.0).contains(&pct) {
            return Err(ApiError::Validation(
                "completion_percentage must be between 0 and 100".to_string(),
            ));
        }
    }

    let now = Utc::now();
    let user_id = user.id;
    let completion = CompletionInput {
        end_time: input.end_time,
        duration_minutes: input.duration_minutes,
        completion_percentage: input.completion_percentage,
        notes: input.notes,
    };

    let record = store
        .write(move |db| {
            let Some(task) = db.task(task_id).filter(|t| t.owner_id == user_id) else {
                return Err(ApiError::NotFound("task not found".to_string()));
            };

            let mut record = db
                .execution(task_id, user_id, input.date)
                .cloned()
                .unwrap_or_else(|| execution::blank(task, user_id, input.date));
            execution::complete(&mut record, completion, now)?;

            if let Some(owner) = db.user_mut(user_id) {
                owner.total_tasks_completed += 1;
                owner.total_hours_logged += record.actual_duration_minutes as f64 / 60.0;
            }
            db.upsert_execution(record.clone());
            Ok(record)
        })
        .await?;

    tracing::info!(task = %task_id, date = %input.date, "execution completed");
    spawn_stats_recompute(store, task_id);
    Ok(Json(record))
}

#[derive(Debug, Deserialize)]
pub struct CompleteTaskInput {
    pub task_id: Uuid,
    pub completion_date: NaiveDate,
    pub notes: Option<String>,
    pub completion_type: String,
}

// -----------------------------
// POST /api/complete-task
// Materializes a point-in-time snapshot of the task, separate from the
// execution record. 404 when the task id is unknown.
// -----------------------------
pub async fn complete_task_snapshot(
    State(store): State<Arc<Store>>,
    user: AuthUser,
    Json(input): Json<CompleteTaskInput>,
) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now();
    let user_id = user.id;
    let snapshot = store
        .write(move |db| {
            let Some(task) = db.task(input.task_id).filter(|t| t.owner_id == user_id) else {
                return Err(ApiError::NotFound("task not found".to_string()));
            };

            let snapshot = CompletedTask {
                id: Uuid::new_v4(),
                task_id: task.id,
                owner_id: task.owner_id,
                title: task.title.clone(),
                category: task.category.clone(),
                priority: task.priority,
                planned_minutes: task.planned_minutes().unwrap_or(0),
                completion_date: input.completion_date,
                completed_at: now,
                completion_type: input.completion_type,
                notes: input.notes,
            };
            db.completed_tasks.push(snapshot.clone());
            Ok(snapshot)
        })
        .await?;

    Ok((StatusCode::CREATED, Json(snapshot)))
}
