// --------------------------------------------------
// Handles API endpoints related to task CRUD operations.
//
// Responsibilities:
// - Create / read / update / delete task definitions
// - Filtered + sorted task listing for a given date
// - "Upcoming" query: tasks the recurrence rule puts on a date
// --------------------------------------------------

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::{parse_hhmm, ExecutionStatus, Priority, Recurrence, Task, TaskStats};
use crate::reconcile;
use crate::store::Store;

#[derive(Debug, Deserialize)]
pub struct CreateTaskInput {
    pub title: String,
    pub description: Option<String>,
    pub start_time: String, // "HH:MM"
    pub end_time: String,   // "HH:MM"
    pub recurrence: Recurrence,
    #[serde(default)]
    pub custom_days: Vec<Weekday>,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub priority: Priority,
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub color_hex: Option<String>,
    pub icon_name: Option<String>,
}

fn validate_task_fields(
    title: &str,
    start_time: &str,
    end_time: &str,
    from_date: NaiveDate,
    to_date: NaiveDate,
) -> Result<(), ApiError> {
    if title.trim().is_empty() {
        return Err(ApiError::Validation("title required".to_string()));
    }
    if parse_hhmm(start_time).is_none() {
        return Err(ApiError::Validation("invalid start_time, expected HH:MM".to_string()));
    }
    if parse_hhmm(end_time).is_none() {
        return Err(ApiError::Validation("invalid end_time, expected HH:MM".to_string()));
    }
    if start_time == end_time {
        return Err(ApiError::Validation("task window has zero length".to_string()));
    }
    if from_date > to_date {
        return Err(ApiError::Validation("from_date must not be after to_date".to_string()));
    }
    Ok(())
}

// -----------------------------
// POST /api/tasks
// Creates a task owned by the caller; bumps their created counter.
// -----------------------------
pub async fn create_task(
    State(store): State<Arc<Store>>,
    user: AuthUser,
    Json(input): Json<CreateTaskInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_task_fields(
        &input.title,
        &input.start_time,
        &input.end_time,
        input.from_date,
        input.to_date,
    )?;

    let task = Task {
        id: Uuid::new_v4(),
        owner_id: user.id,
        title: input.title,
        description: input.description,
        start_time: input.start_time,
        end_time: input.end_time,
        recurrence: input.recurrence,
        custom_days: input.custom_days,
        from_date: input.from_date,
        to_date: input.to_date,
        is_active: true,
        priority: input.priority,
        category: input.category,
        tags: input.tags,
        color_hex: input.color_hex,
        icon_name: input.icon_name,
        created_at: Utc::now(),
        stats: TaskStats::default(),
    };

    let created = store
        .write(|db| {
            if let Some(owner) = db.user_mut(user.id) {
                owner.total_tasks_created += 1;
            }
            db.tasks.push(task.clone());
            Ok(task)
        })
        .await?;

    tracing::info!(task = %created.id, owner = %created.owner_id, "task created");
    Ok((StatusCode::CREATED, Json(created)))
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    #[default]
    All,
    Pending,
    InProgress,
    Completed,
    Skipped,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    StartTime,
    Priority,
    CreatedAt,
    Title,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Deserialize)]
pub struct TasksQuery {
    /// Date the status filter is resolved against; defaults to today.
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub status: StatusFilter,
    #[serde(default)]
    pub sort_by: SortBy,
    #[serde(default)]
    pub order: SortOrder,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct TasksResponse {
    pub date: NaiveDate,
    pub total: usize,
    pub tasks: Vec<Task>,
}

// Start times compare as parsed wall-clock values, so an unpadded "9:00"
// still sorts before "10:00".
fn task_order(a: &Task, b: &Task, sort_by: SortBy) -> std::cmp::Ordering {
    match sort_by {
        SortBy::StartTime => parse_hhmm(&a.start_time).cmp(&parse_hhmm(&b.start_time)),
        SortBy::Priority => a.priority.cmp(&b.priority),
        SortBy::CreatedAt => a.created_at.cmp(&b.created_at),
        SortBy::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
    }
}

// -----------------------------
// GET /api/tasks
// Lists the caller's tasks, filtered by that date's execution status,
// sorted, and optionally paginated.
// -----------------------------
pub async fn list_tasks(
    State(store): State<Arc<Store>>,
    user: AuthUser,
    Query(q): Query<TasksQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let date = q.date.unwrap_or_else(|| Utc::now().date_naive());

    let mut tasks: Vec<Task> = store
        .read(|db| {
            db.tasks
                .iter()
                .filter(|t| t.owner_id == user.id)
                .filter(|t| {
                    if q.status == StatusFilter::All {
                        return true;
                    }
                    let status = db
                        .execution(t.id, user.id, date)
                        .map(|e| e.status)
                        .unwrap_or(ExecutionStatus::NotStarted);
                    match q.status {
                        StatusFilter::All => true,
                        StatusFilter::Pending => status == ExecutionStatus::NotStarted,
                        StatusFilter::InProgress => {
                            status == ExecutionStatus::InProgress
                                || status == ExecutionStatus::Paused
                        }
                        StatusFilter::Completed => status == ExecutionStatus::Completed,
                        StatusFilter::Skipped => status == ExecutionStatus::Skipped,
                    }
                })
                .cloned()
                .collect()
        })
        .await;

    tasks.sort_by(|a, b| {
        let ord = task_order(a, b, q.sort_by);
        match q.order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    });

    let total = tasks.len();
    if let (Some(page), Some(page_size)) = (q.page, q.page_size) {
        let start = page.saturating_sub(1).saturating_mul(page_size).min(total);
        let end = start.saturating_add(page_size).min(total);
        tasks = tasks[start..end].to_vec();
    }

    Ok(Json(TasksResponse { date, total, tasks }))
}

#[derive(Debug, Deserialize)]
pub struct UpcomingQuery {
    pub date: NaiveDate,
}

// -----------------------------
// GET /api/tasks/upcoming
// Tasks whose recurrence rule puts them on the given date.
// -----------------------------
pub async fn upcoming_tasks(
    State(store): State<Arc<Store>>,
    user: AuthUser,
    Query(q): Query<UpcomingQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let due = store
        .read(|db| {
            let mine: Vec<Task> = db
                .tasks
                .iter()
                .filter(|t| t.owner_id == user.id)
                .cloned()
                .collect();
            reconcile::due_tasks(&mine, q.date)
        })
        .await;

    Ok(Json(TasksResponse {
        date: q.date,
        total: due.len(),
        tasks: due,
    }))
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskInput {
    pub title: String,
    pub description: Option<String>,
    pub start_time: String,
    pub end_time: String,
    pub recurrence: Recurrence,
    #[serde(default)]
    pub custom_days: Vec<Weekday>,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub is_active: bool,
    pub priority: Priority,
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub color_hex: Option<String>,
    pub icon_name: Option<String>,
}

// -----------------------------
// PUT /api/tasks/:id
// Updates a task definition. Rolling stats, owner, and creation time are
// never taken from the payload. A task owned by someone else reads as
// absent.
// -----------------------------
pub async fn update_task(
    State(store): State<Arc<Store>>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateTaskInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_task_fields(
        &input.title,
        &input.start_time,
        &input.end_time,
        input.from_date,
        input.to_date,
    )?;

    let updated = store
        .write(|db| {
            let Some(t) = db.task_mut(id).filter(|t| t.owner_id == user.id) else {
                return Err(ApiError::NotFound("task not found".to_string()));
            };

            t.title = input.title.clone();
            t.description = input.description.clone();
            t.start_time = input.start_time.clone();
            t.end_time = input.end_time.clone();
            t.recurrence = input.recurrence;
            t.custom_days = input.custom_days.clone();
            t.from_date = input.from_date;
            t.to_date = input.to_date;
            t.is_active = input.is_active;
            t.priority = input.priority;
            t.category = input.category.clone();
            t.tags = input.tags.clone();
            t.color_hex = input.color_hex.clone();
            t.icon_name = input.icon_name.clone();

            Ok(t.clone())
        })
        .await?;

    Ok(Json(updated))
}

// -----------------------------
// DELETE /api/tasks/:id
// Removes the task definition. Historical execution records and completed
// snapshots referencing it are kept as an audit trail.
// -----------------------------
pub async fn delete_task(
    State(store): State<Arc<Store>>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    store
        .write(|db| {
            let before = db.tasks.len();
            db.tasks.retain(|t| !(t.id == id && t.owner_id == user.id));
            if db.tasks.len() == before {
                return Err(ApiError::NotFound("task not found".to_string()));
            }
            Ok(())
        })
        .await?;

    tracing::info!(task = %id, "task deleted");
    Ok(Json(serde_json::json!({ "ok": true })))
}
