use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::analytics::{self, ExecutionSummary, LeaderboardEntry, StreakReport};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::{ExecutionRecord, Task};
use crate::reconcile::{self, DayView};
use crate::store::Store;

#[derive(Debug, Deserialize)]
pub struct DayQuery {
    pub date: NaiveDate,
}

// -----------------------------
// GET /api/day
// The caller's due tasks for one date, bucketed by execution status, with
// the day's statistics block.
// -----------------------------
pub async fn get_day(
    State(store): State<Arc<Store>>,
    user: AuthUser,
    Query(q): Query<DayQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now();
    let view: DayView = store
        .read(|db| {
            let mine: Vec<Task> = db
                .tasks
                .iter()
                .filter(|t| t.owner_id == user.id)
                .cloned()
                .collect();
            let due = reconcile::due_tasks(&mine, q.date);
            let executions: Vec<ExecutionRecord> = db
                .executions
                .iter()
                .filter(|e| e.owner_id == user.id)
                .cloned()
                .collect();
            reconcile::reconcile_day(due, &executions, q.date, now)
        })
        .await;

    Ok(Json(view))
}

#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    pub date: NaiveDate,
    pub entries: Vec<LeaderboardEntry>,
}

// -----------------------------
// GET /api/day/leaderboard
// Every user's day statistics for the date, ranked.
// -----------------------------
pub async fn get_leaderboard(
    State(store): State<Arc<Store>>,
    _user: AuthUser,
    Query(q): Query<DayQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now();
    let entries = store
        .read(|db| {
            let rows = db
                .users
                .iter()
                .map(|u| {
                    let mine: Vec<Task> = db
                        .tasks
                        .iter()
                        .filter(|t| t.owner_id == u.id)
                        .cloned()
                        .collect();
                    let due = reconcile::due_tasks(&mine, q.date);
                    let executions: Vec<ExecutionRecord> = db
                        .executions
                        .iter()
                        .filter(|e| e.owner_id == u.id)
                        .cloned()
                        .collect();
                    let view = reconcile::reconcile_day(due, &executions, q.date, now);
                    (u.id, u.name.clone(), view.statistics)
                })
                .collect();
            analytics::rank_leaderboard(rows)
        })
        .await;

    Ok(Json(LeaderboardResponse {
        date: q.date,
        entries,
    }))
}

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct AnalyticsResponse {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub overall: ExecutionSummary,
    pub by_category: BTreeMap<String, ExecutionSummary>,
    pub by_day: BTreeMap<NaiveDate, ExecutionSummary>,
    pub streaks: StreakReport,
}

// -----------------------------
// GET /api/analytics
// Folds the caller's execution history over [from, to] into overall,
// per-category, per-day, and streak statistics.
// -----------------------------
pub async fn get_analytics(
    State(store): State<Arc<Store>>,
    user: AuthUser,
    Query(q): Query<RangeQuery>,
) -> Result<impl IntoResponse, ApiError> {
    if q.from > q.to {
        return Err(ApiError::Validation("from must not be after to".to_string()));
    }

    let today = Utc::now().date_naive();
    let response = store
        .read(|db| {
            let records: Vec<ExecutionRecord> = db
                .executions
                .iter()
                .filter(|e| e.owner_id == user.id)
                .filter(|e| q.from <= e.execution_date && e.execution_date <= q.to)
                .cloned()
                .collect();
            let tasks: Vec<Task> = db
                .tasks
                .iter()
                .filter(|t| t.owner_id == user.id)
                .cloned()
                .collect();

            AnalyticsResponse {
                from: q.from,
                to: q.to,
                overall: analytics::summarize(&records),
                by_category: analytics::by_category(&records, &tasks),
                by_day: analytics::by_day(&records),
                streaks: analytics::streaks(&records, today),
            }
        })
        .await;

    Ok(Json(response))
}
