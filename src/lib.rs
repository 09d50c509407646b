// Define data modules
pub mod models; // Data structures (Task, ExecutionRecord, User, Db, etc.)
pub mod store; // Persistent storage (load/save db.json behind a lock)
pub mod error; // API error taxonomy and HTTP status mapping
pub mod config; // Bind address / data path from the environment
pub mod auth; // Password hashing, sessions, AuthUser extractor

// Core scheduling logic, independent of HTTP / Axum for testing
pub mod analytics; // Range summaries, streaks, leaderboard, stat recompute
pub mod execution; // State machine for one (task, owner, date) record
pub mod reconcile; // Day buckets + statistics
pub mod recurrence; // is_scheduled(task, date)

// HTTP handlers
pub mod routes_auth;
pub mod routes_day;
pub mod routes_execution;
pub mod routes_tasks;

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::store::Store;

/// The full API router. Separate from `main` so integration tests can
/// drive it against a scratch store.
pub fn app(store: Arc<Store>) -> Router {
    let api = Router::new()
        // identity
        .route("/auth/register", post(routes_auth::register))
        .route("/auth/login", post(routes_auth::login))
        // tasks
        .route(
            "/tasks",
            get(routes_tasks::list_tasks).post(routes_tasks::create_task),
        )
        .route("/tasks/upcoming", get(routes_tasks::upcoming_tasks))
        .route(
            "/tasks/:id",
            put(routes_tasks::update_task).delete(routes_tasks::delete_task),
        )
        // execution lifecycle
        .route(
            "/executions/:task_id/start",
            post(routes_execution::start_execution),
        )
        .route(
            "/executions/:task_id/pause",
            post(routes_execution::pause_execution),
        )
        .route(
            "/executions/:task_id/resume",
            post(routes_execution::resume_execution),
        )
        .route(
            "/executions/:task_id/skip",
            post(routes_execution::skip_execution),
        )
        .route(
            "/executions/:task_id/complete",
            post(routes_execution::complete_execution),
        )
        .route(
            "/complete-task",
            post(routes_execution::complete_task_snapshot),
        )
        // derived read models
        .route("/day", get(routes_day::get_day))
        .route("/day/leaderboard", get(routes_day::get_leaderboard))
        .route("/analytics", get(routes_day::get_analytics));

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .with_state(store)
}
