use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Recurrence {
    /// One-shot: scheduled only on `from_date`.
    None,
    Daily,
    /// Scheduled on the first weekday listed in `custom_days`.
    Weekly,
    /// Scheduled on every weekday listed in `custom_days`.
    Custom,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

/// Rolling per-task statistics. Recomputed from the full execution history
/// after each completion or skip; never written by task edits.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TaskStats {
    pub total_completions: u32,
    pub total_skips: u32,
    pub average_completion_time_minutes: f64,
    pub completion_rate_percent: f64,
    pub recomputed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    /// Wall-clock window, "HH:MM". Not bound to a date; a window that ends
    /// before it starts wraps past midnight.
    pub start_time: String,
    pub end_time: String,
    pub recurrence: Recurrence,
    pub custom_days: Vec<Weekday>,
    /// Inclusive validity window; `from_date <= to_date`.
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub is_active: bool,
    pub priority: Priority,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub color_hex: Option<String>,
    pub icon_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub stats: TaskStats,
}

impl Task {
    /// Planned duration in minutes derived from the wall-clock window,
    /// modulo 24h when the window wraps midnight. None if either time
    /// string fails to parse.
    pub fn planned_minutes(&self) -> Option<i64> {
        let start = parse_hhmm(&self.start_time)?;
        let end = parse_hhmm(&self.end_time)?;
        let diff = (end - start).num_minutes();
        Some(diff.rem_euclid(24 * 60))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Virtual: a task due today with no persisted record. Never stored.
    NotStarted,
    InProgress,
    Paused,
    Completed,
    Skipped,
}

impl ExecutionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ExecutionStatus::Completed | ExecutionStatus::Skipped)
    }
}

/// Per-(task, owner, date) execution state. Created lazily on the first
/// transition for that date; at most one per key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub task_id: Uuid,
    pub owner_id: Uuid,
    pub execution_date: NaiveDate,
    pub status: ExecutionStatus,
    pub actual_start_time: Option<DateTime<Utc>>,
    pub actual_end_time: Option<DateTime<Utc>>,
    /// Snapshot of the task's planned duration at record creation.
    pub expected_duration_minutes: i64,
    pub actual_duration_minutes: i64,
    pub completion_percentage: f64,
    pub efficiency_score: f64,
    pub interruption_count: u32,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPreferences {
    pub theme: String,
    pub default_color_hex: String,
    /// "HH:MM"
    pub reminder_time: String,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            theme: "light".to_string(),
            default_color_hex: "#4a90d9".to_string(),
            reminder_time: "09:00".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    /// Unique; used as the login identity.
    pub phone: String,
    pub password_hash: String,
    pub salt: String,
    pub role: String,
    pub total_tasks_created: u32,
    pub total_tasks_completed: u32,
    pub total_hours_logged: f64,
    pub preferences: UserPreferences,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Point-in-time denormalized snapshot of a task at completion. Independent
/// of ExecutionRecord; survives deletion of the task definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedTask {
    pub id: Uuid,
    pub task_id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub category: Option<String>,
    pub priority: Priority,
    pub planned_minutes: i64,
    pub completion_date: NaiveDate,
    pub completed_at: DateTime<Utc>,
    pub completion_type: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Db {
    pub users: Vec<User>,
    pub sessions: Vec<Session>,
    pub tasks: Vec<Task>,
    pub executions: Vec<ExecutionRecord>,
    pub completed_tasks: Vec<CompletedTask>,
}

/// Parse an "HH:MM" wall-clock string.
pub fn parse_hhmm(hhmm: &str) -> Option<NaiveTime> {
    let (h, m) = hhmm.split_once(':')?;
    let h: u32 = h.parse().ok()?;
    let m: u32 = m.parse().ok()?;
    NaiveTime::from_hms_opt(h, m, 0)
}
