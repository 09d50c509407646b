//! Integration tests: drive the handlers directly against a scratch store
//! and assert on the persisted state.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::NaiveDate;
use tempfile::TempDir;
use uuid::Uuid;

use taskwheel::auth::AuthUser;
use taskwheel::models::{ExecutionStatus, Priority, Recurrence};
use taskwheel::routes_auth::{self, LoginInput, RegisterInput};
use taskwheel::routes_execution::{self, CompleteInput, CompleteTaskInput, TransitionInput};
use taskwheel::routes_tasks::{self, CreateTaskInput};
use taskwheel::store::Store;

fn scratch_store() -> (TempDir, Arc<Store>) {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(dir.path().join("db.json")).unwrap();
    (dir, Arc::new(store))
}

async fn register(store: &Arc<Store>, name: &str, phone: &str) -> AuthUser {
    routes_auth::register(
        State(store.clone()),
        Json(RegisterInput {
            name: name.to_string(),
            phone: phone.to_string(),
            password: "hunter2".to_string(),
            role: None,
        }),
    )
    .await
    .map(|_| ())
    .expect("register failed");

    store
        .read(|db| {
            let u = db.users.iter().find(|u| u.phone == phone).unwrap();
            AuthUser {
                id: u.id,
                name: u.name.clone(),
                role: u.role.clone(),
            }
        })
        .await
}

fn task_input(start: &str, end: &str) -> CreateTaskInput {
    CreateTaskInput {
        title: "algebra drills".to_string(),
        description: None,
        start_time: start.to_string(),
        end_time: end.to_string(),
        recurrence: Recurrence::Daily,
        custom_days: Vec::new(),
        from_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
        to_date: NaiveDate::from_ymd_opt(2026, 3, 31).unwrap(),
        priority: Priority::High,
        category: Some("math".to_string()),
        tags: Vec::new(),
        color_hex: None,
        icon_name: None,
    }
}

async fn create_task(store: &Arc<Store>, user: &AuthUser, input: CreateTaskInput) -> Uuid {
    routes_tasks::create_task(State(store.clone()), user.clone(), Json(input))
        .await
        .map(|_| ())
        .expect("create failed");
    store
        .read(|db| {
            db.tasks
                .iter()
                .filter(|t| t.owner_id == user.id)
                .last()
                .unwrap()
                .id
        })
        .await
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
}

#[tokio::test]
async fn register_hashes_password_and_login_checks_it() {
    let (_dir, store) = scratch_store();
    register(&store, "kim", "010-1111").await;

    let stored = store
        .read(|db| db.users[0].password_hash.clone())
        .await;
    assert_ne!(stored, "hunter2");

    let wrong = routes_auth::login(
        State(store.clone()),
        Json(LoginInput {
            phone: "010-1111".to_string(),
            password: "wrong".to_string(),
        }),
    )
    .await;
    assert!(wrong.is_err());

    let right = routes_auth::login(
        State(store.clone()),
        Json(LoginInput {
            phone: "010-1111".to_string(),
            password: "hunter2".to_string(),
        }),
    )
    .await;
    assert!(right.is_ok());
    // register + successful login
    assert_eq!(store.read(|db| db.sessions.len()).await, 2);
}

#[tokio::test]
async fn failed_login_leaves_sessions_untouched() {
    let (_dir, store) = scratch_store();
    let user = register(&store, "kim", "010-1111").await;

    // Plant an expired session next to the one register issued.
    store
        .write(|db| {
            db.sessions.push(taskwheel::models::Session {
                token: "stale".to_string(),
                user_id: user.id,
                expires_at: chrono::Utc::now() - chrono::Duration::hours(1),
            });
            Ok(())
        })
        .await
        .unwrap();

    let wrong = routes_auth::login(
        State(store.clone()),
        Json(LoginInput {
            phone: "010-1111".to_string(),
            password: "wrong".to_string(),
        }),
    )
    .await;
    assert!(wrong.is_err());
    // The rejected attempt pruned nothing.
    assert_eq!(store.read(|db| db.sessions.len()).await, 2);

    routes_auth::login(
        State(store.clone()),
        Json(LoginInput {
            phone: "010-1111".to_string(),
            password: "hunter2".to_string(),
        }),
    )
    .await
    .map(|_| ())
    .unwrap();
    // Success pruned the stale session and issued a fresh one.
    let tokens = store
        .read(|db| db.sessions.iter().map(|s| s.token.clone()).collect::<Vec<_>>())
        .await;
    assert_eq!(tokens.len(), 2);
    assert!(!tokens.contains(&"stale".to_string()));
}

#[tokio::test]
async fn duplicate_phone_is_rejected() {
    let (_dir, store) = scratch_store();
    register(&store, "kim", "010-1111").await;

    let dup = routes_auth::register(
        State(store.clone()),
        Json(RegisterInput {
            name: "other kim".to_string(),
            phone: "010-1111".to_string(),
            password: "hunter2".to_string(),
            role: None,
        }),
    )
    .await;
    assert!(dup.is_err());
    assert_eq!(store.read(|db| db.users.len()).await, 1);
}

#[tokio::test]
async fn lifecycle_start_pause_resume_complete() {
    let (_dir, store) = scratch_store();
    let user = register(&store, "kim", "010-1111").await;
    let task_id = create_task(&store, &user, task_input("08:00", "09:00")).await;

    let input = || {
        Json(TransitionInput { date: date() })
    };
    routes_execution::start_execution(State(store.clone()), user.clone(), Path(task_id), input())
        .await
        .map(|_| ())
        .unwrap();
    routes_execution::pause_execution(State(store.clone()), user.clone(), Path(task_id), input())
        .await
        .map(|_| ())
        .unwrap();
    routes_execution::resume_execution(State(store.clone()), user.clone(), Path(task_id), input())
        .await
        .map(|_| ())
        .unwrap();
    routes_execution::complete_execution(
        State(store.clone()),
        user.clone(),
        Path(task_id),
        Json(CompleteInput {
            date: date(),
            end_time: None,
            duration_minutes: Some(45),
            completion_percentage: None,
            notes: None,
        }),
    )
    .await
    .map(|_| ())
    .unwrap();

    let (record, completed, hours) = store
        .read(|db| {
            let r = db.execution(task_id, user.id, date()).cloned().unwrap();
            let u = db.user(user.id).unwrap();
            (r, u.total_tasks_completed, u.total_hours_logged)
        })
        .await;

    assert_eq!(record.status, ExecutionStatus::Completed);
    assert_eq!(record.interruption_count, 1);
    assert_eq!(record.actual_duration_minutes, 45);
    assert_eq!(record.expected_duration_minutes, 60);
    assert!((record.efficiency_score - 0.75).abs() < 1e-9);
    assert_eq!(completed, 1);
    assert!((hours - 0.75).abs() < 1e-9);

    // Rolling stats land asynchronously.
    let mut recomputed = false;
    for _ in 0..50 {
        tokio::task::yield_now().await;
        let stats = store
            .read(|db| db.task(task_id).unwrap().stats.clone())
            .await;
        if stats.total_completions == 1 {
            assert!((stats.average_completion_time_minutes - 45.0).abs() < 1e-9);
            recomputed = true;
            break;
        }
    }
    assert!(recomputed, "stats recompute never ran");
}

#[tokio::test]
async fn out_of_range_completion_percentage_is_rejected() {
    let (_dir, store) = scratch_store();
    let user = register(&store, "kim", "010-1111").await;
    let task_id = create_task(&store, &user, task_input("08:00", "09:00")).await;

    let complete = |pct: f64| {
        routes_execution::complete_execution(
            State(store.clone()),
            user.clone(),
            Path(task_id),
            Json(CompleteInput {
                date: date(),
                end_time: None,
                duration_minutes: Some(30),
                completion_percentage: Some(pct),
                notes: None,
            }),
        )
    };

    assert!(complete(250.0).await.is_err());
    assert!(complete(-5.0).await.is_err());
    // Nothing persisted by the rejected attempts.
    assert_eq!(store.read(|db| db.executions.len()).await, 0);

    complete(80.0).await.map(|_| ()).unwrap();
    let record = store
        .read(|db| db.execution(task_id, user.id, date()).cloned().unwrap())
        .await;
    assert_eq!(record.completion_percentage, 80.0);
}

#[tokio::test]
async fn completing_twice_increments_counters_once() {
    let (_dir, store) = scratch_store();
    let user = register(&store, "kim", "010-1111").await;
    let task_id = create_task(&store, &user, task_input("08:00", "09:00")).await;

    let complete = |store: Arc<Store>, user: AuthUser| {
        routes_execution::complete_execution(
            State(store),
            user,
            Path(task_id),
            Json(CompleteInput {
                date: date(),
                end_time: None,
                duration_minutes: Some(30),
                completion_percentage: None,
                notes: None,
            }),
        )
    };

    let (a, b) = tokio::join!(
        complete(store.clone(), user.clone()),
        complete(store.clone(), user.clone())
    );
    assert!(a.is_ok() != b.is_ok(), "exactly one complete must win");

    let (records, completed) = store
        .read(|db| {
            let u = db.user(user.id).unwrap();
            (db.executions.len(), u.total_tasks_completed)
        })
        .await;
    assert_eq!(records, 1);
    assert_eq!(completed, 1);
}

#[tokio::test]
async fn transitions_on_someone_elses_task_read_as_absent() {
    let (_dir, store) = scratch_store();
    let owner = register(&store, "kim", "010-1111").await;
    let intruder = register(&store, "lee", "010-2222").await;
    let task_id = create_task(&store, &owner, task_input("08:00", "09:00")).await;

    let res = routes_execution::start_execution(
        State(store.clone()),
        intruder,
        Path(task_id),
        Json(TransitionInput { date: date() }),
    )
    .await;
    assert!(res.is_err());
    assert_eq!(store.read(|db| db.executions.len()).await, 0);
}

#[tokio::test]
async fn snapshot_survives_task_deletion() {
    let (_dir, store) = scratch_store();
    let user = register(&store, "kim", "010-1111").await;
    let task_id = create_task(&store, &user, task_input("08:00", "09:00")).await;

    routes_execution::complete_task_snapshot(
        State(store.clone()),
        user.clone(),
        Json(CompleteTaskInput {
            task_id,
            completion_date: date(),
            notes: Some("done early".to_string()),
            completion_type: "manual".to_string(),
        }),
    )
    .await
    .map(|_| ())
    .unwrap();

    routes_tasks::delete_task(State(store.clone()), user.clone(), Path(task_id))
        .await
        .map(|_| ())
        .unwrap();

    let (tasks, snapshots) = store
        .read(|db| (db.tasks.len(), db.completed_tasks.len()))
        .await;
    assert_eq!(tasks, 0);
    assert_eq!(snapshots, 1);

    // Unknown task id -> error, nothing created.
    let missing = routes_execution::complete_task_snapshot(
        State(store.clone()),
        user,
        Json(CompleteTaskInput {
            task_id: Uuid::new_v4(),
            completion_date: date(),
            notes: None,
            completion_type: "manual".to_string(),
        }),
    )
    .await;
    assert!(missing.is_err());
}
