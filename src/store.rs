//! Persistent storage: one JSON document behind a process-wide lock.
//!
//! Mutations run a closure under the write lock and persist before the lock
//! is released, so a status check made inside the closure is atomic with the
//! write that depends on it. That is the compare-and-swap the execution state
//! machine relies on for its one-writer-wins guarantee.

use std::path::{Path, PathBuf};
use std::{fs, io};

use chrono::NaiveDate;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{Db, ExecutionRecord, Task, User};

pub struct Store {
    path: PathBuf,
    db: RwLock<Db>,
}

impl Store {
    /// Load the database from `path`, or start empty if the file is absent.
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let db = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Db::default(),
            Err(e) => return Err(e),
        };
        Ok(Self {
            path,
            db: RwLock::new(db),
        })
    }

    pub async fn read<R>(&self, f: impl FnOnce(&Db) -> R) -> R {
        let db = self.db.read().await;
        f(&db)
    }

    /// Apply `f` under the write lock and persist the result. If `f` fails
    /// nothing reaches disk; closures must validate before they mutate.
    pub async fn write<R>(
        &self,
        f: impl FnOnce(&mut Db) -> Result<R, ApiError>,
    ) -> Result<R, ApiError> {
        let mut db = self.db.write().await;
        let out = f(&mut db)?;
        save(&self.path, &db)?;
        Ok(out)
    }
}

fn save(path: &Path, db: &Db) -> io::Result<()> {
    let text = serde_json::to_string_pretty(db)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, text)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

impl Db {
    pub fn user(&self, id: Uuid) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn user_mut(&mut self, id: Uuid) -> Option<&mut User> {
        self.users.iter_mut().find(|u| u.id == id)
    }

    pub fn task(&self, id: Uuid) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn task_mut(&mut self, id: Uuid) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    /// The at-most-one record per (task, owner, date) lookup.
    pub fn execution(
        &self,
        task_id: Uuid,
        owner_id: Uuid,
        date: NaiveDate,
    ) -> Option<&ExecutionRecord> {
        self.executions
            .iter()
            .find(|e| e.task_id == task_id && e.owner_id == owner_id && e.execution_date == date)
    }

    /// Insert or replace the record for its (task, owner, date) key.
    pub fn upsert_execution(&mut self, record: ExecutionRecord) {
        match self.executions.iter_mut().find(|e| {
            e.task_id == record.task_id
                && e.owner_id == record.owner_id
                && e.execution_date == record.execution_date
        }) {
            Some(slot) => *slot = record,
            None => self.executions.push(record),
        }
    }

    /// Full execution history of one task, all dates.
    pub fn task_history(&self, task_id: Uuid) -> Vec<ExecutionRecord> {
        self.executions
            .iter()
            .filter(|e| e.task_id == task_id)
            .cloned()
            .collect()
    }
}
