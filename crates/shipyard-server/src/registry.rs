use chrono::{DateTime, Utc};
use serde::Serialize;
use shipyard_core::paths;
use shipyard_core::types::{TaskId, TaskKind, TaskStatus};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Registry record for one task. Cloned out on every read, so a caller never
/// sees a half-applied transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskState {
    pub id: TaskId,
    pub kind: TaskKind,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub log_path: PathBuf,
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("unknown task {0}")]
    Unknown(TaskId),

    #[error("task {0} already finished as {1}")]
    AlreadyFinished(TaskId, TaskStatus),

    #[error("a task can only move from running to a terminal status")]
    NotTerminal,
}

/// Final outcome written once when a task's process is done.
#[derive(Debug, Clone, Default)]
pub struct Outcome {
    pub exit_code: Option<i32>,
    pub diagnostic: Option<String>,
}

pub struct TaskRegistry {
    tasks: RwLock<HashMap<TaskId, TaskState>>,
    log_dir: PathBuf,
    retention: chrono::Duration,
}

impl TaskRegistry {
    pub fn new(log_dir: impl Into<PathBuf>, retention: Duration) -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
            log_dir: log_dir.into(),
            retention: chrono::Duration::from_std(retention).unwrap_or(chrono::Duration::MAX),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<TaskId, TaskState>> {
        self.tasks
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<TaskId, TaskState>> {
        self.tasks
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Allocate a fresh id and record the task as running.
    pub fn create(&self, kind: TaskKind) -> TaskId {
        let mut tasks = self.write();
        let mut id = TaskId::new();
        while tasks.contains_key(&id) {
            id = TaskId::new();
        }
        tasks.insert(
            id,
            TaskState {
                id,
                kind,
                status: TaskStatus::Running,
                created_at: Utc::now(),
                completed_at: None,
                log_path: paths::task_log(&self.log_dir, &id.to_string()),
                exit_code: None,
                diagnostic: None,
            },
        );
        id
    }

    pub fn get(&self, id: TaskId) -> Option<TaskState> {
        self.read().get(&id).cloned()
    }

    pub fn status(&self, id: TaskId) -> Option<TaskStatus> {
        self.read().get(&id).map(|t| t.status)
    }

    /// Newest first.
    pub fn list(&self) -> Vec<TaskState> {
        let mut all: Vec<TaskState> = self.read().values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all
    }

    pub fn set_status(&self, id: TaskId, status: TaskStatus) -> Result<TaskState, RegistryError> {
        self.finish(id, status, Outcome::default())
    }

    /// Move a running task to `status`. Happens at most once per task; later
    /// calls fail and leave the recorded outcome untouched.
    pub fn finish(
        &self,
        id: TaskId,
        status: TaskStatus,
        outcome: Outcome,
    ) -> Result<TaskState, RegistryError> {
        if !status.is_terminal() {
            return Err(RegistryError::NotTerminal);
        }
        let mut tasks = self.write();
        let task = tasks.get_mut(&id).ok_or(RegistryError::Unknown(id))?;
        if task.status.is_terminal() {
            return Err(RegistryError::AlreadyFinished(id, task.status));
        }
        task.status = status;
        task.completed_at = Some(Utc::now());
        task.exit_code = outcome.exit_code;
        task.diagnostic = outcome.diagnostic;
        Ok(task.clone())
    }

    /// Drop finished tasks whose completion is older than the retention window.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Utc::now())
    }

    pub fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let Some(cutoff) = now.checked_sub_signed(self.retention) else {
            return 0;
        };
        let mut tasks = self.write();
        let before = tasks.len();
        tasks.retain(|_, t| match t.completed_at {
            Some(done) => done >= cutoff,
            None => true,
        });
        let removed = before - tasks.len();
        if removed > 0 {
            debug!(removed, remaining = tasks.len(), "swept finished tasks");
        }
        removed
    }

    /// Periodically sweep until the registry is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let weak = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // First tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(registry) = weak.upgrade() else {
                    break;
                };
                registry.sweep();
            }
        })
    }
}
