//! Task registry - shared task state keyed by task id
//!
//! Each task has exactly one writer, the [`TaskHandle`] owned by its
//! pipeline run. Status queries read cloned snapshots under a read lock.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::ProgressSchedule;

struct TaskEntry {
    snapshot: TaskSnapshot,
    handle: Option<JoinHandle<()>>,
}

/// Registry of every task accepted during the registry's lifetime
#[derive(Clone, Default)]
pub struct TaskRegistry {
    inner: Arc<RwLock<HashMap<TaskId, TaskEntry>>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new `queued` task and hand out its single writer
    pub fn create(&self, filename: String, output_filename: String) -> TaskHandle {
        let id = TaskId::new();
        let entry = TaskEntry {
            snapshot: TaskSnapshot::queued(id, filename, output_filename),
            handle: None,
        };
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, entry);
        debug!(task_id = %id, "Task registered");
        TaskHandle {
            id,
            registry: self.clone(),
        }
    }

    /// Keep the background job's handle with its entry
    pub fn attach(&self, id: &TaskId, handle: JoinHandle<()>) {
        if let Some(entry) = self
            .inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(id)
        {
            entry.handle = Some(handle);
        }
    }

    pub fn get(&self, id: &TaskId) -> Option<TaskSnapshot> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .map(|entry| entry.snapshot.clone())
    }

    /// Current record, or `NotFound`
    pub fn status(&self, id: &TaskId) -> Result<TaskSnapshot, DomainError> {
        self.get(id)
            .ok_or_else(|| DomainError::NotFound(format!("Task not found: {}", id)))
    }

    /// All tasks, oldest first
    pub fn list(&self) -> Vec<TaskSnapshot> {
        let mut tasks: Vec<TaskSnapshot> = self
            .inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|entry| entry.snapshot.clone())
            .collect();
        tasks.sort_by_key(|task| task.created_at);
        tasks
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Abort a running task and mark it `error` with code `cancelled`.
    ///
    /// Temporary artifacts written so far are left in place. Cancelling a
    /// finished task returns its record unchanged.
    pub fn cancel(&self, id: &TaskId) -> Result<TaskSnapshot, DomainError> {
        let (snapshot, handle) = {
            let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
            let entry = map
                .get_mut(id)
                .ok_or_else(|| DomainError::NotFound(format!("Task not found: {}", id)))?;

            if entry.snapshot.status.is_terminal() {
                return Ok(entry.snapshot.clone());
            }
            Self::mark_failed(&mut entry.snapshot, &DomainError::Cancelled);
            (entry.snapshot.clone(), entry.handle.take())
        };

        // Lock released first: dropping the task runs `TaskHandle::drop`
        if let Some(handle) = handle {
            handle.abort();
        }
        warn!(task_id = %id, "Task cancelled");
        Ok(snapshot)
    }

    fn update<F>(&self, id: &TaskId, f: F)
    where
        F: FnOnce(&mut TaskSnapshot),
    {
        if let Some(entry) = self
            .inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(id)
        {
            f(&mut entry.snapshot);
        }
    }

    fn mark_failed(snapshot: &mut TaskSnapshot, err: &DomainError) {
        snapshot.status = TaskStatus::Error;
        snapshot.error = Some(err.to_string());
        snapshot.error_code = Some(err.code());
    }
}

/// Sole writer for one task's record
///
/// Status and progress only move forward: stale or backward updates are
/// ignored, and progress is held below 100 until the task completes. A
/// handle dropped before the task reaches a terminal status marks it failed.
pub struct TaskHandle {
    id: TaskId,
    registry: TaskRegistry,
}

impl TaskHandle {
    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn snapshot(&self) -> Option<TaskSnapshot> {
        self.registry.get(&self.id)
    }

    /// Move to `status` with `progress`; returns false if the move was refused
    pub fn advance(&self, status: TaskStatus, progress: u8) -> bool {
        if matches!(status, TaskStatus::Completed | TaskStatus::Error) {
            return false;
        }
        let mut applied = false;
        self.registry.update(&self.id, |snapshot| {
            if !snapshot.status.can_advance_to(status) {
                return;
            }
            snapshot.status = status;
            let capped = progress.min(ProgressSchedule::COMPLETED - 1);
            snapshot.progress = snapshot.progress.max(capped);
            applied = true;
        });
        if applied {
            debug!(task_id = %self.id, %status, progress, "Task advanced");
        }
        applied
    }

    /// Record a non-fatal notice on the task
    pub fn warn(&self, message: impl Into<String>) {
        let message = message.into();
        self.registry.update(&self.id, |snapshot| snapshot.warnings.push(message));
    }

    /// Mark the task `completed` at 100%
    pub fn complete(&self, output_filename: &str) {
        self.registry.update(&self.id, |snapshot| {
            if snapshot.status.can_advance_to(TaskStatus::Completed) {
                snapshot.status = TaskStatus::Completed;
                snapshot.progress = ProgressSchedule::COMPLETED;
                snapshot.output_filename = output_filename.to_string();
            }
        });
    }

    /// Divert the task to `error`; progress stays where it stalled
    pub fn fail(&self, err: &DomainError) {
        self.registry.update(&self.id, |snapshot| {
            if snapshot.status.can_advance_to(TaskStatus::Error) {
                TaskRegistry::mark_failed(snapshot, err);
            }
        });
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        let finished = self
            .snapshot()
            .map_or(true, |snapshot| snapshot.status.is_terminal());
        if !finished {
            let reason = if std::thread::panicking() {
                "Task panicked before completing"
            } else {
                "Task stopped before completing"
            };
            self.fail(&DomainError::Internal(reason.to_string()));
        }
    }
}
