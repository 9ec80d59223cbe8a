// In-memory task store

use crate::models::{NewTask, Task, TaskId, TaskUpdate, normalize_category};
use crate::query::ViewQuery;
use crate::record::Record;
use chrono::{NaiveDateTime, Utc};
use eyre::{Result, eyre};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Session-scoped task store
///
/// Tasks are kept in insertion order. All mutation goes through `create`,
/// `toggle`, `update` and `delete`; readers get shared references only.
pub struct TaskStore {
    session_id: Uuid,
    tasks: Vec<Task>,
    next_id: u64,
}

/// Task counts for one moment in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
    pub overdue: usize,
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskStore {
    /// Create an empty store for a new session
    pub fn new() -> Self {
        let session_id = Uuid::now_v7();
        info!(%session_id, "Opened task store");
        Self {
            session_id,
            tasks: Vec::new(),
            next_id: 1,
        }
    }

    /// Identifier of the session owning this store
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Append a new task
    ///
    /// Rejected without touching the store if the text is blank.
    pub fn create(&mut self, fields: NewTask) -> Result<TaskId> {
        Self::validate_text(&fields.text)?;

        let id = TaskId(self.next_id);
        self.next_id += 1;

        let task = Task {
            id,
            text: fields.text,
            completed: false,
            priority: fields.priority,
            category: normalize_category(fields.category),
            due_date: fields.due_date,
            created_at: Utc::now(),
        };

        debug!(session_id = %self.session_id, %id, priority = %task.priority, "create: appended task");
        self.tasks.push(task);

        Ok(id)
    }

    /// Flip completion of a task
    ///
    /// Returns false when no task has this id.
    pub fn toggle(&mut self, id: TaskId) -> bool {
        match self.get_mut(id) {
            Some(task) => {
                task.completed = !task.completed;
                debug!(%id, completed = task.completed, "toggle: flipped completion");
                true
            }
            None => {
                debug!(%id, "toggle: no such task, ignoring");
                false
            }
        }
    }

    /// Merge a partial update into a task
    ///
    /// Returns `Ok(false)` when no task has this id. A blank replacement text
    /// is rejected and the task is left as it was.
    pub fn update(&mut self, id: TaskId, changes: TaskUpdate) -> Result<bool> {
        let Some(task) = self.get_mut(id) else {
            debug!(%id, "update: no such task, ignoring");
            return Ok(false);
        };

        if let Some(text) = &changes.text {
            Self::validate_text(text)?;
        }

        if let Some(text) = changes.text {
            task.text = text;
        }
        if let Some(completed) = changes.completed {
            task.completed = completed;
        }
        if let Some(priority) = changes.priority {
            task.priority = priority;
        }
        if let Some(category) = changes.category {
            task.category = normalize_category(category);
        }
        if let Some(due_date) = changes.due_date {
            task.due_date = due_date;
        }

        debug!(%id, "update: merged fields");
        Ok(true)
    }

    /// Remove a task
    ///
    /// Returns false when no task has this id.
    pub fn delete(&mut self, id: TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id() != id);
        let removed = self.tasks.len() != before;
        debug!(%id, removed, "delete: called");
        removed
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id() == id)
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.get(id).is_some()
    }

    /// All tasks in insertion order
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Filtered, searched and sorted view of the current contents
    pub fn view(&self, query: &ViewQuery) -> Vec<&Task> {
        crate::query::view(&self.tasks, query)
    }

    /// Counts by status; overdue is judged against `now`
    pub fn stats(&self, now: NaiveDateTime) -> Stats {
        self.tasks.iter().fold(Stats::default(), |mut stats, task| {
            stats.total += 1;
            if task.completed {
                stats.completed += 1;
            } else {
                stats.active += 1;
            }
            if task.is_overdue(now) {
                stats.overdue += 1;
            }
            stats
        })
    }

    // ========================================================================
    // Helper methods
    // ========================================================================

    fn get_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|task| task.id() == id)
    }

    fn validate_text(text: &str) -> Result<()> {
        if text.trim().is_empty() {
            warn!("Rejected task with blank text");
            return Err(eyre!("Task text cannot be empty or whitespace-only"));
        }
        Ok(())
    }
}
