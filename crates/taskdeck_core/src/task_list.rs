//! In-memory task collection backing the task view.
//!
//! The fetched list is the single source of truth for the view; the
//! filtered view is recomputed from it on every read. Mutations are
//! confirmed-not-optimistic: local state only changes after the backend
//! acknowledged the call, so a failure leaves it exactly as it was.

use crate::error::AppError;
use crate::model::{Priority, Task, TaskStatus, TaskUpdate, canonical_key};
use crate::task_api::TaskService;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    All,
    Only(TaskStatus),
}

impl Default for StatusFilter {
    /// The task view opens on pending work.
    fn default() -> Self {
        Self::Only(TaskStatus::Pending)
    }
}

impl StatusFilter {
    pub fn matches(self, status: TaskStatus) -> bool {
        match self {
            Self::All => true,
            Self::Only(expected) => status == expected,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if canonical_key(raw).as_deref() == Some("all") {
            return Ok(Self::All);
        }
        raw.parse().map(Self::Only)
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("ALL"),
            Self::Only(status) => status.fmt(f),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PriorityFilter {
    #[default]
    All,
    Only(Priority),
}

impl PriorityFilter {
    pub fn matches(self, priority: Priority) -> bool {
        match self {
            Self::All => true,
            Self::Only(expected) => priority == expected,
        }
    }
}

impl FromStr for PriorityFilter {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if canonical_key(raw).as_deref() == Some("all") {
            return Ok(Self::All);
        }
        raw.parse().map(Self::Only)
    }
}

impl fmt::Display for PriorityFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("ALL"),
            Self::Only(priority) => priority.fmt(f),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub search: String,
    pub status: StatusFilter,
    pub priority: PriorityFilter,
}

impl TaskFilter {
    /// Filter that lets every task through.
    pub fn show_all() -> Self {
        Self {
            search: String::new(),
            status: StatusFilter::All,
            priority: PriorityFilter::All,
        }
    }

    pub fn matches(&self, task: &Task) -> bool {
        self.matches_search(task)
            && self.status.matches(task.status)
            && self.priority.matches(task.priority)
    }

    fn matches_search(&self, task: &Task) -> bool {
        if self.search.is_empty() {
            return true;
        }
        let needle = self.search.to_lowercase();
        task.title.to_lowercase().contains(&needle)
            || task.description.to_lowercase().contains(&needle)
    }
}

pub fn filter_tasks<'a>(tasks: &'a [Task], filter: &TaskFilter) -> Vec<&'a Task> {
    tasks.iter().filter(|task| filter.matches(task)).collect()
}

#[derive(Debug, Clone, Default)]
pub struct TaskListState {
    tasks: Vec<Task>,
    pub filter: TaskFilter,
    open_menu: Option<String>,
    pending_delete: Option<String>,
}

impl TaskListState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            tasks,
            ..Self::default()
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn filtered(&self) -> Vec<&Task> {
        filter_tasks(&self.tasks, &self.filter)
    }

    /// Replaces the collection with whatever the backend holds now.
    pub async fn refresh(&mut self, service: &TaskService<'_>) -> Result<(), AppError> {
        let tasks = service.list().await?;
        self.replace(tasks);
        Ok(())
    }

    pub fn replace(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
        if let Some(id) = self.open_menu.as_deref()
            && self.get(id).is_none()
        {
            self.open_menu = None;
        }
        if let Some(id) = self.pending_delete.as_deref()
            && self.get(id).is_none()
        {
            self.pending_delete = None;
        }
    }

    /// Sets the status of the task with `id`; no other entry is touched.
    pub fn apply_status(&mut self, id: &str, status: TaskStatus) -> bool {
        match self.tasks.iter_mut().find(|task| task.id == id) {
            Some(task) => {
                task.status = status;
                true
            }
            None => false,
        }
    }

    /// Swaps in the server's copy of a task, keeping its position.
    pub fn apply_task(&mut self, updated: Task) -> bool {
        match self.tasks.iter_mut().find(|task| task.id == updated.id) {
            Some(task) => {
                *task = updated;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<Task> {
        let index = self.tasks.iter().position(|task| task.id == id)?;
        Some(self.tasks.remove(index))
    }

    /// Flips completion through the backend, then mirrors it locally.
    pub async fn toggle_completion(
        &mut self,
        service: &TaskService<'_>,
        id: &str,
    ) -> Result<Task, AppError> {
        let current = self
            .get(id)
            .ok_or_else(|| AppError::invalid_input("task not found"))?;
        let next = current.status.toggled();

        service.update(id, &TaskUpdate::status(next)).await?;
        self.apply_status(id, next);
        tracing::debug!(id, status = %next, "task completion toggled");

        self.get(id)
            .cloned()
            .ok_or_else(|| AppError::invalid_input("task not found"))
    }

    pub async fn edit(
        &mut self,
        service: &TaskService<'_>,
        id: &str,
        update: &TaskUpdate,
    ) -> Result<Task, AppError> {
        if self.get(id).is_none() {
            return Err(AppError::invalid_input("task not found"));
        }
        let updated = service.update(id, update).await?;
        self.apply_task(updated.clone());
        Ok(updated)
    }

    pub fn open_menu(&self) -> Option<&str> {
        self.open_menu.as_deref()
    }

    /// Opens the action menu for `id`, or closes it if it was already open.
    /// At most one menu is open at a time.
    pub fn toggle_menu(&mut self, id: &str) {
        if self.open_menu.as_deref() == Some(id) {
            self.open_menu = None;
        } else {
            self.open_menu = Some(id.to_string());
        }
    }

    pub fn close_menu(&mut self) {
        self.open_menu = None;
    }

    pub fn pending_delete(&self) -> Option<&str> {
        self.pending_delete.as_deref()
    }

    /// First phase of a delete: remember the intent, nothing is sent yet.
    pub fn request_delete(&mut self, id: &str) -> Result<&Task, AppError> {
        if self.get(id).is_none() {
            return Err(AppError::invalid_input("task not found"));
        }
        self.open_menu = None;
        self.pending_delete = Some(id.to_string());
        self.get(id)
            .ok_or_else(|| AppError::invalid_input("task not found"))
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    /// Second phase: delete the pending task on the backend and drop it
    /// locally. The pending intent is cleared whatever the outcome.
    pub async fn confirm_delete(&mut self, service: &TaskService<'_>) -> Result<Task, AppError> {
        let id = self
            .pending_delete
            .take()
            .ok_or_else(|| AppError::invalid_input("no delete awaiting confirmation"))?;

        service.delete(&id).await?;
        self.remove(&id)
            .ok_or_else(|| AppError::invalid_input("task not found"))
    }
}
