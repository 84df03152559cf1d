use crate::client::ApiClient;
use crate::error::AppError;
use crate::model::{NewTask, Task, TaskUpdate};
use serde::Deserialize;

const TASKS: &str = "tasks";

#[derive(Debug, Deserialize)]
struct TaskListBody {
    #[serde(default)]
    tasks: Vec<Task>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TaskBody {
    Wrapped { task: Task },
    Bare(Task),
}

impl TaskBody {
    fn into_task(self) -> Task {
        match self {
            Self::Wrapped { task } | Self::Bare(task) => task,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DeleteConfirmation {
    #[serde(default)]
    pub message: Option<String>,
}

/// CRUD against `/tasks` for the user identified by the session token.
pub struct TaskService<'a> {
    client: &'a ApiClient,
}

impl<'a> TaskService<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Full collection in backend order. Filtering is done locally.
    pub async fn list(&self) -> Result<Vec<Task>, AppError> {
        let body: TaskListBody = self.client.get(&[TASKS]).await?;
        tracing::debug!(count = body.tasks.len(), "fetched tasks");
        Ok(body.tasks)
    }

    pub async fn create(&self, task: &NewTask) -> Result<Task, AppError> {
        let title = task.title.trim();
        if title.is_empty() {
            return Err(AppError::invalid_input("title is required"));
        }
        let body: TaskBody = self.client.post(&[TASKS], task).await?;
        Ok(body.into_task())
    }

    pub async fn update(&self, id: &str, update: &TaskUpdate) -> Result<Task, AppError> {
        let trimmed_id = require_id(id)?;
        if update.is_empty() {
            return Err(AppError::invalid_input("nothing to update"));
        }
        let body: TaskBody = self.client.put(&[TASKS, trimmed_id], update).await?;
        Ok(body.into_task())
    }

    pub async fn delete(&self, id: &str) -> Result<DeleteConfirmation, AppError> {
        let trimmed_id = require_id(id)?;
        let body: Option<DeleteConfirmation> = self.client.delete(&[TASKS, trimmed_id]).await?;
        Ok(body.unwrap_or_default())
    }
}

fn require_id(id: &str) -> Result<&str, AppError> {
    let trimmed_id = id.trim();
    if trimmed_id.is_empty() {
        return Err(AppError::invalid_input("id is required"));
    }
    Ok(trimmed_id)
}
