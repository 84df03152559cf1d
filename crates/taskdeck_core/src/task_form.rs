use crate::error::AppError;
use crate::model::{NewTask, Priority, Task, parse_calendar_date};
use crate::task_api::TaskService;
use crate::task_list::TaskListState;

/// Raw input of the "new task" form, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub start_date: String,
    pub due_date: String,
    pub priority: Option<Priority>,
}

/// Outcome of a successful create. The task exists on the server even when
/// the follow-up re-fetch failed; the list then keeps its previous content.
#[derive(Debug)]
pub struct Submitted {
    pub task: Task,
    pub refresh_error: Option<AppError>,
}

impl TaskDraft {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Builds the create payload. Title is mandatory; dates must be
    /// `YYYY-MM-DD` when given and are sent as `null` when left blank.
    pub fn validate(&self) -> Result<NewTask, AppError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(AppError::invalid_input("title is required"));
        }

        Ok(NewTask {
            title: title.to_string(),
            description: self.description.trim().to_string(),
            start_date: optional_date("start date", &self.start_date)?,
            due_date: optional_date("due date", &self.due_date)?,
            priority: self.priority.unwrap_or_default(),
        })
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Creates the task, clears the form and re-fetches the list so the new
    /// entry shows up with the server's id and position. The list is never
    /// appended to locally.
    pub async fn submit(
        &mut self,
        service: &TaskService<'_>,
        list: &mut TaskListState,
    ) -> Result<Submitted, AppError> {
        let payload = self.validate()?;
        let task = service.create(&payload).await?;
        tracing::debug!(id = %task.id, "task created");
        self.reset();

        let refresh_error = match list.refresh(service).await {
            Ok(()) => None,
            Err(err) => {
                tracing::warn!(id = %task.id, error = %err, "task created but list refresh failed");
                Some(err)
            }
        };
        Ok(Submitted {
            task,
            refresh_error,
        })
    }
}

fn optional_date(field: &str, raw: &str) -> Result<Option<String>, AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    parse_calendar_date(trimmed)
        .map_err(|_| AppError::invalid_input(format!("{field} must be YYYY-MM-DD")))?;
    Ok(Some(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::TaskDraft;
    use crate::client::ApiClient;
    use crate::model::Priority;
    use crate::session::Session;
    use crate::task_api::TaskService;
    use crate::task_list::TaskListState;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn can_bind_localhost() -> bool {
        std::net::TcpListener::bind("127.0.0.1:0").is_ok()
    }

    #[test]
    fn validate_defaults_priority_and_blank_dates() {
        let payload = TaskDraft::titled("  Buy milk ").validate().unwrap();

        assert_eq!(payload.title, "Buy milk");
        assert_eq!(payload.priority, Priority::Low);
        assert_eq!(payload.start_date, None);
        assert_eq!(payload.due_date, None);
    }

    #[test]
    fn validate_rejects_missing_title() {
        let err = TaskDraft::default().validate().unwrap_err();
        assert_eq!(err.code(), "invalid_input");
        assert_eq!(err.message(), "title is required");
    }

    #[test]
    fn validate_checks_date_shape() {
        let draft = TaskDraft {
            due_date: "next tuesday".to_string(),
            ..TaskDraft::titled("Pay rent")
        };
        assert_eq!(
            draft.validate().unwrap_err().message(),
            "due date must be YYYY-MM-DD"
        );

        let draft = TaskDraft {
            start_date: "2025-03-01".to_string(),
            due_date: "2025-03-31".to_string(),
            priority: Some(Priority::Urgent),
            ..TaskDraft::titled("Pay rent")
        };
        let payload = draft.validate().unwrap();
        assert_eq!(payload.start_date.as_deref(), Some("2025-03-01"));
        assert_eq!(payload.due_date.as_deref(), Some("2025-03-31"));
        assert_eq!(payload.priority, Priority::Urgent);
    }

    #[tokio::test]
    async fn submit_creates_resets_and_refetches() {
        if !can_bind_localhost() {
            eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tasks"))
            .and(body_json(serde_json::json!({
                "title": "Buy milk",
                "description": "",
                "startDate": null,
                "dueDate": null,
                "priority": "LOW"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "id": "srv-7", "title": "Buy milk"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/tasks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "tasks": [
                    {"id": "srv-1", "title": "Walk dog"},
                    {"id": "srv-7", "title": "Buy milk"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let session = Session::in_memory();
        session.store_token("abc").unwrap();
        let client = ApiClient::new(&server.uri(), session).unwrap();
        let service = TaskService::new(&client);
        let mut list = TaskListState::new();
        let mut draft = TaskDraft::titled("Buy milk");

        let submitted = draft.submit(&service, &mut list).await.unwrap();

        assert_eq!(submitted.task.id, "srv-7");
        assert!(submitted.refresh_error.is_none());
        assert_eq!(draft, TaskDraft::default());
        let ids: Vec<&str> = list.tasks().iter().map(|task| task.id.as_str()).collect();
        assert_eq!(ids, ["srv-1", "srv-7"]);
    }

    #[tokio::test]
    async fn create_is_reported_even_when_refetch_fails() {
        if !can_bind_localhost() {
            eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tasks"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "id": "srv-7", "title": "Buy milk"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/tasks"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri(), Session::in_memory()).unwrap();
        let service = TaskService::new(&client);
        let mut list = TaskListState::new();
        let mut draft = TaskDraft::titled("Buy milk");

        let submitted = draft.submit(&service, &mut list).await.unwrap();

        assert_eq!(submitted.task.id, "srv-7");
        assert_eq!(
            submitted.refresh_error.map(|err| err.code()),
            Some("transport_error")
        );
        assert_eq!(draft, TaskDraft::default());
        assert!(list.tasks().is_empty());
    }

    #[tokio::test]
    async fn failed_submit_keeps_form_and_list() {
        if !can_bind_localhost() {
            eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(serde_json::json!({"message": "bad"})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri(), Session::in_memory()).unwrap();
        let service = TaskService::new(&client);
        let mut list = TaskListState::new();
        let mut draft = TaskDraft::titled("Buy milk");

        let err = draft.submit(&service, &mut list).await.unwrap_err();

        assert_eq!(err.message(), "bad");
        assert_eq!(draft.title, "Buy milk");
        assert!(list.tasks().is_empty());
    }
}
