use crate::error::AppError;
use crate::model::canonical_key;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "WireTask")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub start_date: Option<String>,
    pub due_date: Option<String>,
    pub status: TaskStatus,
}

impl Task {
    pub fn is_completed(&self) -> bool {
        self.status.is_completed()
    }
}

/// Shape accepted from the backend. Older payloads carry `isCompleted`
/// instead of `status`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireTask {
    #[serde(alias = "_id", deserialize_with = "string_or_number")]
    id: String,
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    priority: Option<Priority>,
    #[serde(default)]
    start_date: Option<String>,
    #[serde(default)]
    due_date: Option<String>,
    #[serde(default)]
    status: Option<TaskStatus>,
    #[serde(default)]
    is_completed: Option<bool>,
}

impl From<WireTask> for Task {
    fn from(wire: WireTask) -> Self {
        let status = match (wire.status, wire.is_completed) {
            (Some(status), _) => status,
            (None, Some(true)) => TaskStatus::Completed,
            (None, Some(false)) | (None, None) => TaskStatus::Pending,
        };

        Task {
            id: wire.id,
            title: wire.title,
            description: wire.description.unwrap_or_default(),
            priority: wire.priority.unwrap_or_default(),
            start_date: non_blank(wire.start_date),
            due_date: non_blank(wire.due_date),
            status,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(value) => value,
        Raw::Number(value) => value.to_string(),
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Urgent,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Urgent => "URGENT",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match canonical_key(raw).as_deref() {
            Some("low") => Ok(Self::Low),
            Some("medium") => Ok(Self::Medium),
            Some("high") => Ok(Self::High),
            Some("urgent") => Ok(Self::Urgent),
            _ => Err(AppError::invalid_input(format!("unknown priority '{raw}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Canceled,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Canceled => "CANCELED",
        }
    }

    pub fn is_completed(self) -> bool {
        self == Self::Completed
    }

    /// Completion checkbox semantics: completed tasks go back to pending,
    /// everything else becomes completed.
    pub fn toggled(self) -> Self {
        if self.is_completed() {
            Self::Pending
        } else {
            Self::Completed
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match canonical_key(raw).as_deref() {
            Some("pending") => Ok(Self::Pending),
            Some("in_progress" | "inprogress") => Ok(Self::InProgress),
            Some("completed" | "done") => Ok(Self::Completed),
            Some("canceled" | "cancelled") => Ok(Self::Canceled),
            _ => Err(AppError::invalid_input(format!("unknown status '{raw}'"))),
        }
    }
}

/// Payload for `POST /tasks`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub start_date: Option<String>,
    pub due_date: Option<String>,
    pub priority: Priority,
}

/// Partial payload for `PUT /tasks/{id}`; only supplied fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    /// `Some(None)` clears the date on the server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
}

impl TaskUpdate {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

pub fn parse_calendar_date(raw: &str) -> Result<Date, AppError> {
    let format = format_description!("[year]-[month]-[day]");
    Date::parse(raw.trim(), &format)
        .map_err(|_| AppError::invalid_input(format!("date '{raw}' must be YYYY-MM-DD")))
}

/// Renders a backend date as `YYYY-MM-DD`, or `N/A` when absent.
pub fn display_date(value: Option<&str>) -> String {
    let Some(raw) = value else {
        return "N/A".to_string();
    };

    let date = parse_calendar_date(raw)
        .ok()
        .or_else(|| OffsetDateTime::parse(raw, &Rfc3339).ok().map(|dt| dt.date()));

    match date {
        Some(date) => {
            let format = format_description!("[year]-[month]-[day]");
            date.format(&format).unwrap_or_else(|_| raw.to_string())
        }
        None => raw.to_string(),
    }
}
