mod auth;
mod task;

pub use auth::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};
pub use task::{
    NewTask, Priority, Task, TaskStatus, TaskUpdate, display_date, parse_calendar_date,
};

/// Lowercases and collapses separators so `In-Progress`, `in progress`
/// and `IN_PROGRESS` compare equal.
pub(crate) fn canonical_key(raw: &str) -> Option<String> {
    let mut cleaned = String::new();
    let mut previous_underscore = false;

    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_underscore = false;
        } else if !previous_underscore && !cleaned.is_empty() {
            cleaned.push('_');
            previous_underscore = true;
        }
    }

    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
