//! Outbound HTTP to the task backend. Every request carries the session
//! token as a bearer credential when one is present; a single attempt is
//! made and failures are handed back unchanged.

use crate::error::AppError;
use crate::session::Session;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

pub struct ApiClient {
    base_url: Url,
    session: Session,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: &str, session: Session) -> Result<Self, AppError> {
        let base_url = parse_base_url(base_url)?;
        Ok(Self {
            base_url,
            session,
            http: reqwest::Client::new(),
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, AppError> {
        let request = self.request(Method::GET, segments)?;
        send(request).await
    }

    pub async fn post<B, T>(&self, segments: &[&str], body: &B) -> Result<T, AppError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request(Method::POST, segments)?.json(body);
        send(request).await
    }

    pub async fn put<B, T>(&self, segments: &[&str], body: &B) -> Result<T, AppError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request(Method::PUT, segments)?.json(body);
        send(request).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, AppError> {
        let request = self.request(Method::DELETE, segments)?;
        send(request).await
    }

    /// Joins path segments onto the base URL, escaping each one.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, AppError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::invalid_data("api_url cannot be a base URL"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, AppError> {
        let url = self.endpoint(segments)?;
        tracing::debug!(%method, path = url.path(), "sending request");

        let mut builder = self.http.request(method, url);
        if let Some(token) = self.session.token() {
            builder = builder.bearer_auth(token);
        }
        Ok(builder)
    }
}

pub fn parse_base_url(raw: &str) -> Result<Url, AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_data("api_url is empty"));
    }
    let url = Url::parse(trimmed)
        .map_err(|err| AppError::invalid_data(format!("invalid api_url '{trimmed}': {err}")))?;
    if url.cannot_be_a_base() {
        return Err(AppError::invalid_data(format!(
            "invalid api_url '{trimmed}': not a base URL"
        )));
    }
    Ok(url)
}

async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, AppError> {
    let response = request.send().await.map_err(|err| {
        tracing::warn!(error = %err, "request failed");
        AppError::transport(err.to_string())
    })?;

    let status = response.status();
    let body = response.text().await.map_err(|err| {
        tracing::warn!(%status, error = %err, "failed to read response body");
        AppError::transport(err.to_string())
    })?;

    if !status.is_success() {
        let message = failure_message(status, &body);
        tracing::warn!(%status, %message, "backend returned an error status");
        return Err(AppError::transport(message));
    }

    decode_body(&body)
}

/// Empty bodies decode as JSON `null`, so `Option<T>` targets accept them.
pub(crate) fn decode_body<T: DeserializeOwned>(body: &str) -> Result<T, AppError> {
    let body = if body.trim().is_empty() { "null" } else { body };
    serde_json::from_str(body)
        .map_err(|err| AppError::invalid_data(format!("unexpected response body: {err}")))
}

/// The backend's own `message` when it sent one, else the status line.
fn failure_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("message")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
        })
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| format!("request failed with status {}", status.as_u16()))
}
