//! Explicit session context. The token cookie is the only record of a
//! signed-in user; nothing here checks it against the server.

use crate::cookie::{CookieStore, DEFAULT_TTL_DAYS, TOKEN_COOKIE};
use crate::error::AppError;
use crate::guard::Route;
use crate::model::LoginResponse;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

const FALLBACK_DISPLAY_NAME: &str = "User";

#[derive(Debug)]
pub struct Session {
    cookies: CookieStore,
    ttl_days: u32,
}

impl Session {
    pub fn new(cookies: CookieStore) -> Self {
        Self::with_ttl(cookies, DEFAULT_TTL_DAYS)
    }

    pub fn with_ttl(cookies: CookieStore, ttl_days: u32) -> Self {
        Self { cookies, ttl_days }
    }

    pub fn in_memory() -> Self {
        Self::new(CookieStore::in_memory())
    }

    pub fn token(&self) -> Option<String> {
        self.cookies.get(TOKEN_COOKIE)
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    pub fn store_token(&self, token: &str) -> Result<(), AppError> {
        self.cookies.set(TOKEN_COOKIE, token, self.ttl_days)
    }

    /// Logs out: drops the token and sends the user back to the login view.
    pub fn clear(&self) -> Result<Route, AppError> {
        self.cookies.delete(TOKEN_COOKIE)?;
        tracing::debug!("session cleared");
        Ok(Route::Login)
    }

    /// Persists the token from a successful login and returns where to go
    /// next. A refused login surfaces the backend message unchanged.
    pub fn complete_login(&self, response: &LoginResponse) -> Result<Route, AppError> {
        if !response.success {
            let message = response
                .message
                .clone()
                .unwrap_or_else(|| "login failed".to_string());
            return Err(AppError::rejected(message));
        }

        let token = response
            .token
            .as_deref()
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| AppError::invalid_data("login succeeded without a token"))?;
        self.store_token(token)?;
        tracing::debug!("session token stored");
        Ok(Route::Tasks)
    }

    /// `userName` claim of the token payload, or "User".
    pub fn display_name(&self) -> String {
        self.token()
            .and_then(|token| user_name_claim(&token))
            .unwrap_or_else(|| FALLBACK_DISPLAY_NAME.to_string())
    }
}

fn user_name_claim(token: &str) -> Option<String> {
    let payload = token.split('.').nth(1)?;
    let bytes = match URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::debug!(error = %err, "token payload is not base64url");
            return None;
        }
    };
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    claims
        .get("userName")
        .and_then(serde_json::Value::as_str)
        .filter(|name| !name.trim().is_empty())
        .map(str::to_string)
}
