use crate::client::ApiClient;
use crate::error::AppError;
use crate::model::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};
use regex::Regex;
use std::sync::LazyLock;

pub const MIN_PASSWORD_LEN: usize = 6;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,6}$").expect("email pattern compiles")
});

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registration {
    pub user_name: String,
    pub email: String,
    pub password: String,
    pub agree_terms: bool,
}

pub struct AuthService<'a> {
    client: &'a ApiClient,
}

impl<'a> AuthService<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// `POST /login`. Persisting the returned token is left to the caller
    /// (see [`crate::session::Session::complete_login`]).
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, AppError> {
        validate_login(email, password)?;
        let request = LoginRequest { email, password };
        let response: LoginResponse = self.client.post(&["login"], &request).await?;
        tracing::debug!(success = response.success, "login response received");
        Ok(response)
    }

    /// `POST /register`. A refused registration comes back as
    /// `success == false` with the backend message untouched.
    pub async fn register(&self, form: &Registration) -> Result<RegisterResponse, AppError> {
        validate_registration(form)?;
        let request = RegisterRequest {
            user_name: form.user_name.trim(),
            email: form.email.trim(),
            password: &form.password,
        };
        let response: RegisterResponse = self.client.post(&["register"], &request).await?;
        tracing::debug!(success = response.success, "register response received");
        Ok(response)
    }
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

pub fn validate_login(email: &str, password: &str) -> Result<(), AppError> {
    let mut problems = Vec::new();
    if !is_valid_email(email) {
        problems.push("Please enter a valid email address.");
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        problems.push("Password must be at least 6 characters long.");
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(AppError::invalid_input(problems.join(" ")))
    }
}

pub fn validate_registration(form: &Registration) -> Result<(), AppError> {
    if !form.agree_terms {
        return Err(AppError::invalid_input(
            "You must agree to the terms and conditions.",
        ));
    }
    if form.user_name.trim().is_empty() {
        return Err(AppError::invalid_input("user name is required"));
    }
    validate_login(form.email.trim(), &form.password)
}
