//! Account registration and login against the NoteMark API.

use std::sync::OnceLock;

use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::http::{send_checked, with_user_email};
use super::RemoteError;
use crate::config::ClientConfig;
use crate::session::Session;

const REGISTER_PATH: &str = "/api/auth/register";
const LOGIN_PATH: &str = "/api/auth/login";

const USERNAME_MIN_CHARS: usize = 3;
const USERNAME_MAX_CHARS: usize = 20;
const PASSWORD_MIN_CHARS: usize = 8;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Auth API error: {}", .0.message)]
    Api(#[from] RemoteError),
}

pub type AuthResult<T> = Result<T, AuthError>;

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$")
            .expect("Invalid regex")
    })
}

fn password_symbol_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"[0-9!@#$%^&*()_+\-=\[\]{};':"\\|,.<>/?]"#)
            .expect("Invalid regex")
    })
}

pub fn validate_email(email: &str) -> AuthResult<()> {
    if email_pattern().is_match(email.trim()) {
        Ok(())
    } else {
        Err(AuthError::InvalidInput("Invalid email provided".to_string()))
    }
}

/// At least 8 characters including a digit or a symbol.
pub fn validate_password(password: &str) -> AuthResult<()> {
    if password.chars().count() >= PASSWORD_MIN_CHARS && password_symbol_pattern().is_match(password)
    {
        Ok(())
    } else {
        Err(AuthError::InvalidInput(
            "Password must be at least 8 characters and include a number or symbol".to_string(),
        ))
    }
}

pub fn validate_username(username: &str) -> AuthResult<()> {
    let length = username.trim().chars().count();
    if length < USERNAME_MIN_CHARS {
        return Err(AuthError::InvalidInput(
            "Username must be at least 3 characters".to_string(),
        ));
    }
    if length > USERNAME_MAX_CHARS {
        return Err(AuthError::InvalidInput(
            "Username can't be longer than 20 characters".to_string(),
        ));
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct RegisterRequest<'a> {
    username: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    username: Option<String>,
}

/// Client for the unauthenticated account endpoints.
#[derive(Clone)]
pub struct AuthClient {
    config: ClientConfig,
    client: Client,
}

impl AuthClient {
    pub fn new(config: ClientConfig) -> AuthResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self { config, client })
    }

    pub async fn register(&self, username: &str, email: &str, password: &str) -> AuthResult<()> {
        validate_username(username)?;
        validate_email(email)?;
        validate_password(password)?;

        let body = RegisterRequest {
            username: username.trim(),
            email: email.trim(),
            password,
        };
        let request = with_user_email(
            self.client
                .post(self.config.endpoint(REGISTER_PATH))
                .json(&body),
            &self.config,
        );
        send_checked(request).await?;
        tracing::info!("Registered account {}", email.trim());
        Ok(())
    }

    /// Log in and build a session keyed by the login email.
    pub async fn login(&self, email: &str, password: &str) -> AuthResult<Session> {
        validate_email(email)?;
        if password.is_empty() {
            return Err(AuthError::InvalidInput("Password is required".to_string()));
        }

        let email = email.trim();
        let request = with_user_email(
            self.client
                .post(self.config.endpoint(LOGIN_PATH))
                .json(&LoginRequest { email, password }),
            &self.config,
        );
        let response = send_checked(request).await?;
        let body = response.json::<LoginResponse>().await?;

        Ok(Session {
            user_id: email.to_string(),
            username: body.username.unwrap_or_else(|| email.to_string()),
            access_token: body.access_token,
            refresh_token: body.refresh_token,
        })
    }
}
