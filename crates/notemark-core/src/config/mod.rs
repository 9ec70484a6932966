//! Client configuration for talking to the NoteMark API.
//!
//! Shared by every front end. Values come from the environment
//! (`NOTEMARK_API_URL`, `NOTEMARK_USER_EMAIL`) or from a front end's own
//! config file, and are validated here before any client is built.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::util::{is_http_url, normalize_text_option};

pub const DEFAULT_API_BASE_URL: &str = "https://notemark.pl-coding.com";
pub const API_URL_ENV: &str = "NOTEMARK_API_URL";
pub const USER_EMAIL_ENV: &str = "NOTEMARK_USER_EMAIL";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 20;

/// Validated settings for the HTTP clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// API origin without a trailing slash
    pub api_base_url: String,
    /// Sent as `X-User-Email` on every request when present
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            user_email: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl ClientConfig {
    /// Build a config from explicit values, applying defaults and validation.
    pub fn new(api_base_url: Option<String>, user_email: Option<String>) -> Result<Self, String> {
        let api_base_url = match normalize_text_option(api_base_url) {
            Some(url) => normalize_api_base_url(&url)?,
            None => DEFAULT_API_BASE_URL.to_string(),
        };

        Ok(Self {
            api_base_url,
            user_email: normalize_text_option(user_email),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        })
    }

    /// Read `NOTEMARK_API_URL` and `NOTEMARK_USER_EMAIL` from the process environment.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`Self::from_env`], with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        Self::new(lookup(API_URL_ENV), lookup(USER_EMAIL_ENV))
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Absolute URL for an API path such as `/api/notes`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base_url, path.trim_start_matches('/'))
    }
}

/// Validate an API origin and strip trailing slashes.
pub fn normalize_api_base_url(raw: &str) -> Result<String, String> {
    let value = raw.trim();
    if value.is_empty() {
        return Err("API base URL must not be empty".to_string());
    }
    if !is_http_url(value) {
        return Err(format!(
            "API base URL '{value}' must include http:// or https://"
        ));
    }
    Ok(value.trim_end_matches('/').to_string())
}
