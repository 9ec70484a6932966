//! Remote note service contract and its NoteMark REST binding.

mod auth;
#[cfg(test)]
pub(crate) mod fake;
mod http;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::{NoteId, NotePayload};
use crate::session::Session;

pub use auth::{validate_email, validate_password, validate_username, AuthClient, AuthError};
pub use http::{parse_api_error, HttpNoteService};

/// Failure reported by the remote service.
///
/// `code` is the HTTP status when the server answered, `None` for transport
/// failures (DNS, timeouts, refused connections).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    pub code: Option<u16>,
    pub message: String,
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "HTTP {code}: {}", self.message),
            None => write!(f, "network error: {}", self.message),
        }
    }
}

impl std::error::Error for RemoteError {}

impl RemoteError {
    pub fn http(code: u16, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub const fn is_not_found(&self) -> bool {
        matches!(self.code, Some(404))
    }

    pub const fn is_conflict(&self) -> bool {
        matches!(self.code, Some(409))
    }

    /// The server rejected the credentials.
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self.code, Some(401 | 403))
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(error: reqwest::Error) -> Self {
        Self {
            code: error.status().map(|status| status.as_u16()),
            message: error.to_string(),
        }
    }
}

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// One page of the server's note list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotesPage {
    pub notes: Vec<NotePayload>,
    pub total: u64,
}

/// Operations the sync engine performs against the server.
///
/// Every call carries the session whose token authorizes it.
#[async_trait]
pub trait RemoteNoteService: Send + Sync {
    /// Create a note; returns the server's copy.
    async fn create(&self, session: &Session, note: &NotePayload) -> RemoteResult<NotePayload>;

    /// Overwrite a note; returns the server's copy.
    async fn update(&self, session: &Session, note: &NotePayload) -> RemoteResult<NotePayload>;

    async fn delete(&self, session: &Session, id: &NoteId) -> RemoteResult<()>;

    /// List notes; `None` lets the server pick its defaults.
    async fn list(
        &self,
        session: &Session,
        page: Option<u32>,
        size: Option<u32>,
    ) -> RemoteResult<NotesPage>;
}
