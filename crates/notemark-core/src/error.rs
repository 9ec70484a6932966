//! Error types for notemark-core

use thiserror::Error;

/// Result type alias using notemark-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in notemark-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Note not found
    #[error("Note not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A local mutation or remote call needs a signed-in account
    #[error("No active session; sign in first")]
    NoSession,

    /// The remote service rejected a request or could not be reached
    #[error("Remote error: {0}")]
    Remote(#[from] crate::remote::RemoteError),

    /// A stored row violates a model invariant
    #[error("Corrupt record: {0}")]
    CorruptRecord(String),
}
