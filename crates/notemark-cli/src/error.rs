use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] notemark_core::Error),
    #[error(transparent)]
    Auth(#[from] notemark_core::remote::AuthError),
    #[error(transparent)]
    Remote(#[from] notemark_core::remote::RemoteError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No note content provided")]
    EmptyContent,
    #[error("Note ID cannot be empty")]
    EmptyNoteId,
    #[error("Note not found for id/prefix: {0}")]
    NoteNotFound(String),
    #[error("{0}")]
    AmbiguousNoteId(String),
    #[error("Editor command failed: {0}")]
    EditorFailed(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Not signed in. Run `notemark auth login` first.")]
    NotSignedIn,
    #[error("{0} change(s) have not been synced. Run `notemark sync` or pass --force to discard them.")]
    UnsyncedChanges(usize),
    #[error("Sync did not complete: {0}")]
    SyncIncomplete(String),
}
