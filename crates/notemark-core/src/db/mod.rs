//! Database layer for NoteMark

mod connection;
mod journal_repository;
mod migrations;
mod note_repository;
mod settings_repository;

pub use connection::Database;
pub use journal_repository::{JournalRepository, JournalSummary, SqliteJournalRepository};
pub use note_repository::{NoteRepository, SqliteNoteRepository};
pub use settings_repository::{SettingsRepository, SqliteSettingsRepository};
