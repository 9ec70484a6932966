//! Shared database service wrapper used by the sync engine and clients.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rusqlite::{Connection, Transaction};
use tokio::sync::{watch, Mutex};

use crate::db::{
    Database, JournalRepository, NoteRepository, SettingsRepository, SqliteJournalRepository,
    SqliteNoteRepository, SqliteSettingsRepository,
};
use crate::models::{Note, Settings};
use crate::session::Session;
use crate::{NoteId, Result};

/// Thread-safe handle to the local store.
///
/// One connection sits behind an async mutex. Every write runs in a single
/// transaction and bumps a change counter that observers can subscribe to.
#[derive(Clone)]
pub struct DatabaseService {
    db: Arc<Mutex<Database>>,
    db_path: Option<PathBuf>,
    changes: Arc<watch::Sender<u64>>,
}

impl DatabaseService {
    /// Open a database service at the given filesystem path.
    pub fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::open(&db_path)?;
        Ok(Self::from_database(db, Some(db_path)))
    }

    /// Open an in-memory database service (primarily for tests).
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::from_database(Database::open_in_memory()?, None))
    }

    fn from_database(db: Database, db_path: Option<PathBuf>) -> Self {
        let (changes, _rx) = watch::channel(0);
        Self {
            db: Arc::new(Mutex::new(db)),
            db_path,
            changes: Arc::new(changes),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Change counter; incremented after every committed write.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    /// Run `f` against the connection under the store lock.
    pub async fn read<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let db = self.db.lock().await;
        f(db.connection())
    }

    /// Run `f` in one transaction under the store lock; commits on `Ok`.
    pub async fn write<T>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        let value = {
            let mut db = self.db.lock().await;
            let tx = db.transaction()?;
            let value = f(&tx)?;
            tx.commit()?;
            value
        };
        self.changes.send_modify(|counter| *counter = counter.wrapping_add(1));
        Ok(value)
    }

    /// List visible notes, most recently edited first.
    pub async fn list_notes(&self, limit: usize, offset: usize) -> Result<Vec<Note>> {
        self.read(|conn| SqliteNoteRepository::new(conn).list(limit, offset))
            .await
    }

    /// Fetch a note by id, including delete-pending notes.
    pub async fn get_note(&self, id: &NoteId) -> Result<Option<Note>> {
        self.read(|conn| SqliteNoteRepository::new(conn).get(id))
            .await
    }

    pub async fn count_notes(&self) -> Result<usize> {
        self.read(|conn| SqliteNoteRepository::new(conn).count_visible())
            .await
    }

    /// Journal records held for any account, pending or dead.
    pub async fn count_journal_records(&self) -> Result<usize> {
        self.read(|conn| SqliteJournalRepository::new(conn).count())
            .await
    }

    /// Visible note ids starting with `prefix`.
    pub async fn find_note_ids(&self, prefix: &str, limit: usize) -> Result<Vec<String>> {
        self.read(|conn| SqliteNoteRepository::new(conn).list_ids_by_prefix(prefix, limit))
            .await
    }

    /// Load settings.
    pub async fn load_settings(&self) -> Result<Settings> {
        self.read(|conn| SqliteSettingsRepository::new(conn).load())
            .await
    }

    /// Save settings.
    pub async fn save_settings(&self, settings: &Settings) -> Result<()> {
        self.write(|tx| SqliteSettingsRepository::new(tx).save(settings))
            .await
    }

    pub async fn load_session(&self) -> Result<Option<Session>> {
        self.read(|conn| SqliteSettingsRepository::new(conn).load_session())
            .await
    }

    pub async fn save_session(&self, session: &Session) -> Result<()> {
        self.write(|tx| SqliteSettingsRepository::new(tx).save_session(session))
            .await
    }

    pub async fn clear_session(&self) -> Result<()> {
        self.write(|tx| SqliteSettingsRepository::new(tx).clear_session())
            .await
    }

    /// Remove every note, journal record and last-sync time.
    pub async fn clear_account_data(&self) -> Result<()> {
        self.write(|tx| {
            SqliteJournalRepository::new(tx).clear()?;
            SqliteNoteRepository::new(tx).clear()?;
            SqliteSettingsRepository::new(tx).clear_last_sync()
        })
        .await?;
        tracing::info!("Cleared local notes and sync journal");
        Ok(())
    }
}
