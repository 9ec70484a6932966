//! Note repository implementation

#![allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT/OFFSET

use crate::error::{Error, Result};
use crate::models::{DataOrigin, Note, NoteId, NoteState};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};

const NOTE_COLUMNS: &str =
    "id, title, content, created_at, last_edited_at, origin, is_synced, is_deleted";

/// Trait for note storage operations
pub trait NoteRepository {
    /// Insert a new note
    fn insert(&self, note: &Note) -> Result<()>;

    /// Get a note by ID, including soft-deleted notes
    fn get(&self, id: &NoteId) -> Result<Option<Note>>;

    /// List visible notes (excluding soft-deleted), most recently edited first
    fn list(&self, limit: usize, offset: usize) -> Result<Vec<Note>>;

    /// Count visible notes
    fn count_visible(&self) -> Result<usize>;

    /// Overwrite a note's fields and state
    fn update(&self, note: &Note) -> Result<()>;

    /// Change only the sync state of a note; returns false when the note is gone
    fn set_state(&self, id: &NoteId, state: NoteState) -> Result<bool>;

    /// Remove a note row; returns false when it was already gone
    fn hard_delete(&self, id: &NoteId) -> Result<bool>;

    /// Remove every note
    fn clear(&self) -> Result<()>;

    /// List visible note ids starting with `prefix`
    fn list_ids_by_prefix(&self, prefix: &str, limit: usize) -> Result<Vec<String>>;
}

/// `SQLite` implementation of `NoteRepository`
pub struct SqliteNoteRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteNoteRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse a note from a database row
    fn parse_note(row: &rusqlite::Row<'_>) -> rusqlite::Result<Note> {
        let id: String = row.get(0)?;
        let id = id
            .parse::<NoteId>()
            .map_err(|error| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(error)))?;
        let origin: String = row.get(5)?;
        let origin = origin.parse::<DataOrigin>().map_err(|error| {
            rusqlite::Error::FromSqlConversionFailure(5, Type::Text, error.into())
        })?;
        let is_synced = row.get::<_, i32>(6)? != 0;
        let is_deleted = row.get::<_, i32>(7)? != 0;
        let state = NoteState::from_flags(origin, is_synced, is_deleted).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                6,
                Type::Integer,
                format!(
                    "illegal note state origin={} synced={is_synced} deleted={is_deleted}",
                    origin.as_str()
                )
                .into(),
            )
        })?;

        Ok(Note {
            id,
            title: row.get(1)?,
            content: row.get(2)?,
            created_at: row.get(3)?,
            last_edited_at: row.get(4)?,
            state,
        })
    }

    fn write(&self, verb: &str, note: &Note) -> Result<()> {
        self.conn.execute(
            &format!(
                "{verb} INTO notes ({NOTE_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"
            ),
            params![
                note.id.as_str(),
                note.title,
                note.content,
                note.created_at,
                note.last_edited_at,
                note.origin().as_str(),
                i32::from(note.is_synced()),
                i32::from(note.is_deleted()),
            ],
        )?;
        Ok(())
    }
}

impl NoteRepository for SqliteNoteRepository<'_> {
    fn insert(&self, note: &Note) -> Result<()> {
        self.write("INSERT", note)
    }

    fn get(&self, id: &NoteId) -> Result<Option<Note>> {
        let note = self
            .conn
            .query_row(
                &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?"),
                params![id.as_str()],
                Self::parse_note,
            )
            .optional()?;
        Ok(note)
    }

    fn list(&self, limit: usize, offset: usize) -> Result<Vec<Note>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {NOTE_COLUMNS}
             FROM notes
             WHERE is_deleted = 0
             ORDER BY last_edited_at DESC, id ASC
             LIMIT ? OFFSET ?"
        ))?;

        let notes = stmt
            .query_map(params![limit as i64, offset as i64], Self::parse_note)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(notes)
    }

    fn count_visible(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM notes WHERE is_deleted = 0",
            [],
            |row| row.get(0),
        )?;
        usize::try_from(count).map_err(|error| Error::Database(error.to_string()))
    }

    fn update(&self, note: &Note) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE notes
             SET title = ?, content = ?, last_edited_at = ?, origin = ?, is_synced = ?, is_deleted = ?
             WHERE id = ?",
            params![
                note.title,
                note.content,
                note.last_edited_at,
                note.origin().as_str(),
                i32::from(note.is_synced()),
                i32::from(note.is_deleted()),
                note.id.as_str(),
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound(note.id.to_string()));
        }
        Ok(())
    }

    fn set_state(&self, id: &NoteId, state: NoteState) -> Result<bool> {
        let rows = self.conn.execute(
            "UPDATE notes SET origin = ?, is_synced = ?, is_deleted = ? WHERE id = ?",
            params![
                state.origin().as_str(),
                i32::from(state.is_synced()),
                i32::from(state.is_deleted()),
                id.as_str(),
            ],
        )?;
        Ok(rows > 0)
    }

    fn hard_delete(&self, id: &NoteId) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM notes WHERE id = ?", params![id.as_str()])?;
        Ok(rows > 0)
    }

    fn clear(&self) -> Result<()> {
        self.conn.execute("DELETE FROM notes", [])?;
        Ok(())
    }

    fn list_ids_by_prefix(&self, prefix: &str, limit: usize) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT id FROM notes
             WHERE is_deleted = 0 AND substr(id, 1, length(?1)) = ?1
             ORDER BY id ASC
             LIMIT ?2",
        )?;
        let ids = stmt
            .query_map(params![prefix.trim(), limit as i64], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(ids)
    }
}
