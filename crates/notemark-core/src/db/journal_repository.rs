//! Sync journal repository

use crate::error::Result;
use crate::models::{NoteId, RecordStatus, SyncOperation, SyncRecord};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};

const RECORD_COLUMNS: &str = "seq, id, user_id, note_id, operation, payload, timestamp, \
     attempts, next_retry_at, last_error, last_error_code, status";

/// Pending vs dead-lettered journal records for one account
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JournalSummary {
    pub pending: usize,
    pub dead: usize,
}

impl JournalSummary {
    pub const fn total(&self) -> usize {
        self.pending + self.dead
    }
}

/// Trait for journal storage operations
pub trait JournalRepository {
    /// The outstanding record for a note, if any
    fn get_by_note(&self, note_id: &NoteId) -> Result<Option<SyncRecord>>;

    /// Append a record; the store assigns its sequence number
    fn insert(&self, record: &SyncRecord) -> Result<()>;

    /// Overwrite a record's intent in place and reset its retry bookkeeping
    fn rewrite(
        &self,
        id: &str,
        user_id: &str,
        operation: SyncOperation,
        payload: &str,
        timestamp: i64,
    ) -> Result<()>;

    /// Remove a record by id; returns false when it was already gone
    fn delete(&self, id: &str) -> Result<bool>;

    /// Every record for an account (pending and dead), in insertion order
    fn list_for_user(&self, user_id: &str) -> Result<Vec<SyncRecord>>;

    /// Pending records for an account, in insertion order
    fn list_pending_for_user(&self, user_id: &str) -> Result<Vec<SyncRecord>>;

    /// Store a retryable failure
    fn record_retry(
        &self,
        id: &str,
        attempts: u32,
        next_retry_at: i64,
        error: &str,
        code: Option<u16>,
    ) -> Result<()>;

    /// Dead-letter a record, keeping its last error
    fn mark_dead(&self, id: &str, attempts: u32, error: &str, code: Option<u16>) -> Result<()>;

    /// Move an account's dead records back to pending; returns how many moved
    fn requeue_dead(&self, user_id: &str) -> Result<usize>;

    /// Count pending and dead records for an account
    fn summary(&self, user_id: &str) -> Result<JournalSummary>;

    /// Count records across every account
    fn count(&self) -> Result<usize>;

    /// Remove every record
    fn clear(&self) -> Result<()>;
}

/// `SQLite` implementation of `JournalRepository`
pub struct SqliteJournalRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteJournalRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<SyncRecord> {
        let note_id: String = row.get(3)?;
        let note_id = note_id.parse::<NoteId>().map_err(|error| {
            rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(error))
        })?;
        let operation: String = row.get(4)?;
        let operation = operation.parse::<SyncOperation>().map_err(|error| {
            rusqlite::Error::FromSqlConversionFailure(4, Type::Text, error.into())
        })?;
        let status: String = row.get(11)?;
        let status = status.parse::<RecordStatus>().map_err(|error| {
            rusqlite::Error::FromSqlConversionFailure(11, Type::Text, error.into())
        })?;

        Ok(SyncRecord {
            seq: row.get(0)?,
            id: row.get(1)?,
            user_id: row.get(2)?,
            note_id,
            operation,
            payload: row.get(5)?,
            timestamp: row.get(6)?,
            attempts: row.get(7)?,
            next_retry_at: row.get(8)?,
            last_error: row.get(9)?,
            last_error_code: row.get(10)?,
            status,
        })
    }

    fn query_records(&self, sql: &str, user_id: &str) -> Result<Vec<SyncRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let records = stmt
            .query_map(params![user_id], Self::parse_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }
}

impl JournalRepository for SqliteJournalRepository<'_> {
    fn get_by_note(&self, note_id: &NoteId) -> Result<Option<SyncRecord>> {
        let record = self
            .conn
            .query_row(
                &format!("SELECT {RECORD_COLUMNS} FROM sync_records WHERE note_id = ?"),
                params![note_id.as_str()],
                Self::parse_record,
            )
            .optional()?;
        Ok(record)
    }

    fn insert(&self, record: &SyncRecord) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sync_records
                (id, user_id, note_id, operation, payload, timestamp,
                 attempts, next_retry_at, last_error, last_error_code, status)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                record.id,
                record.user_id,
                record.note_id.as_str(),
                record.operation.as_str(),
                record.payload,
                record.timestamp,
                record.attempts,
                record.next_retry_at,
                record.last_error,
                record.last_error_code,
                record.status.as_str(),
            ],
        )?;
        Ok(())
    }

    fn rewrite(
        &self,
        id: &str,
        user_id: &str,
        operation: SyncOperation,
        payload: &str,
        timestamp: i64,
    ) -> Result<()> {
        self.conn.execute(
            "UPDATE sync_records
             SET user_id = ?, operation = ?, payload = ?, timestamp = ?,
                 attempts = 0, next_retry_at = NULL, last_error = NULL,
                 last_error_code = NULL, status = 'PENDING'
             WHERE id = ?",
            params![user_id, operation.as_str(), payload, timestamp, id],
        )?;
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM sync_records WHERE id = ?", params![id])?;
        Ok(rows > 0)
    }

    fn list_for_user(&self, user_id: &str) -> Result<Vec<SyncRecord>> {
        self.query_records(
            &format!("SELECT {RECORD_COLUMNS} FROM sync_records WHERE user_id = ? ORDER BY seq ASC"),
            user_id,
        )
    }

    fn list_pending_for_user(&self, user_id: &str) -> Result<Vec<SyncRecord>> {
        self.query_records(
            &format!(
                "SELECT {RECORD_COLUMNS} FROM sync_records
                 WHERE user_id = ? AND status = 'PENDING'
                 ORDER BY seq ASC"
            ),
            user_id,
        )
    }

    fn record_retry(
        &self,
        id: &str,
        attempts: u32,
        next_retry_at: i64,
        error: &str,
        code: Option<u16>,
    ) -> Result<()> {
        self.conn.execute(
            "UPDATE sync_records
             SET attempts = ?, next_retry_at = ?, last_error = ?, last_error_code = ?
             WHERE id = ?",
            params![attempts, next_retry_at, error, code, id],
        )?;
        Ok(())
    }

    fn mark_dead(&self, id: &str, attempts: u32, error: &str, code: Option<u16>) -> Result<()> {
        self.conn.execute(
            "UPDATE sync_records
             SET attempts = ?, next_retry_at = NULL, last_error = ?, last_error_code = ?,
                 status = 'DEAD'
             WHERE id = ?",
            params![attempts, error, code, id],
        )?;
        Ok(())
    }

    fn requeue_dead(&self, user_id: &str) -> Result<usize> {
        let rows = self.conn.execute(
            "UPDATE sync_records
             SET status = 'PENDING', attempts = 0, next_retry_at = NULL
             WHERE user_id = ? AND status = 'DEAD'",
            params![user_id],
        )?;
        Ok(rows)
    }

    fn summary(&self, user_id: &str) -> Result<JournalSummary> {
        let (pending, dead): (i64, i64) = self.conn.query_row(
            "SELECT
                COALESCE(SUM(CASE WHEN status = 'PENDING' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN status = 'DEAD' THEN 1 ELSE 0 END), 0)
             FROM sync_records WHERE user_id = ?",
            params![user_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(JournalSummary {
            pending: usize::try_from(pending).unwrap_or_default(),
            dead: usize::try_from(dead).unwrap_or_default(),
        })
    }

    fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM sync_records", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    fn clear(&self) -> Result<()> {
        self.conn.execute("DELETE FROM sync_records", [])?;
        Ok(())
    }
}
