//! Database migrations

use crate::error::Result;
use rusqlite::Connection;

/// Current schema version
const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations
pub fn run(conn: &mut Connection) -> Result<()> {
    let version = get_version(conn)?;

    if version < 1 {
        migrate_v1(conn)?;
    }
    if version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

/// Get the current schema version
fn get_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;

    Ok(version)
}

/// Migration to version 1: notes, journal, settings
fn migrate_v1(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );

        CREATE TABLE IF NOT EXISTS notes (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            last_edited_at INTEGER NOT NULL,
            origin TEXT NOT NULL CHECK (origin IN ('LOCAL', 'REMOTE')),
            is_synced INTEGER NOT NULL DEFAULT 0,
            is_deleted INTEGER NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_notes_edited ON notes(last_edited_at DESC);
        CREATE INDEX IF NOT EXISTS idx_notes_deleted ON notes(is_deleted);

        -- One outstanding intent per note: note_id is UNIQUE.
        CREATE TABLE IF NOT EXISTS sync_records (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            user_id TEXT NOT NULL,
            note_id TEXT NOT NULL UNIQUE,
            operation TEXT NOT NULL CHECK (operation IN ('CREATE', 'UPDATE', 'DELETE')),
            payload TEXT NOT NULL,
            timestamp INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_sync_records_user ON sync_records(user_id, seq);

        -- Local key/value settings: session, last sync, preferences
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        INSERT INTO schema_version (version) VALUES (1);",
    )?;

    tx.commit()?;
    tracing::info!("Migrated database to version 1");
    Ok(())
}

/// Migration to version 2: retry bookkeeping and dead-lettering for journal records
fn migrate_v2(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction()?;

    tx.execute_batch(
        "ALTER TABLE sync_records ADD COLUMN attempts INTEGER NOT NULL DEFAULT 0;
        ALTER TABLE sync_records ADD COLUMN next_retry_at INTEGER;
        ALTER TABLE sync_records ADD COLUMN last_error TEXT;
        ALTER TABLE sync_records ADD COLUMN last_error_code INTEGER;
        ALTER TABLE sync_records ADD COLUMN status TEXT NOT NULL DEFAULT 'PENDING'
            CHECK (status IN ('PENDING', 'DEAD'));
        CREATE INDEX IF NOT EXISTS idx_sync_records_status ON sync_records(status);

        INSERT INTO schema_version (version) VALUES (2);",
    )?;

    tx.commit()?;
    tracing::info!("Migrated database to version {CURRENT_VERSION}");
    Ok(())
}
