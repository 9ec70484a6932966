//! Sync journal record model

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::note::{NoteId, NotePayload};

/// Outstanding intent for one note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SyncOperation {
    Create,
    Update,
    Delete,
}

impl SyncOperation {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

impl FromStr for SyncOperation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATE" => Ok(Self::Create),
            "UPDATE" => Ok(Self::Update),
            "DELETE" => Ok(Self::Delete),
            other => Err(format!("unknown sync operation '{other}'")),
        }
    }
}

/// Replay eligibility of a journal record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordStatus {
    /// Replayed on the next pass (subject to its retry delay)
    Pending,
    /// Permanently rejected or out of attempts; kept for inspection
    Dead,
}

impl RecordStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Dead => "DEAD",
        }
    }
}

impl FromStr for RecordStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "DEAD" => Ok(Self::Dead),
            other => Err(format!("unknown record status '{other}'")),
        }
    }
}

/// Journal entry: the single outstanding operation for a note
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRecord {
    /// Record identifier (UUID)
    pub id: String,
    /// Insertion order; replay follows ascending `seq`
    pub seq: i64,
    /// Account the intent belongs to
    pub user_id: String,
    pub note_id: NoteId,
    pub operation: SyncOperation,
    /// Serialized [`NotePayload`] captured at journal-write time
    pub payload: String,
    /// Last write time (Unix ms)
    pub timestamp: i64,
    /// Failed replay attempts since the last local write
    pub attempts: u32,
    /// Earliest time a scheduled pass may retry this record (Unix ms)
    pub next_retry_at: Option<i64>,
    pub last_error: Option<String>,
    pub last_error_code: Option<u16>,
    pub status: RecordStatus,
}

impl SyncRecord {
    /// Build a fresh record for insertion; `seq` is assigned by the store.
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        note_id: NoteId,
        operation: SyncOperation,
        payload: String,
        timestamp: i64,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            seq: 0,
            user_id: user_id.into(),
            note_id,
            operation,
            payload,
            timestamp,
            attempts: 0,
            next_retry_at: None,
            last_error: None,
            last_error_code: None,
            status: RecordStatus::Pending,
        }
    }

    /// Decode the stored payload.
    pub fn note_payload(&self) -> serde_json::Result<NotePayload> {
        NotePayload::from_json(&self.payload)
    }

    /// Whether `current` still carries the intent this snapshot was taken from.
    ///
    /// Any local write in between changes the operation, payload or timestamp.
    #[must_use]
    pub fn same_intent(&self, current: &Self) -> bool {
        self.id == current.id
            && self.operation == current.operation
            && self.payload == current.payload
            && self.timestamp == current.timestamp
    }

    /// Whether a scheduled pass may replay this record at `now_ms`.
    #[must_use]
    pub fn is_due(&self, now_ms: i64) -> bool {
        self.status == RecordStatus::Pending && self.next_retry_at.map_or(true, |at| at <= now_ms)
    }
}
