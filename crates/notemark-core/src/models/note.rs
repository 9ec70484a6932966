//! Note model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::util::{millis_to_rfc3339, rfc3339_to_millis};

/// Title applied when a note is created without one.
pub const DEFAULT_NOTE_TITLE: &str = "Note Title";

/// A unique identifier for a note, assigned on this device and never reassigned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(Uuid);

impl NoteId {
    /// Create a new unique note ID
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for NoteId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NoteId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s.trim())?))
    }
}

/// Where a note has been acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataOrigin {
    /// Created on this device, never acknowledged by the server
    Local,
    /// The server has accepted this note
    Remote,
}

impl DataOrigin {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "LOCAL",
            Self::Remote => "REMOTE",
        }
    }
}

impl FromStr for DataOrigin {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOCAL" => Ok(Self::Local),
            "REMOTE" => Ok(Self::Remote),
            other => Err(format!("unknown note origin '{other}'")),
        }
    }
}

/// Sync lifecycle of a note.
///
/// Replaces the `(origin, is_synced, is_deleted)` flag triple so that
/// combinations such as "local and synced" or "local and soft-deleted" cannot
/// exist. Local deletes are immediate hard deletes and have no state here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteState {
    /// Created locally, waiting for its first successful create-sync
    LocalUnsynced,
    /// Server copy matches the local copy
    RemoteSynced,
    /// Known to the server, edited locally since
    RemoteEdited,
    /// Known to the server, deleted locally; hidden until the delete is confirmed
    RemoteDeletePending,
}

impl NoteState {
    pub const fn origin(self) -> DataOrigin {
        match self {
            Self::LocalUnsynced => DataOrigin::Local,
            Self::RemoteSynced | Self::RemoteEdited | Self::RemoteDeletePending => {
                DataOrigin::Remote
            }
        }
    }

    pub const fn is_synced(self) -> bool {
        matches!(self, Self::RemoteSynced)
    }

    pub const fn is_deleted(self) -> bool {
        matches!(self, Self::RemoteDeletePending)
    }

    /// Rebuild a state from its stored flag columns.
    ///
    /// Returns `None` for combinations the lifecycle never produces.
    pub const fn from_flags(origin: DataOrigin, is_synced: bool, is_deleted: bool) -> Option<Self> {
        match (origin, is_synced, is_deleted) {
            (DataOrigin::Local, false, false) => Some(Self::LocalUnsynced),
            (DataOrigin::Remote, true, false) => Some(Self::RemoteSynced),
            (DataOrigin::Remote, false, false) => Some(Self::RemoteEdited),
            (DataOrigin::Remote, false, true) => Some(Self::RemoteDeletePending),
            _ => None,
        }
    }

    /// State after a local edit.
    pub const fn edited(self) -> Self {
        match self {
            Self::LocalUnsynced => Self::LocalUnsynced,
            Self::RemoteSynced | Self::RemoteEdited | Self::RemoteDeletePending => {
                Self::RemoteEdited
            }
        }
    }
}

/// A note in the system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Unique identifier
    pub id: NoteId,
    pub title: String,
    pub content: String,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last edit timestamp (Unix ms)
    pub last_edited_at: i64,
    /// Sync lifecycle state
    pub state: NoteState,
}

impl Note {
    /// Create a new local note. An empty title falls back to [`DEFAULT_NOTE_TITLE`].
    #[must_use]
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        let title = title.into();
        Self {
            id: NoteId::new(),
            title: if title.trim().is_empty() {
                DEFAULT_NOTE_TITLE.to_string()
            } else {
                title
            },
            content: content.into(),
            created_at: now,
            last_edited_at: now,
            state: NoteState::LocalUnsynced,
        }
    }

    pub const fn origin(&self) -> DataOrigin {
        self.state.origin()
    }

    pub const fn is_synced(&self) -> bool {
        self.state.is_synced()
    }

    pub const fn is_deleted(&self) -> bool {
        self.state.is_deleted()
    }

    /// Apply a local edit: new fields, fresh edit time, unsynced state.
    #[must_use]
    pub fn edit(mut self, title: impl Into<String>, content: impl Into<String>) -> Self {
        self.title = title.into();
        self.content = content.into();
        self.last_edited_at = chrono::Utc::now()
            .timestamp_millis()
            .max(self.last_edited_at);
        self.state = self.state.edited();
        self
    }

    /// Snapshot of the syncable fields, as sent to the server.
    #[must_use]
    pub fn payload(&self) -> NotePayload {
        NotePayload {
            id: self.id,
            title: self.title.clone(),
            content: self.content.clone(),
            created_at: millis_to_rfc3339(self.created_at),
            last_edited_at: millis_to_rfc3339(self.last_edited_at),
        }
    }

    /// First line of the content, truncated to `max_len` characters
    #[must_use]
    pub fn content_preview(&self, max_len: usize) -> String {
        self.content
            .lines()
            .next()
            .unwrap_or("")
            .chars()
            .take(max_len)
            .collect()
    }
}

/// Wire/journal representation of a note.
///
/// Complete enough to replay any journal operation without touching the
/// note store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotePayload {
    pub id: NoteId,
    pub title: String,
    pub content: String,
    /// RFC 3339
    pub created_at: String,
    /// RFC 3339
    pub last_edited_at: String,
}

impl NotePayload {
    /// Serialize for storage in a journal record.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    /// Convert a server-side note into a note in the given state.
    ///
    /// Unparseable timestamps fall back to `fallback_ms`.
    #[must_use]
    pub fn into_note(self, state: NoteState, fallback_ms: i64) -> Note {
        let created_at = rfc3339_to_millis(&self.created_at).unwrap_or(fallback_ms);
        let last_edited_at = rfc3339_to_millis(&self.last_edited_at).unwrap_or(created_at);
        Note {
            id: self.id,
            title: self.title,
            content: self.content,
            created_at,
            last_edited_at,
            state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_id_unique() {
        let id1 = NoteId::new();
        let id2 = NoteId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_note_id_parse() {
        let id = NoteId::new();
        let parsed: NoteId = id.as_str().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_note_new_is_local_unsynced() {
        let note = Note::new("Groceries", "Milk");
        assert_eq!(note.title, "Groceries");
        assert_eq!(note.origin(), DataOrigin::Local);
        assert!(!note.is_synced());
        assert!(!note.is_deleted());
        assert_eq!(note.created_at, note.last_edited_at);
    }

    #[test]
    fn test_note_new_defaults_blank_title() {
        let note = Note::new("  ", "body");
        assert_eq!(note.title, DEFAULT_NOTE_TITLE);
    }

    #[test]
    fn test_edit_marks_remote_note_edited() {
        let mut note = Note::new("a", "b");
        note.state = NoteState::RemoteSynced;
        let edited = note.clone().edit("a2", "b2");
        assert_eq!(edited.state, NoteState::RemoteEdited);
        assert_eq!(edited.created_at, note.created_at);
        assert!(edited.last_edited_at >= note.last_edited_at);

        let local = Note::new("a", "b").edit("c", "d");
        assert_eq!(local.state, NoteState::LocalUnsynced);
    }

    #[test]
    fn test_state_flags_reject_illegal_combinations() {
        assert_eq!(
            NoteState::from_flags(DataOrigin::Local, false, false),
            Some(NoteState::LocalUnsynced)
        );
        assert_eq!(NoteState::from_flags(DataOrigin::Local, true, false), None);
        assert_eq!(NoteState::from_flags(DataOrigin::Local, false, true), None);
        assert_eq!(NoteState::from_flags(DataOrigin::Remote, true, true), None);
        for state in [
            NoteState::LocalUnsynced,
            NoteState::RemoteSynced,
            NoteState::RemoteEdited,
            NoteState::RemoteDeletePending,
        ] {
            assert_eq!(
                NoteState::from_flags(state.origin(), state.is_synced(), state.is_deleted()),
                Some(state)
            );
        }
    }

    #[test]
    fn test_payload_uses_camel_case_wire_names() {
        let note = Note::new("Title", "Body");
        let json = note.payload().to_json().unwrap();
        assert!(json.contains("\"createdAt\""));
        assert!(json.contains("\"lastEditedAt\""));
        assert!(json.contains(&note.id.as_str()));

        let restored = NotePayload::from_json(&json)
            .unwrap()
            .into_note(NoteState::RemoteSynced, 0);
        assert_eq!(restored.id, note.id);
        assert_eq!(restored.created_at, note.created_at);
        assert_eq!(restored.state, NoteState::RemoteSynced);
    }

    #[test]
    fn test_content_preview() {
        let note = Note::new("t", "First line\nSecond line");
        assert_eq!(note.content_preview(50), "First line");
        assert_eq!(note.content_preview(5), "First");
    }
}
