//! Data models for NoteMark

mod note;
mod settings;
mod sync_record;

pub use note::{DataOrigin, Note, NoteId, NotePayload, NoteState, DEFAULT_NOTE_TITLE};
pub use settings::{Settings, SyncInterval};
pub use sync_record::{RecordStatus, SyncOperation, SyncRecord};
