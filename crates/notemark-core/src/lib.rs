//! notemark-core - Core library for NoteMark
//!
//! This crate contains the note and journal models, the SQLite-backed local
//! store, the remote note service contract, and the offline-first sync engine
//! (reconciler + trigger) used by every NoteMark front end.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod remote;
pub mod services;
pub mod session;
pub mod state;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{Note, NoteId, NoteState, SyncOperation, SyncRecord};
pub use session::{Session, SessionHandle};
pub use state::SyncState;
