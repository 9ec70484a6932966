use std::env;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::Utc;
use notemark_core::config::ClientConfig;
use notemark_core::remote::HttpNoteService;
use notemark_core::services::DatabaseService;
use notemark_core::sync::Reconciler;
use notemark_core::{Note, NoteId, NoteState, SessionHandle, SyncRecord};
use serde::Serialize;

use crate::cli_config::CliConfig;
use crate::error::CliError;

/// Everything a command needs: local store, restored session and sync engine.
pub struct App {
    pub store: DatabaseService,
    pub session: SessionHandle,
    pub reconciler: Arc<Reconciler>,
    pub client_config: ClientConfig,
}

impl App {
    /// Open the store at `db_path` and restore any saved session.
    pub async fn open(db_path: &Path) -> Result<Self, CliError> {
        let config = CliConfig::load().map_err(CliError::Config)?;
        let client_config = config.client_config().map_err(CliError::Config)?;
        Self::open_with(db_path, client_config).await
    }

    pub async fn open_with(db_path: &Path, client_config: ClientConfig) -> Result<Self, CliError> {
        let store = DatabaseService::open_path(db_path)?;
        let session = SessionHandle::new(store.load_session().await?);
        let remote = HttpNoteService::new(client_config.clone())?;
        let reconciler = Arc::new(Reconciler::new(
            store.clone(),
            Arc::new(remote),
            session.clone(),
        ));

        Ok(Self {
            store,
            session,
            reconciler,
            client_config,
        })
    }

    pub fn require_session(&self) -> Result<(), CliError> {
        if self.session.is_active() {
            Ok(())
        } else {
            Err(CliError::NotSignedIn)
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NoteListItem {
    pub id: String,
    pub title: String,
    pub preview: String,
    pub content: String,
    pub created_at: i64,
    pub last_edited_at: i64,
    pub relative_time: String,
    pub synced: bool,
}

#[derive(Debug, Serialize)]
pub struct JournalItem {
    pub seq: i64,
    pub note_id: String,
    pub operation: String,
    pub status: String,
    pub attempts: u32,
    pub next_retry_at: Option<String>,
    pub last_error: Option<String>,
    pub last_error_code: Option<u16>,
}

pub async fn resolve_note(note_query: &str, db: &DatabaseService) -> Result<Note, CliError> {
    if let Ok(note_id) = note_query.parse::<NoteId>() {
        if let Some(note) = db.get_note(&note_id).await? {
            if !note.is_deleted() {
                return Ok(note);
            }
        }
    }

    let matching_ids = db.find_note_ids(note_query, 3).await?;

    match matching_ids.len() {
        0 => Err(CliError::NoteNotFound(note_query.to_string())),
        1 => {
            let resolved_id = matching_ids[0]
                .parse::<NoteId>()
                .map_err(|_| CliError::NoteNotFound(note_query.to_string()))?;
            db.get_note(&resolved_id)
                .await?
                .filter(|note| !note.is_deleted())
                .ok_or_else(|| CliError::NoteNotFound(note_query.to_string()))
        }
        _ => {
            let options = matching_ids
                .iter()
                .map(|id| short_id(id))
                .collect::<Vec<_>>()
                .join(", ");

            Err(CliError::AmbiguousNoteId(format!(
                "ID prefix '{note_query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

pub fn short_id(id: &str) -> String {
    id.chars().take(13).collect()
}

pub const fn state_marker(state: NoteState) -> &'static str {
    match state {
        NoteState::RemoteSynced => " ",
        NoteState::LocalUnsynced | NoteState::RemoteEdited => "*",
        NoteState::RemoteDeletePending => "-",
    }
}

pub fn format_note_lines(notes: &[Note]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    notes
        .iter()
        .map(|note| {
            let short_id = short_id(&note.id.to_string());
            let title = truncate(&note.title, 24);
            let preview = note_preview(note, 40);
            let relative_time = format_relative_time(note.last_edited_at, now_ms);
            let marker = state_marker(note.state);

            format!("{marker} {short_id:<13}  {title:<24}  {preview:<40}  {relative_time}")
        })
        .collect()
}

pub fn note_to_list_item(note: &Note) -> NoteListItem {
    let now_ms = Utc::now().timestamp_millis();
    NoteListItem {
        id: note.id.to_string(),
        title: note.title.clone(),
        preview: note_preview(note, 80),
        content: note.content.clone(),
        created_at: note.created_at,
        last_edited_at: note.last_edited_at,
        relative_time: format_relative_time(note.last_edited_at, now_ms),
        synced: note.is_synced(),
    }
}

pub fn record_to_journal_item(record: &SyncRecord) -> JournalItem {
    JournalItem {
        seq: record.seq,
        note_id: record.note_id.to_string(),
        operation: record.operation.as_str().to_string(),
        status: record.status.as_str().to_string(),
        attempts: record.attempts,
        next_retry_at: record.next_retry_at.map(format_timestamp),
        last_error: record.last_error.clone(),
        last_error_code: record.last_error_code,
    }
}

pub fn format_journal_lines(records: &[SyncRecord]) -> Vec<String> {
    records
        .iter()
        .map(|record| {
            let mut line = format!(
                "{:>4}  {:<6}  {:<13}  {:<7}  attempts={}",
                record.seq,
                record.operation.as_str(),
                short_id(&record.note_id.to_string()),
                record.status.as_str(),
                record.attempts
            );
            if let Some(error) = &record.last_error {
                let code = record
                    .last_error_code
                    .map_or_else(String::new, |code| format!("HTTP {code}: "));
                line.push_str(&format!("  last_error=\"{code}{error}\""));
            }
            line
        })
        .collect()
}

pub fn note_preview(note: &Note, max_chars: usize) -> String {
    let first_line = note.content.lines().next().unwrap_or("").trim();
    let collapsed = first_line.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate(&collapsed, max_chars)
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = text.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn format_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

/// Content from arguments, then piped stdin, then `$EDITOR`.
pub fn resolve_note_content(content_parts: &[String]) -> Result<String, CliError> {
    if let Some(content) = normalize_content(&content_parts.join(" ")) {
        return Ok(content);
    }

    if let Some(content) = read_piped_stdin()? {
        return Ok(content);
    }

    if let Some(content) = capture_editor_input_with_initial("")? {
        return Ok(content);
    }

    Err(CliError::EmptyContent)
}

pub fn normalize_content(content: &str) -> Option<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn normalize_note_identifier(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyNoteId)
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(normalize_content(&buffer))
}

pub fn capture_editor_input_with_initial(
    initial_content: &str,
) -> Result<Option<String>, CliError> {
    let editor = preferred_editor();
    let temp_file = create_temp_note_file_path();
    std::fs::write(&temp_file, initial_content)?;

    let launch_result = launch_editor(&editor, &temp_file);
    let note_content = std::fs::read_to_string(&temp_file)?;
    let _ = std::fs::remove_file(&temp_file);

    launch_result?;
    Ok(normalize_content(&note_content))
}

pub fn launch_editor(editor: &str, file_path: &Path) -> Result<(), CliError> {
    let mut parts = editor.split_whitespace();
    let Some(program) = parts.next() else {
        return Err(CliError::EditorFailed("empty EDITOR command".into()));
    };

    let status = Command::new(program).args(parts).arg(file_path).status()?;
    if status.success() {
        Ok(())
    } else {
        Err(CliError::EditorFailed(format!(
            "`{editor}` exited with status {status}"
        )))
    }
}

pub fn preferred_editor() -> String {
    env::var("VISUAL")
        .or_else(|_| env::var("EDITOR"))
        .unwrap_or_else(|_| default_editor().to_string())
}

pub const fn default_editor() -> &'static str {
    if cfg!(windows) {
        "notepad"
    } else {
        "vi"
    }
}

pub fn create_temp_note_file_path() -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_nanos());
    env::temp_dir().join(format!("notemark-note-{}-{now}.md", std::process::id()))
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("NOTEMARK_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| panic!("Failed to resolve CLI data directory"))
        .join("notemark")
        .join("notemark.db")
}
