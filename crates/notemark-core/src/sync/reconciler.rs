//! Journal intake and replay.
//!
//! Local mutations go through [`Reconciler::record_create`],
//! [`Reconciler::record_update`] and [`Reconciler::record_delete`], which write
//! the note and its journal record in one transaction. A pass
//! ([`Reconciler::run_sync`]) replays the journal against the remote service in
//! insertion order and applies each result against the record as it stands
//! when the result arrives, so local edits made while a call is in flight are
//! never lost.

use std::sync::Arc;

use rusqlite::Connection;
use tokio::sync::Mutex;

use super::outcome::{PassSummary, ReplayMode, SyncOutcome};
use super::retry::{backoff_millis, classify, RetryClass, MAX_ATTEMPTS};
use crate::db::{
    JournalRepository, JournalSummary, NoteRepository, SettingsRepository,
    SqliteJournalRepository, SqliteNoteRepository, SqliteSettingsRepository,
};
use crate::error::{Error, Result};
use crate::models::{
    DataOrigin, Note, NoteId, NotePayload, NoteState, SyncOperation, SyncRecord,
    DEFAULT_NOTE_TITLE,
};
use crate::remote::{RemoteError, RemoteNoteService, RemoteResult};
use crate::services::DatabaseService;
use crate::session::{Session, SessionHandle};
use crate::util::unix_millis_now;

/// Page size used when pulling the server's notes.
pub const PULL_PAGE_SIZE: u32 = 20;

/// Server acknowledgement of one replayed record.
enum Ack {
    Created(NotePayload),
    Updated,
    Deleted,
}

/// Why a replay failed, as recorded on the journal record.
struct Failure {
    message: String,
    code: Option<u16>,
    class: RetryClass,
}

impl From<&RemoteError> for Failure {
    fn from(error: &RemoteError) -> Self {
        Self {
            message: error.message.clone(),
            code: error.code,
            class: classify(error),
        }
    }
}

/// Journals local note mutations and replays them against the remote service.
pub struct Reconciler {
    store: DatabaseService,
    remote: Arc<dyn RemoteNoteService>,
    session: SessionHandle,
    pass_lock: Mutex<()>,
}

impl Reconciler {
    pub fn new(
        store: DatabaseService,
        remote: Arc<dyn RemoteNoteService>,
        session: SessionHandle,
    ) -> Self {
        Self {
            store,
            remote,
            session,
            pass_lock: Mutex::new(()),
        }
    }

    pub const fn store(&self) -> &DatabaseService {
        &self.store
    }

    pub const fn session(&self) -> &SessionHandle {
        &self.session
    }

    fn require_user(&self) -> Result<String> {
        self.session
            .current()
            .map(|session| session.user_id)
            .ok_or(Error::NoSession)
    }

    // ------------------------------------------------------------------
    // Intake
    // ------------------------------------------------------------------

    /// Store a new local note and journal its CREATE.
    pub async fn record_create(&self, note: Note) -> Result<Note> {
        let user_id = self.require_user()?;
        let mut note = note;
        note.state = NoteState::LocalUnsynced;
        if note.title.trim().is_empty() {
            note.title = DEFAULT_NOTE_TITLE.to_string();
        }

        let record = SyncRecord::new(
            user_id,
            note.id,
            SyncOperation::Create,
            note.payload().to_json()?,
            unix_millis_now(),
        );
        self.store
            .write(|tx| {
                SqliteNoteRepository::new(tx).insert(&note)?;
                SqliteJournalRepository::new(tx).insert(&record)
            })
            .await?;

        tracing::debug!("Journaled CREATE for note {}", note.id);
        Ok(note)
    }

    /// Store edited fields of an existing note and merge the edit into its journal record.
    ///
    /// Title, content and edit time come from `note`; identity, creation time
    /// and state come from the stored copy.
    pub async fn record_update(&self, note: &Note) -> Result<Note> {
        let user_id = self.require_user()?;
        let now = unix_millis_now();

        let updated = self
            .store
            .write(|tx| {
                let notes = SqliteNoteRepository::new(tx);
                let journal = SqliteJournalRepository::new(tx);

                let stored = notes
                    .get(&note.id)?
                    .filter(|stored| !stored.is_deleted())
                    .ok_or_else(|| Error::NotFound(note.id.to_string()))?;

                let updated = Note {
                    id: stored.id,
                    title: note.title.clone(),
                    content: note.content.clone(),
                    created_at: stored.created_at,
                    last_edited_at: note.last_edited_at.max(stored.last_edited_at),
                    state: stored.state.edited(),
                };
                notes.update(&updated)?;

                let payload = updated.payload().to_json()?;
                match journal.get_by_note(&updated.id)? {
                    // A pending CREATE absorbs the edit and stays a CREATE.
                    Some(existing) if existing.operation == SyncOperation::Create => {
                        journal.rewrite(
                            &existing.id,
                            &user_id,
                            SyncOperation::Create,
                            &payload,
                            now,
                        )?;
                    }
                    Some(existing) => {
                        journal.rewrite(
                            &existing.id,
                            &user_id,
                            SyncOperation::Update,
                            &payload,
                            now,
                        )?;
                    }
                    None => {
                        let operation = match updated.origin() {
                            DataOrigin::Local => SyncOperation::Create,
                            DataOrigin::Remote => SyncOperation::Update,
                        };
                        journal.insert(&SyncRecord::new(
                            user_id.as_str(),
                            updated.id,
                            operation,
                            payload,
                            now,
                        ))?;
                    }
                }
                Ok(updated)
            })
            .await?;

        tracing::debug!("Journaled edit for note {}", updated.id);
        Ok(updated)
    }

    /// Delete a note locally.
    ///
    /// Local-only notes disappear immediately together with their pending
    /// CREATE. Notes the server knows are hidden and journaled for deletion.
    pub async fn record_delete(&self, id: &NoteId) -> Result<()> {
        let user_id = self.require_user()?;
        let now = unix_millis_now();

        self.store
            .write(|tx| {
                let notes = SqliteNoteRepository::new(tx);
                let journal = SqliteJournalRepository::new(tx);

                let note = notes
                    .get(id)?
                    .ok_or_else(|| Error::NotFound(id.to_string()))?;
                if note.is_deleted() {
                    return Ok(());
                }
                let existing = journal.get_by_note(id)?;

                match note.origin() {
                    DataOrigin::Local => {
                        notes.hard_delete(id)?;
                        if let Some(existing) = existing {
                            journal.delete(&existing.id)?;
                        }
                    }
                    DataOrigin::Remote => {
                        let pending = Note {
                            state: NoteState::RemoteDeletePending,
                            ..note
                        };
                        notes.set_state(id, pending.state)?;
                        let payload = pending.payload().to_json()?;
                        match existing {
                            Some(existing) => journal.rewrite(
                                &existing.id,
                                &user_id,
                                SyncOperation::Delete,
                                &payload,
                                now,
                            )?,
                            None => journal.insert(&SyncRecord::new(
                                user_id.as_str(),
                                *id,
                                SyncOperation::Delete,
                                payload,
                                now,
                            ))?,
                        }
                    }
                }
                Ok(())
            })
            .await?;

        tracing::debug!("Recorded delete for note {id}");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Replay
    // ------------------------------------------------------------------

    /// Replay the current account's journal against the remote service.
    ///
    /// Per-record failures are values in the outcome; an `Err` means the local
    /// store failed and the pass was abandoned without recording a last-sync
    /// time.
    pub async fn run_sync(&self, mode: ReplayMode) -> Result<SyncOutcome> {
        let _pass = self.pass_lock.lock().await;

        let Some(session) = self.session.current() else {
            tracing::debug!("Skipping sync pass: no active session");
            return Ok(SyncOutcome::Idle);
        };

        match self.replay_journal(&session, mode).await {
            Ok(outcome) => Ok(outcome),
            Err(error) => {
                tracing::error!("Sync pass aborted: {error}");
                Err(error)
            }
        }
    }

    async fn replay_journal(&self, session: &Session, mode: ReplayMode) -> Result<SyncOutcome> {
        let user_id = session.user_id.as_str();
        let snapshot = self
            .store
            .read(|conn| SqliteJournalRepository::new(conn).list_pending_for_user(user_id))
            .await?;
        let started = unix_millis_now();
        let mut summary = PassSummary::default();

        tracing::info!(
            "Sync pass started ({mode:?}) with {} pending record(s)",
            snapshot.len()
        );

        for record in snapshot {
            if mode == ReplayMode::Scheduled && !record.is_due(started) {
                summary.deferred += 1;
                continue;
            }
            if !self.session_belongs_to(user_id) {
                tracing::info!("Session changed; stopping sync pass");
                return Ok(SyncOutcome::Interrupted(summary));
            }

            let result = match self.replay(session, &record).await {
                Ok(result) => result,
                Err(failure) => {
                    // Undecodable payloads never reach the network.
                    if self.apply_failure(&record, &failure).await? {
                        summary.dead_lettered += 1;
                    }
                    summary.failed += 1;
                    continue;
                }
            };

            match result {
                Ok(ack) => {
                    self.apply_ack(user_id, &record, ack).await?;
                    summary.pushed += 1;
                }
                Err(error)
                    if record.operation == SyncOperation::Delete && error.is_not_found() =>
                {
                    tracing::debug!("Note {} already gone on the server", record.note_id);
                    self.apply_ack(user_id, &record, Ack::Deleted).await?;
                    summary.pushed += 1;
                }
                Err(error) => {
                    let failure = Failure::from(&error);
                    if failure.class == RetryClass::ReauthRequired {
                        tracing::warn!("Server rejected the session: {error}");
                        return Ok(SyncOutcome::Unauthorized(summary));
                    }
                    tracing::warn!(
                        "{} for note {} failed: {error}",
                        record.operation.as_str(),
                        record.note_id
                    );
                    if self.apply_failure(&record, &failure).await? {
                        summary.dead_lettered += 1;
                    }
                    summary.failed += 1;
                }
            }
        }

        let finished = unix_millis_now();
        let remaining = self
            .store
            .write(|tx| {
                SqliteSettingsRepository::new(tx).set_last_sync_at(user_id, finished)?;
                SqliteJournalRepository::new(tx).summary(user_id)
            })
            .await?;

        tracing::info!(
            "Sync pass finished: {} pushed, {} failed, {} dead-lettered, {} deferred",
            summary.pushed,
            summary.failed,
            summary.dead_lettered,
            summary.deferred
        );

        // Dead, deferred and rewritten records all keep the pass from being a success.
        if remaining.total() == 0 {
            Ok(SyncOutcome::Success(summary))
        } else {
            Ok(SyncOutcome::PartialFailure(summary))
        }
    }

    fn session_belongs_to(&self, user_id: &str) -> bool {
        self.session
            .current()
            .is_some_and(|session| session.user_id == user_id)
    }

    /// Perform the remote call for one record.
    ///
    /// The outer error is a record that cannot be replayed at all.
    async fn replay(
        &self,
        session: &Session,
        record: &SyncRecord,
    ) -> std::result::Result<RemoteResult<Ack>, Failure> {
        tracing::debug!(
            "Replaying {} for note {}",
            record.operation.as_str(),
            record.note_id
        );

        if record.operation == SyncOperation::Delete {
            return Ok(self
                .remote
                .delete(session, &record.note_id)
                .await
                .map(|()| Ack::Deleted));
        }

        let payload = record.note_payload().map_err(|error| Failure {
            message: format!("unreadable journal payload: {error}"),
            code: None,
            class: RetryClass::Permanent,
        })?;

        Ok(match record.operation {
            SyncOperation::Create => match self.remote.create(session, &payload).await {
                // An earlier CREATE landed but its response was lost.
                Err(error) if error.is_conflict() => {
                    tracing::debug!(
                        "Note {} already exists on the server; sending as update",
                        record.note_id
                    );
                    self.remote
                        .update(session, &payload)
                        .await
                        .map(Ack::Created)
                }
                result => result.map(Ack::Created),
            },
            SyncOperation::Update | SyncOperation::Delete => self
                .remote
                .update(session, &payload)
                .await
                .map(|_| Ack::Updated),
        })
    }

    /// Apply a server acknowledgement against the current journal record.
    async fn apply_ack(&self, user_id: &str, snapshot: &SyncRecord, ack: Ack) -> Result<()> {
        let now = unix_millis_now();
        self.store
            .write(|tx| {
                let notes = SqliteNoteRepository::new(tx);
                let journal = SqliteJournalRepository::new(tx);
                let current = journal.get_by_note(&snapshot.note_id)?;
                let unchanged = current
                    .as_ref()
                    .is_some_and(|current| snapshot.same_intent(current));

                match ack {
                    Ack::Created(server) => {
                        let note = notes.get(&snapshot.note_id)?;
                        match (current, note) {
                            (Some(current), Some(local)) if unchanged => {
                                journal.delete(&current.id)?;
                                notes.update(&merge_server_copy(&local, server))?;
                            }
                            (Some(current), None) if unchanged => {
                                journal.delete(&current.id)?;
                            }
                            (Some(current), note) => {
                                // Edited while in flight: the server now knows the
                                // note, so the newer intent replays as an UPDATE.
                                if current.operation == SyncOperation::Create {
                                    journal.rewrite(
                                        &current.id,
                                        &current.user_id,
                                        SyncOperation::Update,
                                        &current.payload,
                                        current.timestamp,
                                    )?;
                                }
                                if let Some(local) = note {
                                    if local.state == NoteState::LocalUnsynced {
                                        notes.set_state(&local.id, NoteState::RemoteEdited)?;
                                    }
                                }
                            }
                            (None, Some(local)) => {
                                notes.update(&merge_server_copy(&local, server))?;
                            }
                            (None, None) => {
                                // Deleted locally while the CREATE was in flight.
                                tracing::debug!(
                                    "Note {} deleted during create; journaling server delete",
                                    snapshot.note_id
                                );
                                journal.insert(&SyncRecord::new(
                                    user_id,
                                    snapshot.note_id,
                                    SyncOperation::Delete,
                                    snapshot.payload.clone(),
                                    now,
                                ))?;
                            }
                        }
                    }
                    Ack::Updated => {
                        if let (Some(current), true) = (current, unchanged) {
                            journal.delete(&current.id)?;
                            if notes
                                .get(&snapshot.note_id)?
                                .is_some_and(|note| !note.is_deleted())
                            {
                                notes.set_state(&snapshot.note_id, NoteState::RemoteSynced)?;
                            }
                        }
                    }
                    Ack::Deleted => match current {
                        Some(current) if unchanged => {
                            journal.delete(&current.id)?;
                            notes.hard_delete(&snapshot.note_id)?;
                        }
                        Some(_) => {}
                        None => {
                            if notes
                                .get(&snapshot.note_id)?
                                .is_some_and(|note| note.is_deleted())
                            {
                                notes.hard_delete(&snapshot.note_id)?;
                            }
                        }
                    },
                }
                Ok(())
            })
            .await
    }

    /// Record a failed replay; returns whether the record was dead-lettered.
    async fn apply_failure(&self, snapshot: &SyncRecord, failure: &Failure) -> Result<bool> {
        let now = unix_millis_now();
        self.store
            .write(|tx| {
                let journal = SqliteJournalRepository::new(tx);
                let Some(current) = journal.get_by_note(&snapshot.note_id)? else {
                    return Ok(false);
                };
                if !snapshot.same_intent(&current) {
                    // Rewritten while in flight; the new intent starts fresh.
                    return Ok(false);
                }

                let attempts = current.attempts.saturating_add(1);
                let dead = failure.class == RetryClass::Permanent || attempts >= MAX_ATTEMPTS;
                if dead {
                    tracing::warn!(
                        "Dead-lettering {} for note {} after {attempts} attempt(s): {}",
                        current.operation.as_str(),
                        current.note_id,
                        failure.message
                    );
                    journal.mark_dead(&current.id, attempts, &failure.message, failure.code)?;
                } else {
                    journal.record_retry(
                        &current.id,
                        attempts,
                        now + backoff_millis(attempts),
                        &failure.message,
                        failure.code,
                    )?;
                }
                Ok(dead)
            })
            .await
    }

    // ------------------------------------------------------------------
    // Bootstrap, reset and inspection
    // ------------------------------------------------------------------

    /// Copy server notes this device does not hold into the local store.
    ///
    /// Local notes and notes with journal records are never overwritten.
    /// Returns the number of notes inserted.
    pub async fn pull_remote(&self) -> Result<usize> {
        let session = self.session.current().ok_or(Error::NoSession)?;
        let mut page = 0;
        let mut seen: u64 = 0;
        let mut inserted = 0;

        loop {
            let batch = self
                .remote
                .list(&session, Some(page), Some(PULL_PAGE_SIZE))
                .await?;
            let received = batch.notes.len();
            let now = unix_millis_now();

            inserted += self
                .store
                .write(|tx| insert_missing(tx, batch.notes, now))
                .await?;

            seen += received as u64;
            if received < PULL_PAGE_SIZE as usize || seen >= batch.total {
                break;
            }
            page += 1;
        }

        tracing::info!("Pulled {inserted} note(s) from the server");
        Ok(inserted)
    }

    /// Forget every local note, journal record and last-sync time.
    pub async fn clear_account_data(&self) -> Result<()> {
        let _pass = self.pass_lock.lock().await;
        self.store.clear_account_data().await
    }

    /// Move the current account's dead-lettered records back to pending.
    pub async fn requeue_dead(&self) -> Result<usize> {
        let user_id = self.require_user()?;
        let count = self
            .store
            .write(|tx| SqliteJournalRepository::new(tx).requeue_dead(&user_id))
            .await?;
        tracing::info!("Requeued {count} dead-lettered record(s)");
        Ok(count)
    }

    /// The current account's journal, pending and dead, in replay order.
    pub async fn pending_records(&self) -> Result<Vec<SyncRecord>> {
        let user_id = self.require_user()?;
        self.store
            .read(|conn| SqliteJournalRepository::new(conn).list_for_user(&user_id))
            .await
    }

    /// Pending and dead-lettered record counts for the current account.
    pub async fn journal_summary(&self) -> Result<JournalSummary> {
        let user_id = self.require_user()?;
        self.store
            .read(|conn| SqliteJournalRepository::new(conn).summary(&user_id))
            .await
    }

    /// Last completed pass for the current account (Unix ms).
    pub async fn last_sync_at(&self) -> Result<Option<i64>> {
        let Some(session) = self.session.current() else {
            return Ok(None);
        };
        self.store
            .read(|conn| SqliteSettingsRepository::new(conn).last_sync_at(&session.user_id))
            .await
    }
}

/// Local note with the server's fields, marked synced.
fn merge_server_copy(local: &Note, server: NotePayload) -> Note {
    if server.id != local.id {
        tracing::warn!(
            "Server returned note {} for local note {}; keeping local id",
            server.id,
            local.id
        );
    }
    Note {
        id: local.id,
        ..server.into_note(NoteState::RemoteSynced, local.created_at)
    }
}

fn insert_missing(conn: &Connection, notes: Vec<NotePayload>, now: i64) -> Result<usize> {
    let note_repo = SqliteNoteRepository::new(conn);
    let journal = SqliteJournalRepository::new(conn);
    let mut inserted = 0;

    for payload in notes {
        if note_repo.get(&payload.id)?.is_some() || journal.get_by_note(&payload.id)?.is_some() {
            continue;
        }
        note_repo.insert(&payload.into_note(NoteState::RemoteSynced, now))?;
        inserted += 1;
    }
    Ok(inserted)
}
