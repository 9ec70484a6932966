use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;

use super::*;
use crate::db::{JournalSummary, NoteRepository, SqliteNoteRepository};
use crate::models::{Note, NoteId, NoteState, RecordStatus, SyncInterval, SyncOperation};
use crate::remote::fake::{Call, ScriptedRemote};
use crate::remote::RemoteError;
use crate::services::DatabaseService;
use crate::session::{test_session, SessionHandle};
use crate::state::SyncState;
use crate::Error;

const USER: &str = "sam@example.com";

struct Harness {
    reconciler: Arc<Reconciler>,
    remote: Arc<ScriptedRemote>,
    session: SessionHandle,
}

impl Harness {
    fn new() -> Self {
        let store = DatabaseService::open_in_memory().unwrap();
        let remote = ScriptedRemote::new();
        let session = SessionHandle::new(Some(test_session(USER)));
        let reconciler = Arc::new(Reconciler::new(store, remote.clone(), session.clone()));
        Self {
            reconciler,
            remote,
            session,
        }
    }

    async fn create(&self, title: &str) -> Note {
        self.reconciler
            .record_create(Note::new(title, "body"))
            .await
            .unwrap()
    }

    async fn edit(&self, note: &Note, title: &str) -> Note {
        self.reconciler
            .record_update(&note.clone().edit(title, "edited"))
            .await
            .unwrap()
    }

    /// Create a note and sync it so the server knows it.
    async fn synced(&self, title: &str) -> Note {
        let note = self.create(title).await;
        let outcome = self.sync().await;
        assert!(matches!(outcome, SyncOutcome::Success(_)), "{outcome:?}");
        self.note(&note.id).await.unwrap()
    }

    async fn sync(&self) -> SyncOutcome {
        self.reconciler.run_sync(ReplayMode::Manual).await.unwrap()
    }

    async fn note(&self, id: &NoteId) -> Option<Note> {
        self.reconciler.store().get_note(id).await.unwrap()
    }

    async fn journal(&self) -> Vec<crate::SyncRecord> {
        self.reconciler.pending_records().await.unwrap()
    }

    async fn journal_ops(&self) -> Vec<(NoteId, SyncOperation)> {
        self.journal()
            .await
            .into_iter()
            .map(|record| (record.note_id, record.operation))
            .collect()
    }
}

fn summary(pushed: usize, failed: usize, dead_lettered: usize) -> PassSummary {
    PassSummary {
        pushed,
        failed,
        dead_lettered,
        deferred: 0,
    }
}

// ----------------------------------------------------------------------
// Intake
// ----------------------------------------------------------------------

#[tokio::test]
async fn intake_keeps_at_most_one_record_per_note() {
    let h = Harness::new();
    let remote = h.synced("remote").await;
    let local = h.create("local").await;
    let other = h.create("other").await;

    let remote = h.edit(&remote, "remote 2").await;
    h.edit(&remote, "remote 3").await;
    let local = h.edit(&local, "local 2").await;
    h.edit(&local, "local 3").await;
    h.reconciler.record_delete(&remote.id).await.unwrap();
    h.reconciler.record_delete(&remote.id).await.unwrap();
    h.edit(&other, "other 2").await;
    h.reconciler.record_delete(&other.id).await.unwrap();

    assert_eq!(
        h.journal_ops().await,
        vec![
            (remote.id, SyncOperation::Delete),
            (local.id, SyncOperation::Create),
        ]
    );
    assert_eq!(h.journal().await[1].note_payload().unwrap().title, "local 3");
}

#[tokio::test]
async fn create_then_delete_before_sync_leaves_nothing() {
    let h = Harness::new();
    let note = h.create("short lived").await;

    h.reconciler.record_delete(&note.id).await.unwrap();

    assert!(h.note(&note.id).await.is_none());
    assert!(h.journal().await.is_empty());
    assert_eq!(h.sync().await, SyncOutcome::Success(PassSummary::default()));
    assert!(h.remote.calls().is_empty());
    assert!(h.reconciler.last_sync_at().await.unwrap().is_some());
}

#[tokio::test]
async fn update_collapses_into_pending_create() {
    let h = Harness::new();
    let note = h.create("draft").await;
    h.edit(&note, "final").await;

    let journal = h.journal().await;
    assert_eq!(journal.len(), 1);
    assert_eq!(journal[0].operation, SyncOperation::Create);
    assert_eq!(journal[0].note_payload().unwrap().title, "final");
    assert_eq!(
        h.note(&note.id).await.unwrap().state,
        NoteState::LocalUnsynced
    );
}

#[tokio::test]
async fn update_of_remote_note_journals_update() {
    let h = Harness::new();
    let note = h.synced("known").await;
    let edited = h.edit(&note, "changed").await;

    assert_eq!(edited.state, NoteState::RemoteEdited);
    assert_eq!(h.journal_ops().await, vec![(note.id, SyncOperation::Update)]);
}

#[tokio::test]
async fn update_of_missing_or_deleted_note_is_rejected() {
    let h = Harness::new();
    let err = h
        .reconciler
        .record_update(&Note::new("ghost", ""))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    let note = h.synced("gone soon").await;
    h.reconciler.record_delete(&note.id).await.unwrap();
    let err = h
        .reconciler
        .record_update(&note.clone().edit("again", ""))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert_eq!(h.journal_ops().await, vec![(note.id, SyncOperation::Delete)]);
}

#[tokio::test]
async fn intake_requires_session() {
    let h = Harness::new();
    h.session.end();

    let err = h
        .reconciler
        .record_create(Note::new("offline", ""))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NoSession));
    assert_eq!(h.reconciler.store().count_notes().await.unwrap(), 0);
}

#[tokio::test]
async fn blank_title_gets_default() {
    let h = Harness::new();
    let mut note = Note::new("x", "");
    note.title = "   ".to_string();
    let stored = h.reconciler.record_create(note).await.unwrap();
    assert_eq!(stored.title, crate::models::DEFAULT_NOTE_TITLE);
}

// ----------------------------------------------------------------------
// Replay
// ----------------------------------------------------------------------

#[tokio::test]
async fn create_sync_marks_note_remote_synced() {
    let h = Harness::new();
    let note = h.create("hello").await;

    assert_eq!(h.sync().await, SyncOutcome::Success(summary(1, 0, 0)));

    let stored = h.note(&note.id).await.unwrap();
    assert_eq!(stored.state, NoteState::RemoteSynced);
    assert!(h.journal().await.is_empty());
    assert_eq!(h.remote.server_note(&note.id).unwrap().title, "hello");
    assert!(h.reconciler.last_sync_at().await.unwrap().is_some());
}

#[tokio::test]
async fn run_sync_is_idempotent() {
    let h = Harness::new();
    h.create("a").await;
    h.create("b").await;

    h.sync().await;
    let calls = h.remote.calls();
    assert_eq!(h.sync().await, SyncOutcome::Success(PassSummary::default()));

    assert_eq!(h.remote.calls(), calls);
    assert_eq!(h.remote.server_len(), 2);
}

#[tokio::test]
async fn replay_follows_insertion_order() {
    let h = Harness::new();
    let first = h.create("first").await;
    let second = h.create("second").await;
    // Rewriting the first record keeps its place in line.
    h.edit(&first, "first edited").await;

    h.sync().await;
    assert_eq!(
        h.remote.calls(),
        vec![Call::Create(first.id), Call::Create(second.id)]
    );
}

#[tokio::test]
async fn partial_failure_keeps_only_failed_record() {
    let h = Harness::new();
    let one = h.create("one").await;
    let two = h.create("two").await;
    let three = h.create("three").await;
    h.remote.fail_next(two.id, RemoteError::http(500, "boom"));

    let outcome = h.sync().await;

    assert_eq!(outcome, SyncOutcome::PartialFailure(summary(2, 1, 0)));
    assert_eq!(h.journal_ops().await, vec![(two.id, SyncOperation::Create)]);
    assert_eq!(h.note(&one.id).await.unwrap().state, NoteState::RemoteSynced);
    assert_eq!(h.note(&two.id).await.unwrap().state, NoteState::LocalUnsynced);
    assert_eq!(
        h.note(&three.id).await.unwrap().state,
        NoteState::RemoteSynced
    );
    assert!(h.reconciler.last_sync_at().await.unwrap().is_some());

    let failed = &h.journal().await[0];
    assert_eq!(failed.attempts, 1);
    assert_eq!(failed.last_error_code, Some(500));
    assert!(failed.next_retry_at.is_some());
}

#[tokio::test]
async fn remote_delete_is_soft_until_confirmed() {
    let h = Harness::new();
    let note = h.synced("to delete").await;

    h.reconciler.record_delete(&note.id).await.unwrap();

    let hidden = h.note(&note.id).await.unwrap();
    assert_eq!(hidden.state, NoteState::RemoteDeletePending);
    assert!(h
        .reconciler
        .store()
        .list_notes(10, 0)
        .await
        .unwrap()
        .is_empty());

    h.remote
        .fail_next(note.id, RemoteError::transport("offline"));
    assert!(matches!(h.sync().await, SyncOutcome::PartialFailure(_)));
    assert!(h.note(&note.id).await.is_some());

    assert_eq!(h.sync().await, SyncOutcome::Success(summary(1, 0, 0)));
    assert!(h.note(&note.id).await.is_none());
    assert!(h.journal().await.is_empty());
    assert!(h.remote.server_note(&note.id).is_none());
}

#[tokio::test]
async fn create_already_on_server_is_sent_as_update() {
    let h = Harness::new();
    let note = h.create("landed").await;
    let mut stale = note.payload();
    stale.title = "stale".to_string();
    h.remote.seed(stale);

    assert_eq!(h.sync().await, SyncOutcome::Success(summary(1, 0, 0)));
    assert_eq!(
        h.remote.calls(),
        vec![Call::Create(note.id), Call::Update(note.id)]
    );
    assert_eq!(h.remote.server_note(&note.id).unwrap().title, "landed");
    assert_eq!(h.remote.server_len(), 1);
    assert_eq!(h.note(&note.id).await.unwrap().state, NoteState::RemoteSynced);
    assert!(h.journal().await.is_empty());
}

#[tokio::test]
async fn delete_of_note_missing_on_server_counts_as_success() {
    let h = Harness::new();
    let note = h.synced("already gone").await;
    h.reconciler.record_delete(&note.id).await.unwrap();
    h.remote
        .fail_next(note.id, RemoteError::http(404, "Note not found"));

    assert_eq!(h.sync().await, SyncOutcome::Success(summary(1, 0, 0)));
    assert!(h.note(&note.id).await.is_none());
    assert!(h.journal().await.is_empty());
}

#[tokio::test]
async fn edit_during_create_replay_ends_with_one_update() {
    let h = Harness::new();
    let note = h.create("v1").await;
    let hold = h.remote.hold_next(note.id);

    let reconciler = Arc::clone(&h.reconciler);
    let pass = tokio::spawn(async move { reconciler.run_sync(ReplayMode::Manual).await });

    hold.reached.notified().await;
    h.edit(&note, "v2").await;
    hold.release.notify_one();
    assert_eq!(
        pass.await.unwrap().unwrap(),
        SyncOutcome::PartialFailure(summary(1, 0, 0))
    );

    assert_eq!(h.journal_ops().await, vec![(note.id, SyncOperation::Update)]);
    assert_eq!(h.note(&note.id).await.unwrap().state, NoteState::RemoteEdited);
    assert_eq!(h.remote.server_note(&note.id).unwrap().title, "v1");

    assert_eq!(h.sync().await, SyncOutcome::Success(summary(1, 0, 0)));
    assert_eq!(h.remote.server_note(&note.id).unwrap().title, "v2");
    assert_eq!(h.note(&note.id).await.unwrap().state, NoteState::RemoteSynced);
    assert!(h.journal().await.is_empty());
}

#[tokio::test]
async fn delete_during_create_replay_journals_server_delete() {
    let h = Harness::new();
    let note = h.create("fleeting").await;
    let hold = h.remote.hold_next(note.id);

    let reconciler = Arc::clone(&h.reconciler);
    let pass = tokio::spawn(async move { reconciler.run_sync(ReplayMode::Manual).await });

    hold.reached.notified().await;
    h.reconciler.record_delete(&note.id).await.unwrap();
    hold.release.notify_one();
    pass.await.unwrap().unwrap();

    assert!(h.note(&note.id).await.is_none());
    assert!(h.remote.server_note(&note.id).is_some());
    assert_eq!(h.journal_ops().await, vec![(note.id, SyncOperation::Delete)]);

    h.sync().await;
    assert!(h.remote.server_note(&note.id).is_none());
    assert!(h.journal().await.is_empty());
}

#[tokio::test]
async fn edit_during_update_replay_keeps_newer_update() {
    let h = Harness::new();
    let note = h.synced("v1").await;
    let note = h.edit(&note, "v2").await;
    let hold = h.remote.hold_next(note.id);

    let reconciler = Arc::clone(&h.reconciler);
    let pass = tokio::spawn(async move { reconciler.run_sync(ReplayMode::Manual).await });

    hold.reached.notified().await;
    h.edit(&note, "v3").await;
    hold.release.notify_one();
    pass.await.unwrap().unwrap();

    let journal = h.journal().await;
    assert_eq!(journal.len(), 1);
    assert_eq!(journal[0].note_payload().unwrap().title, "v3");
    assert_eq!(h.note(&note.id).await.unwrap().state, NoteState::RemoteEdited);
}

// ----------------------------------------------------------------------
// Retry and dead-lettering
// ----------------------------------------------------------------------

#[tokio::test]
async fn permanent_failure_is_dead_lettered_and_requeued() {
    let h = Harness::new();
    let note = h.create("rejected").await;
    h.remote
        .fail_next(note.id, RemoteError::http(422, "Invalid note"));

    assert_eq!(
        h.sync().await,
        SyncOutcome::PartialFailure(summary(0, 1, 1))
    );
    let record = &h.journal().await[0];
    assert_eq!(record.status, RecordStatus::Dead);
    assert_eq!(record.last_error.as_deref(), Some("Invalid note"));
    assert_eq!(
        h.reconciler.journal_summary().await.unwrap(),
        JournalSummary {
            pending: 0,
            dead: 1
        }
    );

    // Dead records are not replayed automatically and keep the pass short of success.
    assert_eq!(
        h.sync().await,
        SyncOutcome::PartialFailure(PassSummary::default())
    );
    assert_eq!(h.remote.calls().len(), 1);

    assert_eq!(h.reconciler.requeue_dead().await.unwrap(), 1);
    assert_eq!(h.sync().await, SyncOutcome::Success(summary(1, 0, 0)));
    assert!(h.journal().await.is_empty());
}

#[tokio::test]
async fn local_edit_revives_dead_record() {
    let h = Harness::new();
    let note = h.create("bad").await;
    h.remote.fail_next(note.id, RemoteError::http(400, "nope"));
    h.sync().await;

    h.edit(&note, "fixed").await;

    let record = &h.journal().await[0];
    assert_eq!(record.status, RecordStatus::Pending);
    assert_eq!(record.attempts, 0);
    assert_eq!(record.last_error, None);
    assert_eq!(h.sync().await, SyncOutcome::Success(summary(1, 0, 0)));
}

#[tokio::test]
async fn scheduled_pass_defers_records_waiting_for_retry() {
    let h = Harness::new();
    let note = h.create("flaky").await;
    h.remote
        .fail_next(note.id, RemoteError::http(503, "unavailable"));
    h.sync().await;

    let outcome = h
        .reconciler
        .run_sync(ReplayMode::Scheduled)
        .await
        .unwrap();
    assert_eq!(
        outcome,
        SyncOutcome::PartialFailure(PassSummary {
            deferred: 1,
            ..PassSummary::default()
        })
    );
    assert_eq!(h.remote.calls().len(), 1);

    // A manual pass ignores the retry delay.
    assert_eq!(h.sync().await, SyncOutcome::Success(summary(1, 0, 0)));
}

#[tokio::test]
async fn retryable_failures_dead_letter_after_max_attempts() {
    let h = Harness::new();
    let note = h.create("never lands").await;
    h.remote
        .set_offline(Some(RemoteError::transport("connection refused")));

    for _ in 1..MAX_ATTEMPTS {
        assert_eq!(
            h.sync().await,
            SyncOutcome::PartialFailure(summary(0, 1, 0))
        );
    }
    assert_eq!(
        h.sync().await,
        SyncOutcome::PartialFailure(summary(0, 1, 1))
    );

    let record = &h.journal().await[0];
    assert_eq!(record.note_id, note.id);
    assert_eq!(record.status, RecordStatus::Dead);
    assert_eq!(record.attempts, MAX_ATTEMPTS);
    assert_eq!(record.last_error_code, None);
}

#[tokio::test]
async fn unauthorized_stops_pass_without_consuming_attempts() {
    let h = Harness::new();
    let first = h.create("first").await;
    h.create("second").await;
    h.remote
        .fail_next(first.id, RemoteError::http(401, "Invalid Email id or password"));

    assert_eq!(
        h.sync().await,
        SyncOutcome::Unauthorized(PassSummary::default())
    );

    assert_eq!(h.remote.calls(), vec![Call::Create(first.id)]);
    let journal = h.journal().await;
    assert_eq!(journal.len(), 2);
    assert!(journal
        .iter()
        .all(|record| record.attempts == 0 && record.status == RecordStatus::Pending));
    assert_eq!(h.reconciler.last_sync_at().await.unwrap(), None);
}

#[tokio::test]
async fn no_session_pass_is_idle() {
    let h = Harness::new();
    h.create("queued").await;
    h.session.end();

    assert_eq!(h.sync().await, SyncOutcome::Idle);
    assert!(h.remote.calls().is_empty());
}

#[tokio::test]
async fn session_ending_mid_pass_interrupts_remaining_records() {
    let h = Harness::new();
    let first = h.create("first").await;
    let second = h.create("second").await;
    let hold = h.remote.hold_next(first.id);

    let reconciler = Arc::clone(&h.reconciler);
    let pass = tokio::spawn(async move { reconciler.run_sync(ReplayMode::Manual).await });

    hold.reached.notified().await;
    h.session.end();
    hold.release.notify_one();
    let outcome = pass.await.unwrap().unwrap();

    assert_eq!(outcome, SyncOutcome::Interrupted(summary(1, 0, 0)));
    assert_eq!(h.remote.calls(), vec![Call::Create(first.id)]);
    assert!(h.remote.server_note(&second.id).is_none());
}

#[tokio::test]
async fn store_failure_aborts_pass() {
    let h = Harness::new();
    h.create("doomed").await;
    h.reconciler
        .store()
        .write(|tx| {
            tx.execute_batch("DROP TABLE settings;")?;
            Ok(())
        })
        .await
        .unwrap();

    let result = h.reconciler.run_sync(ReplayMode::Manual).await;
    assert!(matches!(result, Err(Error::Sqlite(_))));
}

#[tokio::test]
async fn store_failure_while_applying_ack_stops_remaining_replays() {
    let h = Harness::new();
    let first = h.create("first").await;
    let second = h.create("second").await;
    let hold = h.remote.hold_next(first.id);

    let reconciler = Arc::clone(&h.reconciler);
    let pass = tokio::spawn(async move { reconciler.run_sync(ReplayMode::Manual).await });

    hold.reached.notified().await;
    h.reconciler
        .store()
        .write(|tx| {
            tx.execute_batch("ALTER TABLE sync_records RENAME TO sync_records_moved;")?;
            Ok(())
        })
        .await
        .unwrap();
    hold.release.notify_one();

    assert!(matches!(pass.await.unwrap(), Err(Error::Sqlite(_))));
    assert_eq!(h.remote.calls(), vec![Call::Create(first.id)]);
    assert!(h.remote.server_note(&second.id).is_none());
    assert_eq!(h.reconciler.last_sync_at().await.unwrap(), None);
}

// ----------------------------------------------------------------------
// Bootstrap and reset
// ----------------------------------------------------------------------

#[tokio::test]
async fn pull_remote_inserts_missing_notes_without_overwriting() {
    let h = Harness::new();
    for index in 0..25 {
        h.remote
            .seed(Note::new(format!("server {index}"), "").payload());
    }
    let edited = h.synced("local copy").await;
    let local = h.create("local only").await;
    let mut shared = Note::new("server copy", "").payload();
    shared.id = edited.id;
    h.remote.seed(shared);

    let inserted = h.reconciler.pull_remote().await.unwrap();

    assert_eq!(inserted, 25);
    assert_eq!(h.note(&edited.id).await.unwrap().title, "local copy");
    assert_eq!(h.note(&local.id).await.unwrap().state, NoteState::LocalUnsynced);
    let lists: Vec<_> = h
        .remote
        .calls()
        .into_iter()
        .filter(|call| matches!(call, Call::List(..)))
        .collect();
    assert_eq!(
        lists,
        vec![Call::List(Some(0), Some(20)), Call::List(Some(1), Some(20))]
    );

    let pulled = h
        .reconciler
        .store()
        .read(|conn| SqliteNoteRepository::new(conn).list(100, 0))
        .await
        .unwrap();
    assert!(pulled
        .iter()
        .filter(|note| note.title.starts_with("server "))
        .all(|note| note.state == NoteState::RemoteSynced));
}

#[tokio::test]
async fn clear_account_data_removes_notes_and_journal() {
    let h = Harness::new();
    h.synced("a").await;
    h.create("b").await;

    h.reconciler.clear_account_data().await.unwrap();

    assert_eq!(h.reconciler.store().count_notes().await.unwrap(), 0);
    assert!(h.journal().await.is_empty());
    assert_eq!(h.reconciler.last_sync_at().await.unwrap(), None);
}

// ----------------------------------------------------------------------
// Trigger
// ----------------------------------------------------------------------

#[tokio::test]
async fn trigger_runs_manual_pass_and_publishes_state() {
    let h = Harness::new();
    let note = h.create("via trigger").await;
    let trigger = SyncTrigger::spawn(Arc::clone(&h.reconciler), SyncInterval::ManualOnly);

    let outcome = trigger.sync_now().await.unwrap();

    assert_eq!(outcome, SyncOutcome::Success(summary(1, 0, 0)));
    assert_eq!(*trigger.state().borrow(), SyncState::Synced);
    assert_eq!(h.remote.calls(), vec![Call::Create(note.id)]);
    trigger.shutdown().await;
}

#[tokio::test]
async fn trigger_reports_error_state_on_partial_failure() {
    let h = Harness::new();
    let note = h.create("bad").await;
    h.remote.fail_next(note.id, RemoteError::http(500, "boom"));
    let trigger = SyncTrigger::spawn(Arc::clone(&h.reconciler), SyncInterval::ManualOnly);

    trigger.sync_now().await.unwrap();

    assert_eq!(*trigger.state().borrow(), SyncState::Error);
    trigger.shutdown().await;
}

#[tokio::test]
async fn trigger_is_suppressed_without_session() {
    let h = Harness::new();
    h.create("waiting").await;
    h.session.end();
    let trigger = SyncTrigger::spawn(Arc::clone(&h.reconciler), SyncInterval::ManualOnly);

    assert_eq!(trigger.sync_now().await.unwrap(), SyncOutcome::Idle);
    assert_eq!(*trigger.state().borrow(), SyncState::Offline);
    assert!(h.remote.calls().is_empty());
    trigger.shutdown().await;
}

#[tokio::test]
async fn trigger_serializes_queued_manual_requests() {
    let h = Harness::new();
    let note = h.create("once").await;
    let hold = h.remote.hold_next(note.id);
    let trigger = Arc::new(SyncTrigger::spawn(
        Arc::clone(&h.reconciler),
        SyncInterval::ManualOnly,
    ));

    let first = {
        let trigger = Arc::clone(&trigger);
        tokio::spawn(async move { trigger.sync_now().await })
    };
    hold.reached.notified().await;
    let second = {
        let trigger = Arc::clone(&trigger);
        tokio::spawn(async move { trigger.sync_now().await })
    };
    tokio::task::yield_now().await;
    hold.release.notify_one();

    assert_eq!(
        first.await.unwrap().unwrap(),
        SyncOutcome::Success(summary(1, 0, 0))
    );
    assert_eq!(
        second.await.unwrap().unwrap(),
        SyncOutcome::Success(PassSummary::default())
    );
    assert_eq!(h.remote.calls(), vec![Call::Create(note.id)]);
}

#[tokio::test]
async fn ending_session_cancels_pass_in_flight() {
    let h = Harness::new();
    let note = h.create("stranded").await;
    let hold = h.remote.hold_next(note.id);
    let trigger = Arc::new(SyncTrigger::spawn(
        Arc::clone(&h.reconciler),
        SyncInterval::ManualOnly,
    ));

    let pass = {
        let trigger = Arc::clone(&trigger);
        tokio::spawn(async move { trigger.sync_now().await })
    };
    hold.reached.notified().await;
    h.session.end();

    let outcome = pass.await.unwrap().unwrap();
    assert_eq!(outcome, SyncOutcome::Interrupted(PassSummary::default()));
    assert_eq!(*trigger.state().borrow(), SyncState::Offline);

    // The record was never acknowledged and stays queued.
    h.session.begin(test_session(USER));
    assert_eq!(h.journal_ops().await, vec![(note.id, SyncOperation::Create)]);
}

#[tokio::test(start_paused = true)]
async fn interval_ticks_run_scheduled_passes() {
    let h = Harness::new();
    let note = h.create("periodic").await;
    let trigger = SyncTrigger::spawn(Arc::clone(&h.reconciler), SyncInterval::Every15Minutes);

    tokio::time::sleep(Duration::from_secs(14 * 60)).await;
    assert!(h.remote.calls().is_empty());

    tokio::time::sleep(Duration::from_secs(2 * 60)).await;
    assert_eq!(h.remote.calls(), vec![Call::Create(note.id)]);
    assert_eq!(*trigger.state().borrow(), SyncState::Synced);
    trigger.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn manual_only_interval_never_ticks() {
    let h = Harness::new();
    h.create("manual").await;
    let trigger = SyncTrigger::spawn(Arc::clone(&h.reconciler), SyncInterval::ManualOnly);

    tokio::time::sleep(Duration::from_secs(3 * 60 * 60)).await;
    assert!(h.remote.calls().is_empty());

    trigger.set_interval(SyncInterval::Every30Minutes).await.unwrap();
    tokio::time::sleep(Duration::from_secs(31 * 60)).await;
    assert_eq!(h.remote.calls().len(), 1);
    assert_eq!(
        h.reconciler
            .store()
            .load_settings()
            .await
            .unwrap()
            .sync_interval,
        SyncInterval::Every30Minutes
    );
    trigger.shutdown().await;
}
