//! Scripted in-memory note server for engine tests.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use super::{NotesPage, RemoteError, RemoteNoteService, RemoteResult};
use crate::models::{NoteId, NotePayload};
use crate::session::Session;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create(NoteId),
    Update(NoteId),
    Delete(NoteId),
    List(Option<u32>, Option<u32>),
}

impl Call {
    fn note_id(&self) -> Option<NoteId> {
        match self {
            Self::Create(id) | Self::Update(id) | Self::Delete(id) => Some(*id),
            Self::List(..) => None,
        }
    }
}

/// Pauses one call until the test releases it.
#[derive(Clone, Default)]
pub struct Hold {
    pub reached: Arc<Notify>,
    pub release: Arc<Notify>,
}

#[derive(Default)]
struct State {
    notes: BTreeMap<NoteId, NotePayload>,
    calls: Vec<Call>,
    failures: HashMap<NoteId, VecDeque<RemoteError>>,
    offline: Option<RemoteError>,
    holds: HashMap<NoteId, Hold>,
}

#[derive(Default)]
pub struct ScriptedRemote {
    state: Mutex<State>,
}

impl ScriptedRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Fail the next call touching `id` with `error`.
    pub fn fail_next(&self, id: NoteId, error: RemoteError) {
        let mut state = self.state.lock().unwrap();
        state.failures.entry(id).or_default().push_back(error);
    }

    /// Fail every call with `error` until cleared with `None`.
    pub fn set_offline(&self, error: Option<RemoteError>) {
        self.state.lock().unwrap().offline = error;
    }

    /// Pause the next call touching `id` after it has been received.
    pub fn hold_next(&self, id: NoteId) -> Hold {
        let hold = Hold::default();
        self.state.lock().unwrap().holds.insert(id, hold.clone());
        hold
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn server_note(&self, id: &NoteId) -> Option<NotePayload> {
        self.state.lock().unwrap().notes.get(id).cloned()
    }

    pub fn server_len(&self) -> usize {
        self.state.lock().unwrap().notes.len()
    }

    pub fn seed(&self, note: NotePayload) {
        self.state.lock().unwrap().notes.insert(note.id, note);
    }

    async fn enter(&self, call: Call) -> RemoteResult<()> {
        let hold = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(call.clone());
            call.note_id().and_then(|id| state.holds.remove(&id))
        };
        if let Some(hold) = hold {
            hold.reached.notify_one();
            hold.release.notified().await;
        }

        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.offline.clone() {
            return Err(error);
        }
        if let Some(error) = call
            .note_id()
            .and_then(|id| state.failures.get_mut(&id))
            .and_then(VecDeque::pop_front)
        {
            return Err(error);
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteNoteService for ScriptedRemote {
    async fn create(&self, _session: &Session, note: &NotePayload) -> RemoteResult<NotePayload> {
        self.enter(Call::Create(note.id)).await?;
        let mut state = self.state.lock().unwrap();
        if state.notes.contains_key(&note.id) {
            return Err(RemoteError::http(409, "Note already exists"));
        }
        state.notes.insert(note.id, note.clone());
        Ok(note.clone())
    }

    async fn update(&self, _session: &Session, note: &NotePayload) -> RemoteResult<NotePayload> {
        self.enter(Call::Update(note.id)).await?;
        let mut state = self.state.lock().unwrap();
        match state.notes.get_mut(&note.id) {
            Some(stored) => {
                *stored = note.clone();
                Ok(note.clone())
            }
            None => Err(RemoteError::http(404, "Note not found")),
        }
    }

    async fn delete(&self, _session: &Session, id: &NoteId) -> RemoteResult<()> {
        self.enter(Call::Delete(*id)).await?;
        let mut state = self.state.lock().unwrap();
        state
            .notes
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| RemoteError::http(404, "Note not found"))
    }

    async fn list(
        &self,
        _session: &Session,
        page: Option<u32>,
        size: Option<u32>,
    ) -> RemoteResult<NotesPage> {
        self.enter(Call::List(page, size)).await?;
        let state = self.state.lock().unwrap();
        let page = page.unwrap_or(0) as usize;
        let size = size.unwrap_or(20) as usize;
        Ok(NotesPage {
            notes: state
                .notes
                .values()
                .skip(page * size)
                .take(size)
                .cloned()
                .collect(),
            total: state.notes.len() as u64,
        })
    }
}
