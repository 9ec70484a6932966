//! Sync trigger: decides when the reconciler runs.
//!
//! A single spawned loop owns every pass, so passes never overlap. Manual
//! requests queue behind a running pass; interval ticks that fall due during a
//! pass are skipped. Ending the session cancels the pass in flight.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use super::outcome::{PassSummary, ReplayMode, SyncOutcome};
use super::reconciler::Reconciler;
use crate::error::{Error, Result};
use crate::models::SyncInterval;
use crate::session::Session;
use crate::state::SyncState;

/// Messages to control the sync loop
#[derive(Debug)]
pub enum SyncTriggerMessage {
    /// Run a manual pass; the outcome is sent back when a reply channel is given
    SyncNow {
        reply: Option<oneshot::Sender<Result<SyncOutcome>>>,
    },
    /// Change the automatic cadence
    SetInterval(SyncInterval),
    /// Stop the loop
    Shutdown,
}

/// Handle for the sync loop
pub struct SyncTrigger {
    reconciler: Arc<Reconciler>,
    sender: mpsc::Sender<SyncTriggerMessage>,
    state: watch::Receiver<SyncState>,
    task: JoinHandle<()>,
}

impl SyncTrigger {
    /// Start the loop with the interval stored in the settings table.
    pub async fn start(reconciler: Arc<Reconciler>) -> Result<Self> {
        let settings = reconciler.store().load_settings().await?;
        Ok(Self::spawn(reconciler, settings.sync_interval))
    }

    /// Start the loop with an explicit interval.
    pub fn spawn(reconciler: Arc<Reconciler>, interval: SyncInterval) -> Self {
        let (sender, receiver) = mpsc::channel(32);
        let initial = if reconciler.session().is_active() {
            SyncState::Synced
        } else {
            SyncState::Offline
        };
        let (state_tx, state) = watch::channel(initial);

        let task = tokio::spawn(sync_loop(
            Arc::clone(&reconciler),
            receiver,
            state_tx,
            interval,
        ));

        Self {
            reconciler,
            sender,
            state,
            task,
        }
    }

    /// Run a manual pass and wait for its outcome.
    pub async fn sync_now(&self) -> Result<SyncOutcome> {
        let (reply, outcome) = oneshot::channel();
        self.send(SyncTriggerMessage::SyncNow { reply: Some(reply) })
            .await?;
        outcome.await.map_err(|_| stopped())?
    }

    /// Queue a manual pass without waiting.
    pub fn request_sync(&self) {
        let _ = self
            .sender
            .try_send(SyncTriggerMessage::SyncNow { reply: None });
    }

    /// Persist a new cadence and apply it to the running loop.
    pub async fn set_interval(&self, interval: SyncInterval) -> Result<()> {
        let store = self.reconciler.store();
        let mut settings = store.load_settings().await?;
        settings.sync_interval = interval;
        store.save_settings(&settings).await?;
        self.send(SyncTriggerMessage::SetInterval(interval)).await
    }

    /// Current sync state; receivers are woken on every change.
    pub fn state(&self) -> watch::Receiver<SyncState> {
        self.state.clone()
    }

    /// Stop the loop and wait for it to exit.
    pub async fn shutdown(self) {
        let _ = self.sender.send(SyncTriggerMessage::Shutdown).await;
        if let Err(error) = self.task.await {
            tracing::warn!("Sync loop ended abnormally: {error}");
        }
    }

    async fn send(&self, message: SyncTriggerMessage) -> Result<()> {
        self.sender.send(message).await.map_err(|_| stopped())
    }
}

fn stopped() -> Error {
    Error::Database("sync loop is not running".to_string())
}

fn make_ticker(interval: SyncInterval) -> Option<Interval> {
    let period = interval.period()?;
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    Some(ticker)
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

fn has_session(session: &Option<Session>) -> bool {
    session
        .as_ref()
        .is_some_and(Session::has_access_token)
}

/// Resolves once no usable session remains.
async fn session_ended(session: &mut watch::Receiver<Option<Session>>) {
    loop {
        if !has_session(&session.borrow_and_update()) {
            return;
        }
        if session.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

async fn sync_loop(
    reconciler: Arc<Reconciler>,
    mut receiver: mpsc::Receiver<SyncTriggerMessage>,
    state: watch::Sender<SyncState>,
    interval: SyncInterval,
) {
    let mut ticker = make_ticker(interval);
    let mut session = reconciler.session().subscribe();
    tracing::debug!("Sync loop started ({interval})");

    loop {
        tokio::select! {
            message = receiver.recv() => match message {
                None | Some(SyncTriggerMessage::Shutdown) => break,
                Some(SyncTriggerMessage::SetInterval(interval)) => {
                    tracing::info!("Sync interval set to {interval}");
                    ticker = make_ticker(interval);
                }
                Some(SyncTriggerMessage::SyncNow { reply }) => {
                    let result = run_pass(&reconciler, &state, ReplayMode::Manual).await;
                    if let Some(reply) = reply {
                        let _ = reply.send(result);
                    } else if let Err(error) = result {
                        tracing::warn!("Requested sync failed: {error}");
                    }
                }
            },
            () = next_tick(&mut ticker) => {
                if let Err(error) = run_pass(&reconciler, &state, ReplayMode::Scheduled).await {
                    tracing::warn!("Scheduled sync failed: {error}");
                }
            }
            changed = session.changed() => {
                if changed.is_err() {
                    break;
                }
                let active = has_session(&session.borrow_and_update());
                state.send_replace(if active { SyncState::Synced } else { SyncState::Offline });
            }
        }
    }

    tracing::debug!("Sync loop stopped");
}

async fn run_pass(
    reconciler: &Reconciler,
    state: &watch::Sender<SyncState>,
    mode: ReplayMode,
) -> Result<SyncOutcome> {
    if !reconciler.session().is_active() {
        state.send_replace(SyncState::Offline);
        return Ok(SyncOutcome::Idle);
    }

    state.send_replace(SyncState::Syncing);
    let mut session = reconciler.session().subscribe();
    let result = tokio::select! {
        result = reconciler.run_sync(mode) => result,
        () = session_ended(&mut session) => {
            tracing::info!("Session ended; cancelled sync pass");
            Ok(SyncOutcome::Interrupted(PassSummary::default()))
        }
    };

    state.send_replace(match &result {
        Ok(SyncOutcome::Success(_)) => SyncState::Synced,
        Ok(SyncOutcome::Idle | SyncOutcome::Interrupted(_)) => SyncState::Offline,
        Ok(SyncOutcome::PartialFailure(_) | SyncOutcome::Unauthorized(_)) | Err(_) => {
            SyncState::Error
        }
    });
    result
}
