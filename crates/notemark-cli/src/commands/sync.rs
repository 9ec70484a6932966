use std::path::Path;
use std::sync::Arc;

use notemark_core::state::SyncState;
use notemark_core::sync::{ReplayMode, SyncOutcome, SyncTrigger};
use notemark_core::util::unix_millis_now;

use crate::commands::common::{format_timestamp, App};
use crate::error::CliError;

pub async fn run_sync(watch: bool, db_path: &Path) -> Result<(), CliError> {
    let app = App::open(db_path).await?;
    app.require_session()?;

    if watch {
        return run_watch(&app).await;
    }

    let outcome = app.reconciler.run_sync(ReplayMode::Manual).await?;
    report_outcome(&outcome)
}

pub fn report_outcome(outcome: &SyncOutcome) -> Result<(), CliError> {
    match outcome {
        SyncOutcome::Unauthorized(_) => Err(CliError::SyncIncomplete(outcome.to_string())),
        SyncOutcome::PartialFailure(_) => {
            println!("Sync finished: {outcome}");
            println!("Run `notemark journal` to inspect failed changes.");
            Ok(())
        }
        _ => {
            println!("Sync finished: {outcome}");
            Ok(())
        }
    }
}

pub const fn state_label(state: SyncState) -> &'static str {
    match state {
        SyncState::Offline => "offline",
        SyncState::Syncing => "syncing",
        SyncState::Synced => "synced",
        SyncState::Error => "error",
    }
}

async fn run_watch(app: &App) -> Result<(), CliError> {
    let interval = app.store.load_settings().await?.sync_interval;
    let trigger = SyncTrigger::start(Arc::clone(&app.reconciler)).await?;
    let mut state = trigger.state();
    println!("Watching for changes (interval: {interval}); press Ctrl-C to stop");
    trigger.request_sync();

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal?;
                break;
            }
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *state.borrow_and_update();
                println!("{}  {}", format_timestamp(unix_millis_now()), state_label(current));
            }
        }
    }

    trigger.shutdown().await;
    Ok(())
}
