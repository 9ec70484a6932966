//! Offline-first sync engine.
//!
//! Local edits are journaled by the [`Reconciler`] and replayed against the
//! remote note service; the [`SyncTrigger`] decides when passes run.

mod outcome;
mod reconciler;
mod retry;
mod trigger;

#[cfg(test)]
mod tests;

pub use outcome::{PassSummary, ReplayMode, SyncOutcome};
pub use reconciler::{Reconciler, PULL_PAGE_SIZE};
pub use retry::{backoff_millis, classify, classify_http_status, RetryClass, MAX_ATTEMPTS};
pub use trigger::{SyncTrigger, SyncTriggerMessage};
