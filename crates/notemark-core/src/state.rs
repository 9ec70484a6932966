//! Shared cross-platform state types.

/// Sync status published by the sync trigger for front ends to render.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SyncState {
    /// No session, or no pass has run yet.
    #[default]
    Offline,
    Syncing,
    Synced,
    Error,
}
