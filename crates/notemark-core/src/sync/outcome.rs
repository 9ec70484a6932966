//! Results of a reconciler pass.

use std::fmt;

/// Which pending records a pass replays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplayMode {
    /// Every pending record, ignoring retry delays
    #[default]
    Manual,
    /// Only pending records whose retry delay has elapsed
    Scheduled,
}

/// Per-pass counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Records the server acknowledged
    pub pushed: usize,
    /// Records that failed this pass (including newly dead-lettered ones)
    pub failed: usize,
    /// Records moved to the dead-letter state this pass
    pub dead_lettered: usize,
    /// Pending records left for later because their retry delay has not elapsed
    pub deferred: usize,
}

/// How a pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// No session; nothing was attempted
    Idle,
    /// Every replayed record succeeded
    Success(PassSummary),
    /// At least one record failed and stays in the journal
    PartialFailure(PassSummary),
    /// The server rejected the session; the pass stopped early
    Unauthorized(PassSummary),
    /// The session ended or changed mid-pass
    Interrupted(PassSummary),
}

impl SyncOutcome {
    pub const fn summary(&self) -> Option<&PassSummary> {
        match self {
            Self::Idle => None,
            Self::Success(summary)
            | Self::PartialFailure(summary)
            | Self::Unauthorized(summary)
            | Self::Interrupted(summary) => Some(summary),
        }
    }
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle (no session)"),
            Self::Success(s) => write!(f, "synced {} change(s)", s.pushed),
            Self::PartialFailure(s) => write!(
                f,
                "synced {} change(s), {} failed ({} dead-lettered)",
                s.pushed, s.failed, s.dead_lettered
            ),
            Self::Unauthorized(s) => write!(
                f,
                "session rejected by server after {} change(s); sign in again",
                s.pushed
            ),
            Self::Interrupted(s) => {
                write!(f, "interrupted after {} change(s)", s.pushed)
            }
        }
    }
}
