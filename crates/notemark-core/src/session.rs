//! Active account session shared by the reconciler and the sync trigger.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Credentials for one signed-in account.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Account identifier; the login email
    pub user_id: String,
    pub username: String,
    pub access_token: String,
    pub refresh_token: String,
}

impl Session {
    #[must_use]
    pub fn has_access_token(&self) -> bool {
        !self.access_token.trim().is_empty()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("username", &self.username)
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

/// Shared, observable slot holding the current session.
///
/// Cloning the handle shares the slot. Subscribers are woken whenever a
/// session begins or ends.
#[derive(Clone)]
pub struct SessionHandle {
    tx: Arc<watch::Sender<Option<Session>>>,
}

impl SessionHandle {
    #[must_use]
    pub fn new(initial: Option<Session>) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// A session usable for remote calls, if one is active.
    #[must_use]
    pub fn current(&self) -> Option<Session> {
        self.tx
            .borrow()
            .as_ref()
            .filter(|session| session.has_access_token())
            .cloned()
    }

    pub fn is_active(&self) -> bool {
        self.current().is_some()
    }

    pub fn begin(&self, session: Session) {
        tracing::info!("Session started for {}", session.user_id);
        self.tx.send_replace(Some(session));
    }

    pub fn end(&self) {
        if self.tx.send_replace(None).is_some() {
            tracing::info!("Session ended");
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.tx.subscribe()
    }
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new(None)
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SessionHandle")
            .field("session", &*self.tx.borrow())
            .finish()
    }
}

#[cfg(test)]
pub(crate) fn test_session(user_id: &str) -> Session {
    Session {
        user_id: user_id.to_string(),
        username: "tester".to_string(),
        access_token: "access".to_string(),
        refresh_token: "refresh".to_string(),
    }
}
