//! Session registry.
//!
//! Arriving connections are grouped by [`SessionKey`]. The first arrival for
//! a key creates a pending session and schedules it to start after the grace
//! period; later arrivals join it while it is still pending and are refused
//! once it has started. A session is removed from the table when its drive
//! task ends, however it ends.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rewind_core::ReplaySource;
use rewind_core::constants::{
    CLOSE_DRAIN_POLL_MS, FAST_PATH_BATCH_SIZE, REPLAY_BACKPRESSURE_POLL_MS, SESSION_START_DELAY_MS,
};
use tracing::{debug, warn};

use crate::connection::Connection;
use crate::errors::Result;
use crate::metrics::{
    REPLAY_LATE_JOINS_REJECTED_TOTAL, REPLAY_SESSIONS_ACTIVE, REPLAY_SESSIONS_FAILED_TOTAL,
};
use crate::session::{ReplaySession, SessionKey, SessionState};

/// Session timing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// Grace period between the first connection and the start of replay.
    pub start_delay: Duration,
    /// Records per write on the single-connection path.
    pub batch_size: usize,
    /// Poll interval while a client is backpressured.
    pub backpressure_poll: Duration,
    /// Poll interval while waiting for buffers to drain before closing.
    pub close_drain_poll: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            start_delay: Duration::from_millis(SESSION_START_DELAY_MS),
            batch_size: FAST_PATH_BATCH_SIZE,
            backpressure_poll: Duration::from_millis(REPLAY_BACKPRESSURE_POLL_MS),
            close_drain_poll: Duration::from_millis(CLOSE_DRAIN_POLL_MS),
        }
    }
}

struct Inner {
    sessions: DashMap<SessionKey, Arc<ReplaySession>>,
    source: Arc<dyn ReplaySource>,
    config: SessionConfig,
}

/// Owns every live session. Cheap to clone.
#[derive(Clone)]
pub struct SessionCoordinator {
    inner: Arc<Inner>,
}

impl SessionCoordinator {
    /// Coordinator reading from `source`.
    pub fn new(source: Arc<dyn ReplaySource>, config: SessionConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                sessions: DashMap::new(),
                source,
                config,
            }),
        }
    }

    /// Session timing in use.
    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Sessions currently registered.
    pub fn active_sessions(&self) -> usize {
        self.inner.sessions.len()
    }

    /// Phase of the session registered under `key`, if any.
    pub fn session_state(&self, key: &SessionKey) -> Option<SessionState> {
        self.inner.sessions.get(key).map(|session| session.state())
    }

    /// Register `connection` under `key`.
    ///
    /// Must be called from within a Tokio runtime: creating a session
    /// spawns its drive task. Fails with [`ReplayError::LateJoin`] when the
    /// session for `key` has already started; the caller closes the
    /// connection.
    pub fn join(&self, key: SessionKey, connection: Arc<Connection>) -> Result<Arc<ReplaySession>> {
        match self.inner.sessions.entry(key) {
            Entry::Occupied(entry) => {
                let session = Arc::clone(entry.get());
                drop(entry);
                if let Err(err) = session.try_join(Arc::clone(&connection)) {
                    metrics::counter!(REPLAY_LATE_JOINS_REJECTED_TOTAL).increment(1);
                    warn!(session = %session.key(), connection = %connection.id(), "late join rejected");
                    return Err(err);
                }
                debug!(session = %session.key(), connection = %connection.id(), "joined pending session");
                Ok(session)
            }
            Entry::Vacant(entry) => {
                let session = Arc::new(ReplaySession::new(entry.key().clone()));
                session.try_join(Arc::clone(&connection))?;
                let _ = entry.insert(Arc::clone(&session));
                metrics::gauge!(REPLAY_SESSIONS_ACTIVE).increment(1.0);
                debug!(session = %session.key(), connection = %connection.id(), "created session");
                self.spawn_driver(Arc::clone(&session));
                Ok(session)
            }
        }
    }

    fn spawn_driver(&self, session: Arc<ReplaySession>) {
        let inner = Arc::clone(&self.inner);
        let _ = tokio::spawn(async move {
            let _deregister = Deregister {
                inner: Arc::clone(&inner),
                session: Arc::clone(&session),
            };
            tokio::time::sleep(inner.config.start_delay).await;
            if let Err(err) = session.run(inner.source.as_ref(), &inner.config).await {
                metrics::counter!(REPLAY_SESSIONS_FAILED_TOTAL).increment(1);
                debug!(session = %session.key(), error = %err, "session ended with error");
            }
        });
    }
}

/// Removes a session from the table when its drive task ends, including
/// on panic or cancellation.
struct Deregister {
    inner: Arc<Inner>,
    session: Arc<ReplaySession>,
}

impl Drop for Deregister {
    fn drop(&mut self) {
        let removed = self
            .inner
            .sessions
            .remove_if(self.session.key(), |_, s| Arc::ptr_eq(s, &self.session));
        if removed.is_some() {
            metrics::gauge!(REPLAY_SESSIONS_ACTIVE).decrement(1.0);
            debug!(session = %self.session.key(), "session deregistered");
        }
    }
}

impl std::fmt::Debug for SessionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCoordinator")
            .field("sessions", &self.inner.sessions.len())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}
