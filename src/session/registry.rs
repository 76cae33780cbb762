//! Session registry: id → handle bookkeeping and idle reclamation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::error::GatewayError;
use crate::session::handle::ProtocolSession;
use crate::upstream::SearchClient;

struct SessionEntry {
    handle: Arc<ProtocolSession>,
    created_at: Instant,
    last_activity: Instant,
}

/// Result of resolving an inbound session id.
pub struct Resolved {
    pub session: Arc<ProtocolSession>,
    pub is_new: bool,
}

impl std::fmt::Debug for Resolved {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolved")
            .field("session", &self.session.id())
            .field("is_new", &self.is_new)
            .finish()
    }
}

/// Owns the set of active protocol sessions.
///
/// A session id is unique among registered sessions; exactly one handle owns
/// a given id at a time. Terminated or swept ids are gone for good — an
/// unrecognized id always fails resolution rather than being reused, which
/// would collide with a session that terminated on the far end.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, SessionEntry>>,
    idle_timeout: Duration,
    search: Arc<SearchClient>,
}

impl SessionRegistry {
    pub fn new(idle_timeout: Duration, search: Arc<SearchClient>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_timeout,
            search,
        }
    }

    /// Resolve an inbound session id.
    ///
    /// - `None`: allocate a fresh id, register a new handle, return it as new.
    /// - `Some(known)`: refresh last-activity and return the existing handle.
    /// - `Some(unknown)`: [`GatewayError::SessionNotFound`] — the caller
    ///   should re-initialize.
    pub fn resolve(&self, session_id: Option<&str>) -> Result<Resolved, GatewayError> {
        let mut sessions = self.sessions.lock().expect("session registry mutex poisoned");
        match session_id {
            None => {
                let id = Uuid::new_v4().to_string();
                let handle = Arc::new(ProtocolSession::new(id.clone(), self.search.clone()));
                let now = Instant::now();
                sessions.insert(
                    id.clone(),
                    SessionEntry {
                        handle: handle.clone(),
                        created_at: now,
                        last_activity: now,
                    },
                );
                tracing::info!(session_id = %id, active = sessions.len(), "session_created");
                Ok(Resolved {
                    session: handle,
                    is_new: true,
                })
            }
            Some(id) => match sessions.get_mut(id) {
                Some(entry) => {
                    entry.last_activity = Instant::now();
                    Ok(Resolved {
                        session: entry.handle.clone(),
                        is_new: false,
                    })
                }
                None => Err(GatewayError::SessionNotFound(id.to_string())),
            },
        }
    }

    /// Refresh a session's last-activity timestamp. No-op when absent.
    pub fn touch(&self, session_id: &str) {
        let mut sessions = self.sessions.lock().expect("session registry mutex poisoned");
        if let Some(entry) = sessions.get_mut(session_id) {
            entry.last_activity = Instant::now();
        }
    }

    /// Close and remove a session. Returns whether it existed.
    ///
    /// Close is best-effort: a failing close hook never blocks removal.
    pub fn terminate(&self, session_id: &str) -> bool {
        let entry = {
            let mut sessions = self.sessions.lock().expect("session registry mutex poisoned");
            sessions.remove(session_id)
        };
        match entry {
            Some(entry) => {
                if let Err(e) = entry.handle.close() {
                    tracing::warn!(session_id, error = %e, "session close failed");
                }
                tracing::info!(
                    session_id,
                    lifetime_secs = entry.created_at.elapsed().as_secs(),
                    "session_terminated"
                );
                true
            }
            None => false,
        }
    }

    /// Remove and close every session idle strictly longer than the
    /// threshold. Returns the reclaimed ids. Idempotent for a fixed `now`.
    pub fn sweep(&self, now: Instant) -> Vec<String> {
        let expired: Vec<(String, Arc<ProtocolSession>)> = {
            let mut sessions = self.sessions.lock().expect("session registry mutex poisoned");
            let ids: Vec<String> = sessions
                .iter()
                .filter(|(_, entry)| {
                    now.saturating_duration_since(entry.last_activity) > self.idle_timeout
                })
                .map(|(id, _)| id.clone())
                .collect();
            ids.into_iter()
                .filter_map(|id| sessions.remove(&id).map(|entry| (id, entry.handle)))
                .collect()
        };

        let mut removed = Vec::with_capacity(expired.len());
        for (id, handle) in expired {
            if let Err(e) = handle.close() {
                tracing::warn!(session_id = %id, error = %e, "session close failed");
            }
            tracing::info!(session_id = %id, "session_expired");
            removed.push(id);
        }
        removed
    }

    /// Close every session. Shutdown only.
    pub fn terminate_all(&self) {
        let drained: Vec<(String, SessionEntry)> = {
            let mut sessions = self.sessions.lock().expect("session registry mutex poisoned");
            sessions.drain().collect()
        };
        let count = drained.len();
        for (id, entry) in drained {
            if let Err(e) = entry.handle.close() {
                tracing::warn!(session_id = %id, error = %e, "session close failed");
            }
        }
        if count > 0 {
            tracing::info!(closed = count, "all sessions terminated");
        }
    }

    pub fn count(&self) -> usize {
        self.sessions.lock().expect("session registry mutex poisoned").len()
    }

    /// Last-activity timestamp for a session, if registered.
    pub fn last_activity(&self, session_id: &str) -> Option<Instant> {
        self.sessions
            .lock()
            .expect("session registry mutex poisoned")
            .get(session_id)
            .map(|entry| entry.last_activity)
    }
}
