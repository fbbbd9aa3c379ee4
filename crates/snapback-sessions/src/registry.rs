//! Session Registry (§4.2): maps session id → session handle. The single
//! synchronization point for transport lifetimes — it holds no other
//! business logic, generalized from the teacher's gateway-owned session
//! store (id, timestamps) combined with its `CancelMap` registration step.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};

use crate::cancel::CancelToken;

/// A registered session: stable id, cancellation handle, and activity
/// timestamps (§3 Session).
pub struct SessionHandle {
    pub id: String,
    pub cancel: CancelToken,
    pub created_at: DateTime<Utc>,
    last_activity: Mutex<DateTime<Utc>>,
}

impl SessionHandle {
    pub fn last_activity(&self) -> DateTime<Utc> {
        *self.last_activity.lock()
    }

    pub fn touch(&self) {
        *self.last_activity.lock() = Utc::now();
    }
}

/// Registers, looks up and removes sessions. On remove, cancels the
/// session's cancellation handle — in-flight requests observe this at
/// their next suspension point and unwind (§5).
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<SessionHandle>>>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new session with the given cancellation token. Returns
    /// the freshly minted session id.
    pub fn register(&self, cancel: CancelToken) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let handle = Arc::new(SessionHandle {
            id: id.clone(),
            cancel,
            created_at: now,
            last_activity: Mutex::new(now),
        });
        self.sessions.write().insert(id.clone(), handle);
        tracing::info!(session_id = %id, "session registered");
        id
    }

    pub fn lookup(&self, session_id: &str) -> Option<Arc<SessionHandle>> {
        self.sessions.read().get(session_id).cloned()
    }

    /// Cancel and remove a session. Returns `true` if it was present.
    /// Safe to call concurrently with iteration (e.g. shutdown sweeps).
    pub fn remove(&self, session_id: &str) -> bool {
        let removed = self.sessions.write().remove(session_id);
        match removed {
            Some(handle) => {
                handle.cancel.cancel();
                tracing::info!(session_id = %session_id, "session removed");
                true
            }
            None => false,
        }
    }

    pub fn touch(&self, session_id: &str) {
        if let Some(handle) = self.sessions.read().get(session_id) {
            handle.touch();
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every registered session id, snapshotted under the read lock.
    /// Iterate over this for shutdown rather than the live map, so a
    /// concurrent `remove` never invalidates the iteration (§4.2).
    pub fn ids(&self) -> Vec<String> {
        self.sessions.read().keys().cloned().collect()
    }

    /// Cancel and remove every session (used on process shutdown).
    pub fn shutdown_all(&self) {
        for id in self.ids() {
            self.remove(&id);
        }
    }
}
