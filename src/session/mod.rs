//! Session/conversation store
//!
//! Process-wide map from session id to conversation state. The map itself
//! sits behind a short-lived `RwLock`; each session's state sits behind its
//! own async mutex, so requests for one session are serialized while
//! different sessions never wait on each other.
//!
//! State lives for the lifetime of the process. There is no expiry.

use crate::agent::ConversationState;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Shared handle to one session's conversation state
pub type SessionHandle = Arc<Mutex<ConversationState>>;

/// In-memory session store
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a fresh opaque session id
    pub fn new_session_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Return the session's state handle, creating empty state on first use
    ///
    /// Concurrent callers with the same id always receive the same handle.
    pub fn get_or_create(&self, session_id: &str) -> SessionHandle {
        {
            let sessions = self
                .sessions
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some(handle) = sessions.get(session_id) {
                return Arc::clone(handle);
            }
        }

        let mut sessions = self
            .sessions
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(handle) = sessions.get(session_id) {
            return Arc::clone(handle);
        }
        let handle: SessionHandle = Arc::new(Mutex::new(ConversationState::default()));
        sessions.insert(session_id.to_string(), Arc::clone(&handle));
        info!(session = %session_id, sessions = sessions.len(), "Created session");
        handle
    }

    /// Clear a session's history and last output; the session itself remains
    pub async fn reset(&self, session_id: &str) {
        let handle = self.get_or_create(session_id);
        handle.lock().await.clear();
        info!(session = %session_id, "Session conversation cleared");
    }

    /// Append one turn to a session's history
    pub async fn append_turn(&self, session_id: &str, role: &str, content: &str) {
        let handle = self.get_or_create(session_id);
        handle.lock().await.push_turn(role, content);
    }

    /// Keep only the most recent `keep_last` turns of a session's history
    pub async fn trim(&self, session_id: &str, keep_last: usize) {
        let handle = self.get_or_create(session_id);
        handle.lock().await.trim(keep_last);
        debug!(session = %session_id, keep_last, "Trimmed session history");
    }

    /// Copy of a session's current state
    pub async fn snapshot(&self, session_id: &str) -> ConversationState {
        let handle = self.get_or_create(session_id);
        let state = handle.lock().await;
        state.clone()
    }

    /// Number of sessions held
    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// True when no session has been created yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
