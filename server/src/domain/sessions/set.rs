//! In-memory session set shared by the HTTP handlers.

use std::sync::Arc;

use parking_lot::RwLock;

use super::session::Session;

/// Uploaded sessions in upload order.
///
/// Readers take an `Arc` snapshot and compute on it without holding the lock.
#[derive(Default)]
pub struct SessionSet {
    sessions: RwLock<Vec<Arc<Session>>>,
}

impl SessionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a session. A session with the same file name is replaced in place
    /// and `true` is returned.
    pub fn insert(&self, session: Session) -> bool {
        let session = Arc::new(session);
        let mut sessions = self.sessions.write();
        match sessions
            .iter()
            .position(|s| s.file_name == session.file_name)
        {
            Some(i) => {
                tracing::debug!(file = %session.file_name, "Replacing session");
                sessions[i] = session;
                true
            }
            None => {
                sessions.push(session);
                false
            }
        }
    }

    pub fn remove(&self, file_name: &str) -> Option<Arc<Session>> {
        let mut sessions = self.sessions.write();
        let i = sessions.iter().position(|s| s.file_name == file_name)?;
        Some(sessions.remove(i))
    }

    pub fn get(&self, file_name: &str) -> Option<Arc<Session>> {
        self.sessions
            .read()
            .iter()
            .find(|s| s.file_name == file_name)
            .cloned()
    }

    pub fn snapshot(&self) -> Vec<Arc<Session>> {
        self.sessions.read().clone()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}
