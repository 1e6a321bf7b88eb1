//! Auth context storage
//!
//! The account client reads its bearer token through [`SessionStore`] so that
//! callers decide where credentials live: in memory for the server and
//! tests, in a JSON file under the profile directory for the CLI.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session store serialization error: {0}")]
    Serialization(String),
}

/// Stored login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub saved_at: DateTime<Utc>,
}

impl AuthSession {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            email: None,
            saved_at: Utc::now(),
        }
    }
}

pub trait SessionStore: Send + Sync + std::fmt::Debug {
    fn get(&self) -> Result<Option<AuthSession>, StoreError>;

    fn set(&self, session: &AuthSession) -> Result<(), StoreError>;

    /// Forget the stored session. Clearing an empty store is not an error.
    fn clear(&self) -> Result<(), StoreError>;

    /// Human-readable backend name
    fn name(&self) -> &'static str;
}

// ============================================================================
// MEMORY
// ============================================================================

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: RwLock<Option<AuthSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            session: RwLock::new(Some(AuthSession::new(token))),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self) -> Result<Option<AuthSession>, StoreError> {
        Ok(self.session.read().clone())
    }

    fn set(&self, session: &AuthSession) -> Result<(), StoreError> {
        *self.session.write() = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        *self.session.write() = None;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

// ============================================================================
// FILE
// ============================================================================

/// JSON file holding one [`AuthSession`].
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn atomic_write(&self, json: &str) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600))?;
        }

        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self) -> Result<Option<AuthSession>, StoreError> {
        let json = match std::fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str::<AuthSession>(&json) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Corrupted session file, treating as logged out"
                );
                Ok(None)
            }
        }
    }

    fn set(&self, session: &AuthSession) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(session)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.atomic_write(&json)?;
        tracing::debug!(path = %self.path.display(), "Saved session");
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn name(&self) -> &'static str {
        "file"
    }
}
