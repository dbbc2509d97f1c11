//! Session persistence — durable storage for the active session.
//!
//! DESIGN
//! ======
//! A single well-known key holds at most one session as a flat JSON object.
//! `load` never fails: a missing, unreadable or undecodable entry is reported
//! as `None`. `save` and `clear` return errors so the effect pipeline can log
//! them, but nothing upstream treats them as fatal.
//!
//! `FileSessionStore` writes to a temp file and renames it into place so a
//! crash mid-write leaves either the old or the new session, never half of one.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::session::Session;

pub const DEFAULT_SESSION_KEY: &str = "userData";

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("session storage io failed: {0}")]
    Io(#[from] io::Error),
    #[error("session serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("session storage lock poisoned")]
    Poisoned,
}

/// Durable key-value slot for one `Session`.
pub trait SessionStore: Send + Sync {
    /// Overwrite the stored session.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistenceError`] if the session cannot be encoded or written.
    fn save(&self, session: &Session) -> Result<(), PersistenceError>;

    /// Read the stored session, `None` when absent or undecodable.
    fn load(&self) -> Option<Session>;

    /// Remove the stored session. Clearing an empty store succeeds.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistenceError`] if an existing entry cannot be removed.
    fn clear(&self) -> Result<(), PersistenceError>;
}

fn decode(raw: &str) -> Option<Session> {
    match serde_json::from_str(raw) {
        Ok(session) => Some(session),
        Err(e) => {
            warn!(error = %e, "persistence: stored session undecodable, treating as absent");
            None
        }
    }
}

// =============================================================================
// FILE STORE
// =============================================================================

/// Session slot backed by `<dir>/<key>.json`. Survives process restarts.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    #[must_use]
    pub fn new(dir: impl AsRef<Path>, key: &str) -> Self {
        Self { path: dir.as_ref().join(format!("{key}.json")) }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn save(&self, session: &Session) -> Result<(), PersistenceError> {
        let json = serde_json::to_vec(session)?;
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), "persistence: session saved");
        Ok(())
    }

    fn load(&self) -> Option<Session> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => decode(&raw),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "persistence: session read failed");
                None
            }
        }
    }

    fn clear(&self) -> Result<(), PersistenceError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "persistence: session cleared");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// Process-local slot holding the serialized session. Does not survive restarts.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    slot: Mutex<Option<String>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the slot with raw JSON, bypassing serialization.
    #[must_use]
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self { slot: Mutex::new(Some(raw.into())) }
    }

    /// Raw JSON currently stored, if any.
    #[must_use]
    pub fn raw(&self) -> Option<String> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }
}

impl SessionStore for MemorySessionStore {
    fn save(&self, session: &Session) -> Result<(), PersistenceError> {
        let json = serde_json::to_string(session)?;
        *self.slot.lock().map_err(|_| PersistenceError::Poisoned)? = Some(json);
        Ok(())
    }

    fn load(&self) -> Option<Session> {
        let raw = self.slot.lock().ok()?.clone()?;
        decode(&raw)
    }

    fn clear(&self) -> Result<(), PersistenceError> {
        *self.slot.lock().map_err(|_| PersistenceError::Poisoned)? = None;
        Ok(())
    }
}

#[cfg(test)]
#[path = "persistence_test.rs"]
mod tests;
