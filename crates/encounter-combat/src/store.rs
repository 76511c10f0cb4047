//! Encounter storage.
//!
//! The engine never persists anything itself. The service loads combat state
//! through this trait, mutates it, and writes it back.

use std::collections::HashMap;
use std::fmt::Display;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use encounter_common::{SessionId, StoreError};
use parking_lot::RwLock;
use tracing::debug;

use crate::turn::CombatState;

/// Backing store for combat state, keyed by session.
pub trait EncounterStore: Send + Sync {
    /// Load a session. `Ok(None)` if it does not exist.
    fn load(&self, session: SessionId) -> Result<Option<CombatState>, StoreError>;

    /// Insert or overwrite a session.
    fn save(&self, session: SessionId, state: &CombatState) -> Result<(), StoreError>;

    /// Delete a session. Returns whether it existed.
    fn remove(&self, session: SessionId) -> Result<bool, StoreError>;
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sessions: RwLock<HashMap<SessionId, CombatState>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

impl EncounterStore for MemoryStore {
    fn load(&self, session: SessionId) -> Result<Option<CombatState>, StoreError> {
        Ok(self.sessions.read().get(&session).cloned())
    }

    fn save(&self, session: SessionId, state: &CombatState) -> Result<(), StoreError> {
        self.sessions.write().insert(session, state.clone());
        Ok(())
    }

    fn remove(&self, session: SessionId) -> Result<bool, StoreError> {
        Ok(self.sessions.write().remove(&session).is_some())
    }
}

// ============================================================================
// File Store
// ============================================================================

/// Store keeping one JSON file per session in a directory.
///
/// Writes go to a temp file that is then renamed over the session file.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Store sessions under `dir`. The directory is created on first save.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the session files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn session_path(&self, session: SessionId) -> PathBuf {
        self.dir.join(format!("{session}.json"))
    }

    fn temp_path(&self, session: SessionId) -> PathBuf {
        self.dir.join(format!("{session}.json.tmp"))
    }
}

fn save_failed(session: SessionId, reason: impl Display) -> StoreError {
    StoreError::SaveFailed {
        session,
        reason: reason.to_string(),
    }
}

impl EncounterStore for FileStore {
    fn load(&self, session: SessionId) -> Result<Option<CombatState>, StoreError> {
        let path = self.session_path(session);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StoreError::LoadFailed {
                    session,
                    reason: e.to_string(),
                })
            },
        };

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| StoreError::InvalidData(format!("{}: {e}", path.display())))
    }

    fn save(&self, session: SessionId, state: &CombatState) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|e| save_failed(session, e))?;

        let temp_path = self.temp_path(session);
        {
            let file = File::create(&temp_path).map_err(|e| save_failed(session, e))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, state)
                .map_err(|e| save_failed(session, e))?;
            writer.flush().map_err(|e| save_failed(session, e))?;
        }

        fs::rename(&temp_path, self.session_path(session)).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            save_failed(session, e)
        })?;

        debug!(%session, "Saved session file");
        Ok(())
    }

    fn remove(&self, session: SessionId) -> Result<bool, StoreError> {
        match fs::remove_file(self.session_path(session)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(save_failed(session, e)),
        }
    }
}
