use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::accounting::ledger::Ledger;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("State file I/O error at {path:?}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("State serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// On-disk document. Only the ledger is durable; baselines and the event log
/// are rebuilt after a restart.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PersistedState {
    pub history: Ledger,
}

/// Full-overwrite JSON snapshot of the ledger.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the stored ledger, or `None` if the file is absent or unreadable.
    pub fn load(&self) -> Option<Ledger> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(path = ?self.path, "No saved usage state found.");
                return None;
            }
            Err(e) => {
                warn!(path = ?self.path, error = %e, "Failed to read usage state. Starting from zero.");
                return None;
            }
        };

        match serde_json::from_str::<PersistedState>(&contents) {
            Ok(state) => {
                debug!(path = ?self.path, "Loaded usage state.");
                Some(state.history)
            }
            Err(e) => {
                warn!(path = ?self.path, error = %e, "Usage state is corrupt. Starting from zero.");
                None
            }
        }
    }

    /// Replaces the stored state with `ledger`. The document is written to a
    /// sibling temporary file and renamed into place.
    pub fn save(&self, ledger: &Ledger) -> Result<(), StoreError> {
        let io_err = |source: io::Error| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(io_err)?;

        let state = PersistedState {
            history: ledger.clone(),
        };
        let contents = serde_json::to_vec_pretty(&state)?;

        let mut temp_file = tempfile::NamedTempFile::new_in(&dir).map_err(io_err)?;
        temp_file.write_all(&contents).map_err(io_err)?;
        temp_file.as_file().sync_all().map_err(io_err)?;
        temp_file
            .persist(&self.path)
            .map_err(|e| io_err(e.error))?;

        debug!(path = ?self.path, "Saved usage state.");
        Ok(())
    }
}
