//! JSON persistence for [`SetupState`].

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use super::SetupState;
use crate::fs::write_atomic;

/// File name of the state document inside the rigger config directory.
pub const STATE_FILE_NAME: &str = "setup-state.json";

/// Errors from reading or writing the state file.
#[derive(Debug, Error)]
pub enum StateError {
    /// The file exists but is not a valid state document.
    #[error("state file {} is corrupt: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to read state file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write state file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Loads and saves the setup state at a fixed path.
///
/// No locking: two concurrent invocations sharing one state file are not
/// supported and the last writer wins.
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

    /// Load the state, distinguishing "absent" (`Ok(None)`) from "corrupt".
    pub fn try_load(&self) -> Result<Option<SetupState>, StateError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StateError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|source| StateError::Corrupt {
                path: self.path.clone(),
                source,
            })
    }

    /// Load the state, falling back to a fresh step-0 state when the file is
    /// missing, unreadable or corrupt. Never fails.
    pub fn load(&self) -> SetupState {
        match self.try_load() {
            Ok(Some(state)) => {
                debug!(path = %self.path.display(), step = state.step, "loaded setup state");
                state
            }
            Ok(None) => SetupState::new(),
            Err(e) => {
                warn!("{e}; starting from step 0");
                SetupState::new()
            }
        }
    }

    /// Overwrite the state file with `state`, creating its directory.
    pub fn save(&self, state: &SetupState) -> Result<(), StateError> {
        let mut json = serde_json::to_string_pretty(state).map_err(|source| {
            StateError::Write {
                path: self.path.clone(),
                source: io::Error::new(io::ErrorKind::InvalidData, source),
            }
        })?;
        json.push('\n');

        write_atomic(&self.path, &json).map_err(|source| StateError::Write {
            path: self.path.clone(),
            source,
        })?;
        debug!(path = %self.path.display(), step = state.step, "saved setup state");
        Ok(())
    }
}
