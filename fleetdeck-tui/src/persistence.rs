//! Persistence for lightweight UI state.

use crate::nav::View;
use fleetdeck_core::Query;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    pub active_view: View,
    /// Last committed agent list query, restored on start.
    pub agent_query: Option<Query>,
}

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{path} is not a saved UI state: {source}")]
    Decode {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("cannot encode UI state: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Read the saved state. A missing file is a first run, not an error.
pub fn load(path: &Path) -> Result<Option<PersistedState>, PersistenceError> {
    let raw = match std::fs::read(path) {
        Ok(raw) => raw,
        Err(source) if source.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(PersistenceError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_slice(&raw)
        .map(Some)
        .map_err(|source| PersistenceError::Decode {
            path: path.to_path_buf(),
            source,
        })
}

/// Write the state next to its final location, then rename over it, so a
/// crash mid-write never leaves a truncated file behind.
pub fn save(path: &Path, state: &PersistedState) -> Result<(), PersistenceError> {
    let encoded = serde_json::to_vec_pretty(state)?;
    let write_err = |source: std::io::Error| PersistenceError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(write_err)?;
    }
    let staging = staging_path(path);
    std::fs::write(&staging, encoded).map_err(write_err)?;
    std::fs::rename(&staging, path).map_err(|source| {
        let _ = std::fs::remove_file(&staging);
        write_err(source)
    })
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
