//! The persisted resume point of a chain.
//!
//! After every successful segment the driver records the highest completed iteration and the
//! state artifact it produced. The record is a small TOML file next to the artifacts, so it
//! can be inspected (or deleted) by hand.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MarkerError {
    #[error("I/O error on progress marker '{path}': {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Malformed progress marker '{path}': {source}", path = path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Failed to serialize progress marker: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ProgressMarker {
    pub last_completed_iteration: usize,
    pub state_artifact: PathBuf,
    pub total_steps: usize,
}

impl ProgressMarker {
    pub fn new(last_completed_iteration: usize, state_artifact: PathBuf, total_steps: usize) -> Self {
        Self {
            last_completed_iteration,
            state_artifact,
            total_steps,
        }
    }

    pub fn next_iteration(&self) -> usize {
        self.last_completed_iteration + 1
    }

    /// Reads the marker, returning `None` when no marker has been written yet.
    pub fn load(path: &Path) -> Result<Option<Self>, MarkerError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(MarkerError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        toml::from_str(&content)
            .map(Some)
            .map_err(|source| MarkerError::Parse {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Writes the marker through a sibling temporary file and a rename, so a crash mid-write
    /// never leaves a truncated record behind.
    pub fn save(&self, path: &Path) -> Result<(), MarkerError> {
        let content = toml::to_string(self)?;
        let staging = path.with_extension("toml.tmp");
        let io_err = |source| MarkerError::Io {
            path: path.to_path_buf(),
            source,
        };
        fs::write(&staging, content).map_err(io_err)?;
        fs::rename(&staging, path).map_err(io_err)
    }

    pub fn remove(path: &Path) -> Result<bool, MarkerError> {
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(MarkerError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}
