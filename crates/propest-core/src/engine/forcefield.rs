use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Failed to read force field '{path}': {source}", path = path.display())]
pub struct ForceFieldError {
    pub path: PathBuf,
    pub source: std::io::Error,
}

/// A force field passed through to the simulation engine unchanged.
///
/// The orchestration layer never interprets the contents; it only carries them from the
/// client to whichever engine runs the task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForceFieldSource {
    pub name: String,
    pub contents: String,
}

impl ForceFieldSource {
    pub fn new(name: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contents: contents.into(),
        }
    }

    /// Reads a force field file (e.g. `openff-2.0.0.offxml`), naming it after the file.
    pub fn from_path(path: &Path) -> Result<Self, ForceFieldError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ForceFieldError {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, contents })
    }
}
