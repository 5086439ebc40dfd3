use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("File I/O error for '{path}': {source}", path = path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("JSON error in '{path}': {source}", path = path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Reads any JSON document type (datasets, request results) from a file.
pub fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T, DocumentError> {
    let file = File::open(path).map_err(|source| DocumentError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| DocumentError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes a document as indented JSON, replacing any existing file.
pub fn write_document<T: Serialize + ?Sized>(
    path: &Path,
    document: &T,
) -> Result<(), DocumentError> {
    let io_error = |source| DocumentError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(io_error)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, document).map_err(|source| DocumentError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    writer.write_all(b"\n").map_err(io_error)?;
    writer.flush().map_err(io_error)
}
