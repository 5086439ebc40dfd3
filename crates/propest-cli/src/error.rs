use propest::core::curation::FilterError;
use propest::core::io::json::DocumentError;
use propest::core::io::table::TableError;
use propest::core::registry::RegistryError;
use propest::engine::error::{EngineError, RequestError};
use propest::engine::forcefield::ForceFieldError;
use propest::workflows::compare::CompareError;
use propest::workflows::merge::MergeError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse file '{path}': {source}", path = path.display())]
    FileParsing {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    ForceField(#[from] ForceFieldError),

    #[error("Property type registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Invalid filter: {0}")]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error("Comparison failed: {0}")]
    Compare(#[from] CompareError),

    #[error("Failed to write table: {0}")]
    Table(#[from] TableError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
