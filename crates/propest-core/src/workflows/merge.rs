use crate::core::io::json::{self, DocumentError};
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, instrument};

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("No result shards were given")]
    NoShards,

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("Shard '{path}' is not a result document: {reason}", path = path.display())]
    MalformedShard { path: PathBuf, reason: String },

    #[error("Property '{id}' in shard '{path}' was already merged", path = path.display())]
    DuplicateIdentifier { id: String, path: PathBuf },
}

/// Combines the per-worker result documents of one run into a single document.
///
/// The first shard is taken whole, so any top-level fields it carries survive; only the
/// `estimated_properties.properties` lists of later shards are appended, in shard order.
/// Identifiers are not deduplicated unless `strict` is set, in which case a repeated
/// identifier fails the merge.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultShardMerger {
    pub strict: bool,
}

impl ResultShardMerger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strict() -> Self {
        Self { strict: true }
    }

    #[instrument(
        skip_all,
        name = "merge_shards",
        fields(shards = shard_paths.len(), strict = self.strict)
    )]
    pub fn merge<P: AsRef<Path>>(&self, shard_paths: &[P]) -> Result<Value, MergeError> {
        let (first, rest) = shard_paths.split_first().ok_or(MergeError::NoShards)?;
        let first = first.as_ref();

        let mut merged: Value = json::read_document(first)?;
        let mut seen = HashSet::new();
        let base_count = {
            let base = estimated_list(&mut merged, first)?;
            if self.strict {
                record_identifiers(base, &mut seen, first)?;
            }
            base.len()
        };
        debug!(path = %first.display(), properties = base_count, "Loaded base shard");

        for path in rest {
            let path = path.as_ref();
            let mut shard: Value = json::read_document(path)?;
            let properties = std::mem::take(estimated_list(&mut shard, path)?);
            if self.strict {
                record_identifiers(&properties, &mut seen, path)?;
            }
            debug!(path = %path.display(), properties = properties.len(), "Appending shard");
            estimated_list(&mut merged, first)?.extend(properties);
        }

        let total = estimated_list(&mut merged, first)?.len();
        info!(properties = total, "Merged result shards");
        Ok(merged)
    }

    /// Merges and writes the result as indented JSON. Nothing is written if any shard fails.
    pub fn merge_to_path<P: AsRef<Path>>(
        &self,
        shard_paths: &[P],
        output: &Path,
    ) -> Result<Value, MergeError> {
        let merged = self.merge(shard_paths)?;
        json::write_document(output, &merged)?;
        info!(output = %output.display(), "Wrote merged results");
        Ok(merged)
    }
}

/// `results-worker0.json` .. `results-worker{n-1}.json` inside `dir`.
pub fn worker_shard_paths(dir: &Path, number_of_workers: usize) -> Vec<PathBuf> {
    (0..number_of_workers)
        .map(|worker| dir.join(format!("results-worker{}.json", worker)))
        .collect()
}

fn estimated_list<'a>(
    document: &'a mut Value,
    path: &Path,
) -> Result<&'a mut Vec<Value>, MergeError> {
    document
        .get_mut("estimated_properties")
        .and_then(|estimated| estimated.get_mut("properties"))
        .and_then(Value::as_array_mut)
        .ok_or_else(|| MergeError::MalformedShard {
            path: path.to_path_buf(),
            reason: "missing 'estimated_properties.properties' list".to_string(),
        })
}

fn record_identifiers(
    properties: &[Value],
    seen: &mut HashSet<String>,
    path: &Path,
) -> Result<(), MergeError> {
    for property in properties {
        let id = property
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| MergeError::MalformedShard {
                path: path.to_path_buf(),
                reason: "estimated property without an 'id'".to_string(),
            })?;
        if !seen.insert(id.to_string()) {
            return Err(MergeError::DuplicateIdentifier {
                id: id.to_string(),
                path: path.to_path_buf(),
            });
        }
    }
    Ok(())
}
