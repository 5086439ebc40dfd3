use crate::cli::MergeArgs;
use crate::error::{CliError, Result};
use propest::workflows::merge::{ResultShardMerger, worker_shard_paths};
use tracing::info;

pub async fn run(args: MergeArgs) -> Result<()> {
    let shards = match (&args.dir, args.workers) {
        (Some(dir), Some(workers)) => worker_shard_paths(dir, workers),
        (None, _) if !args.shards.is_empty() => args.shards.clone(),
        _ => {
            return Err(CliError::Argument(
                "Give the shard paths, or `--dir` together with `--workers`".to_string(),
            ));
        }
    };

    let merger = if args.strict {
        ResultShardMerger::strict()
    } else {
        ResultShardMerger::new()
    };
    info!("Merging {} shard(s) into {:?}", shards.len(), &args.output);
    let merged = tokio::task::block_in_place(|| merger.merge_to_path(&shards, &args.output))?;

    let properties = merged["estimated_properties"]["properties"]
        .as_array()
        .map_or(0, Vec::len);
    println!(
        "✓ Merged {} shard(s), {} estimated properties. Written to: {}",
        shards.len(),
        properties,
        args.output.display()
    );
    Ok(())
}
