use clap::{Args, Parser, Subcommand};
use propest::engine::config::DEFAULT_SERVER_PORT;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "propest CLI - Curate physical property datasets, estimate them on a pool of simulation workers, and merge and compare the results.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply the filters of a configuration file to a dataset.
    Filter(FilterArgs),
    /// Estimate a dataset on a local worker pool and wait for the result.
    Estimate(EstimateArgs),
    /// Run an evaluator server that accepts requests over TCP until interrupted.
    Serve(ServeArgs),
    /// Submit a dataset to a running evaluator server.
    Submit(SubmitArgs),
    /// Poll or collect a request submitted earlier.
    Fetch(FetchArgs),
    /// Merge per-worker result shards into one result document.
    Merge(MergeArgs),
    /// Compare estimated properties with experimental ones.
    Compare(CompareArgs),
}

/// Arguments for the `filter` subcommand.
#[derive(Args, Debug)]
pub struct FilterArgs {
    /// Path to the input dataset (JSON).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path for the filtered dataset (JSON).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Path to the configuration file holding the `[[filters]]` list.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// Additionally write the filtered dataset as a CSV table.
    #[arg(long, value_name = "PATH")]
    pub csv: Option<PathBuf>,

    /// Override the property type registry file from the config file.
    #[arg(long, value_name = "PATH")]
    pub registry: Option<PathBuf>,
}

/// Worker pool overrides shared by `estimate` and `serve`.
#[derive(Args, Debug, Clone, Default)]
pub struct BackendOverrides {
    /// Override the number of compute workers.
    #[arg(short = 'w', long, value_name = "INT")]
    pub workers: Option<usize>,

    /// Override the number of CPU threads given to each worker.
    #[arg(short = 't', long, value_name = "INT")]
    pub threads_per_worker: Option<usize>,

    /// Override the number of GPUs given to each worker.
    #[arg(long, value_name = "INT")]
    pub gpus_per_worker: Option<usize>,

    /// Override the simulation engine executable.
    #[arg(short = 'e', long, value_name = "PATH")]
    pub engine: Option<PathBuf>,
}

/// Arguments for the `estimate` subcommand.
#[derive(Args, Debug)]
pub struct EstimateArgs {
    /// Path to the dataset to estimate (JSON).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path for the result document (JSON).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Path to the main configuration file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// Path to the force field parameter file.
    #[arg(short = 'f', long, required = true, value_name = "PATH")]
    pub force_field: PathBuf,

    #[command(flatten)]
    pub backend: BackendOverrides,

    /// Override the property type registry file from the config file.
    #[arg(long, value_name = "PATH")]
    pub registry: Option<PathBuf>,

    /// Override the polling interval, in seconds.
    #[arg(long, value_name = "SECONDS")]
    pub polling_interval: Option<u64>,

    /// Give up waiting after this many seconds.
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S backend.workers=4
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `serve` subcommand.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Path to the main configuration file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// Override the address the server binds to.
    #[arg(long, value_name = "ADDRESS")]
    pub bind: Option<String>,

    /// Override the port the server listens on.
    #[arg(short, long, value_name = "PORT")]
    pub port: Option<u16>,

    #[command(flatten)]
    pub backend: BackendOverrides,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S server.port=8001
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// How to reach a running server.
#[derive(Args, Debug, Clone)]
pub struct ServerAddress {
    /// Host name or address of the server. Defaults to localhost.
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,

    /// Port of the server.
    #[arg(short, long, value_name = "PORT", default_value_t = DEFAULT_SERVER_PORT)]
    pub port: u16,
}

/// Arguments for the `submit` subcommand.
#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// Path to the dataset to estimate (JSON).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path to the configuration file holding the `[options]` section.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// Path to the force field parameter file.
    #[arg(short = 'f', long, required = true, value_name = "PATH")]
    pub force_field: PathBuf,

    #[command(flatten)]
    pub server: ServerAddress,

    /// Path for the result document. Required unless `--no-wait` is given.
    #[arg(short, long, value_name = "PATH", required_unless_present = "no_wait")]
    pub output: Option<PathBuf>,

    /// Print the request id and return without waiting for the result.
    #[arg(long)]
    pub no_wait: bool,

    /// Leave the request on the server after its result has been written.
    #[arg(long, conflicts_with = "no_wait")]
    pub keep: bool,

    /// Polling interval while waiting, in seconds.
    #[arg(long, value_name = "SECONDS", default_value_t = 30)]
    pub polling_interval: u64,

    /// Give up waiting after this many seconds.
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,
}

/// Arguments for the `fetch` subcommand.
#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Id printed by `submit --no-wait`.
    #[arg(required = true, value_name = "REQUEST_ID")]
    pub request_id: String,

    #[command(flatten)]
    pub server: ServerAddress,

    /// Path for the result document once the request is complete.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Wait for the request to finish instead of reporting its current status.
    #[arg(long)]
    pub wait: bool,

    /// Polling interval while waiting, in seconds.
    #[arg(long, value_name = "SECONDS", default_value_t = 30)]
    pub polling_interval: u64,

    /// Release the request on the server after its result has been written.
    #[arg(long)]
    pub release: bool,
}

/// Arguments for the `merge` subcommand.
#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Result shards to merge, in order. The first one provides the document's metadata.
    #[arg(value_name = "SHARD", conflicts_with = "dir")]
    pub shards: Vec<PathBuf>,

    /// Directory holding `results-worker<N>.json` shards.
    #[arg(short, long, value_name = "DIR", requires = "workers")]
    pub dir: Option<PathBuf>,

    /// Number of worker shards to read from `--dir`.
    #[arg(short = 'n', long, value_name = "INT")]
    pub workers: Option<usize>,

    /// Path for the merged result document.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Fail when a property identifier appears in more than one shard.
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for the `compare` subcommand.
#[derive(Args, Debug)]
pub struct CompareArgs {
    /// Experimental dataset (JSON).
    #[arg(short = 'x', long, required = true, value_name = "PATH")]
    pub experimental: PathBuf,

    /// Result document or dataset holding the estimates (JSON).
    #[arg(short = 'e', long, required = true, value_name = "PATH")]
    pub estimated: PathBuf,

    /// Write the comparison summary as JSON.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Write one CSV row per compared pair.
    #[arg(long, value_name = "PATH")]
    pub csv: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn submit_requires_output_unless_no_wait() {
        let base = ["propest", "submit", "-i", "d.json", "-c", "c.toml", "-f", "ff.offxml"];
        assert!(Cli::try_parse_from(base).is_err());

        let cli = Cli::try_parse_from(base.iter().copied().chain(["--no-wait"])).unwrap();
        let Commands::Submit(args) = cli.command else {
            panic!("Expected 'submit' subcommand");
        };
        assert!(args.no_wait);
        assert_eq!(args.server.port, 8000);
        assert_eq!(args.server.host, None);
    }

    #[test]
    fn submit_keep_only_applies_when_waiting() {
        let base = ["propest", "submit", "-i", "d.json", "-c", "c.toml", "-f", "ff.offxml"];

        let cli = Cli::try_parse_from(base.iter().copied().chain(["-o", "r.json"])).unwrap();
        let Commands::Submit(args) = cli.command else {
            panic!("Expected 'submit' subcommand");
        };
        assert!(!args.keep);

        let both = base.iter().copied().chain(["--no-wait", "--keep"]);
        assert!(Cli::try_parse_from(both).is_err());
    }

    #[test]
    fn merge_accepts_a_shard_directory() {
        let cli = Cli::try_parse_from([
            "propest", "merge", "--dir", "out", "-n", "3", "-o", "results.json", "--strict",
        ])
        .unwrap();
        let Commands::Merge(args) = cli.command else {
            panic!("Expected 'merge' subcommand");
        };
        assert!(args.shards.is_empty());
        assert_eq!(args.workers, Some(3));
        assert!(args.strict);
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from([
            "propest", "-q", "-v", "merge", "a.json", "-o", "b.json",
        ]);
        assert!(result.is_err());
    }
}
