use super::{cancel_on_interrupt, write_completion};
use crate::cli::EstimateArgs;
use crate::config::PartialConfig;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use propest::{
    core::{io::json, models::dataset::PhysicalPropertyDataSet},
    engine::{
        client::CancellationToken,
        forcefield::ForceFieldSource,
        layers::{LayerRegistry, SimulationLayer},
        progress::ProgressReporter,
    },
    workflows,
};
use std::sync::Arc;
use tracing::info;

pub async fn run(args: EstimateArgs) -> Result<()> {
    let partial_config = PartialConfig::from_file(&args.config)?;
    info!("Merging configuration from file and CLI arguments...");
    let settings = partial_config.merge_with_estimate_args(&args)?;

    info!("Loading dataset from {:?}", &args.input);
    let data_set: PhysicalPropertyDataSet = json::read_document(&args.input)?;
    settings.registry.validate_data_set(&data_set)?;
    let force_field = ForceFieldSource::from_path(&args.force_field)?;

    info!("Simulation engine: {:?}", settings.engine.program());
    let layers = LayerRegistry::new().with_layer(Arc::new(SimulationLayer::new(Arc::new(
        settings.engine,
    ))));

    let cancellation = CancellationToken::new();
    let interrupt = cancel_on_interrupt(cancellation.clone());

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Estimating {} properties on {} worker(s)...",
        data_set.len(),
        settings.estimation.backend.number_of_workers
    );
    let completion = tokio::task::block_in_place(|| {
        workflows::estimate::run_cancellable(
            &data_set,
            &force_field,
            &settings.options,
            layers,
            &settings.estimation,
            &reporter,
            cancellation,
        )
    });
    interrupt.abort();

    write_completion(completion?, &args.output)
}
