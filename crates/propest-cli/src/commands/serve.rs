use crate::cli::ServeArgs;
use crate::config::PartialConfig;
use crate::error::Result;
use propest::engine::{
    backend::ComputeBackend,
    error::EngineError,
    layers::{LayerRegistry, SimulationLayer},
    server::{EvaluatorServer, StartMode},
};
use std::sync::Arc;
use tracing::{info, warn};

pub async fn run(args: ServeArgs) -> Result<()> {
    let partial_config = PartialConfig::from_file(&args.config)?;
    let settings = partial_config.merge_with_serve_args(&args)?;

    let backend = Arc::new(ComputeBackend::new(settings.backend.clone()));
    backend.start().map_err(EngineError::from)?;
    info!(
        "Compute backend started with {} worker(s), {} each.",
        settings.backend.number_of_workers, settings.backend.resources_per_worker
    );

    let layers = LayerRegistry::new().with_layer(Arc::new(SimulationLayer::new(Arc::new(
        settings.engine,
    ))));
    let server = EvaluatorServer::new(Arc::clone(&backend), layers, settings.server.clone());

    let stopper = server.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, shutting the server down.");
            stopper.shutdown();
        }
    });

    println!(
        "Serving on {}:{} with {} worker(s). Press Ctrl-C to stop.",
        settings.server.bind_address,
        settings.server.port.unwrap_or_default(),
        settings.backend.number_of_workers
    );
    let served = tokio::task::block_in_place(|| server.start(StartMode::Blocking));
    interrupt.abort();

    tokio::task::block_in_place(|| {
        server.shutdown();
        backend.stop();
    });
    served.map_err(EngineError::from)?;
    Ok(())
}
