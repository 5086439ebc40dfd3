use crate::core::models::dataset::PhysicalPropertyDataSet;
use crate::engine::backend::ComputeBackend;
use crate::engine::client::{CancellationToken, Completion, EvaluatorClient};
use crate::engine::config::{EstimationConfig, ServerConfig};
use crate::engine::error::EngineError;
use crate::engine::forcefield::ForceFieldSource;
use crate::engine::layers::LayerRegistry;
use crate::engine::options::RequestOptions;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::server::{EvaluatorServer, StartMode};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Estimates every property of `dataset` on a backend and server that live only for the
/// duration of the call.
pub fn run(
    dataset: &PhysicalPropertyDataSet,
    force_field: &ForceFieldSource,
    options: &RequestOptions,
    layers: LayerRegistry,
    config: &EstimationConfig,
    reporter: &ProgressReporter,
) -> Result<Completion, EngineError> {
    run_cancellable(
        dataset,
        force_field,
        options,
        layers,
        config,
        reporter,
        CancellationToken::new(),
    )
}

/// Like [`run`], stopping the wait early when `cancellation` fires. Tasks already running
/// are allowed to finish before the backend is torn down; queued tasks are dropped.
#[instrument(skip_all, name = "estimate_workflow", fields(properties = dataset.len()))]
pub fn run_cancellable(
    dataset: &PhysicalPropertyDataSet,
    force_field: &ForceFieldSource,
    options: &RequestOptions,
    layers: LayerRegistry,
    config: &EstimationConfig,
    reporter: &ProgressReporter,
    cancellation: CancellationToken,
) -> Result<Completion, EngineError> {
    options.validate()?;

    reporter.report(Progress::PhaseStart {
        name: "Starting Compute Backend",
    });
    let backend = Arc::new(ComputeBackend::new(config.backend.clone()));
    backend.start()?;
    let server = EvaluatorServer::new(Arc::clone(&backend), layers, ServerConfig::in_process());
    server.start(StartMode::Background)?;
    reporter.report(Progress::Message(format!(
        "{} worker(s), {} each",
        config.backend.number_of_workers, config.backend.resources_per_worker
    )));
    reporter.report(Progress::PhaseFinish);

    let outcome = await_estimate(
        &server,
        dataset,
        force_field,
        options,
        config,
        reporter,
        cancellation,
    );

    reporter.report(Progress::PhaseStart {
        name: "Shutting Down",
    });
    server.shutdown();
    backend.stop();
    reporter.report(Progress::PhaseFinish);

    outcome
}

fn await_estimate(
    server: &EvaluatorServer,
    dataset: &PhysicalPropertyDataSet,
    force_field: &ForceFieldSource,
    options: &RequestOptions,
    config: &EstimationConfig,
    reporter: &ProgressReporter,
    cancellation: CancellationToken,
) -> Result<Completion, EngineError> {
    let client = EvaluatorClient::in_process(server);
    let request = client
        .request_estimate(dataset, force_field, options)?
        .with_cancellation_token(cancellation);

    reporter.report(Progress::PhaseStart {
        name: "Estimating Properties",
    });
    reporter.report(Progress::TaskStart {
        total_steps: dataset.len() as u64,
    });
    let mut last_completed = 0;
    let completion =
        request.await_completion_with(config.polling_interval, config.timeout, |snapshot| {
            if snapshot.progress.completed > last_completed {
                last_completed = snapshot.progress.completed;
                reporter.report(Progress::TaskProgress {
                    completed: last_completed as u64,
                });
            }
        })?;
    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);

    match &completion {
        Completion::Complete(result) => {
            info!(
                estimated = result.estimated_properties.len(),
                failed = result.unsuccessful_properties.len(),
                "Estimation finished"
            );
            if !result.exceptions.is_empty() {
                reporter.report(Progress::Message(format!(
                    "{} of {} properties could not be estimated",
                    result.exceptions.len(),
                    dataset.len()
                )));
            }
        }
        Completion::Errored(message) => warn!(%message, "Estimation request errored"),
        Completion::TimedOut => warn!("Timed out waiting for the estimation request"),
        Completion::Cancelled => warn!("Estimation wait cancelled"),
    }

    request.release()?;
    Ok(completion)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::EstimationConfigBuilder;
    use crate::engine::resources::ComputeResources;
    use crate::engine::testing::{self, MockEngine};
    use std::sync::Mutex;
    use std::time::Duration;

    fn config(workers: usize, timeout: Option<Duration>) -> EstimationConfig {
        let mut builder = EstimationConfigBuilder::new()
            .number_of_workers(workers)
            .resources_per_worker(ComputeResources::default())
            .polling_interval(Duration::from_millis(5));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        builder.build().unwrap()
    }

    #[test]
    fn estimates_every_property_and_reports_progress() {
        let events = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            events.lock().unwrap().push(event);
        }));

        let completion = run(
            &testing::density_and_mixing(),
            &ForceFieldSource::new("openff-2.0.0.offxml", "<SMIRNOFF/>"),
            &testing::simulation_options(&["Density", "EnthalpyOfMixing"]),
            testing::layers(MockEngine::new()),
            &config(2, None),
            &reporter,
        )
        .unwrap();
        drop(reporter);

        let Completion::Complete(result) = completion else {
            panic!("expected a complete request, got {completion:?}");
        };
        assert_eq!(result.estimated_properties.len(), 2);
        assert_eq!(result.error, None);

        let events = events.into_inner().unwrap();
        assert!(events.contains(&Progress::TaskStart { total_steps: 2 }));
        assert!(events.contains(&Progress::TaskProgress { completed: 2 }));
        assert_eq!(events.last(), Some(&Progress::PhaseFinish));
    }

    #[test]
    fn slow_estimates_time_out() {
        let engine = MockEngine::new().with_delay(Duration::from_millis(300));
        let completion = run(
            &testing::density_and_mixing(),
            &ForceFieldSource::new("ff", ""),
            &testing::simulation_options(&["Density", "EnthalpyOfMixing"]),
            testing::layers(engine),
            &config(1, Some(Duration::from_millis(20))),
            &ProgressReporter::new(),
        )
        .unwrap();
        assert_eq!(completion, Completion::TimedOut);
    }

    #[test]
    fn invalid_options_fail_before_starting_anything() {
        let options: RequestOptions =
            serde_json::from_str(r#"{"calculation_layers": [], "calculation_schemas": {}}"#)
                .unwrap();
        let result = run(
            &testing::density_and_mixing(),
            &ForceFieldSource::new("ff", ""),
            &options,
            testing::layers(MockEngine::new()),
            &config(1, None),
            &ProgressReporter::new(),
        );
        assert!(matches!(result, Err(EngineError::Options(_))));
    }
}
