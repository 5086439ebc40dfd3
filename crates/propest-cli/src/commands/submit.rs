use super::{await_request, cancel_on_interrupt, save_and_release, write_completion};
use crate::cli::SubmitArgs;
use crate::config::PartialConfig;
use crate::error::{CliError, Result};
use propest::{
    core::{io::json, models::dataset::PhysicalPropertyDataSet},
    engine::{
        client::{CancellationToken, ConnectionOptions, EvaluatorClient},
        forcefield::ForceFieldSource,
    },
};
use std::time::Duration;
use tracing::info;

pub async fn run(args: SubmitArgs) -> Result<()> {
    let options = PartialConfig::from_file(&args.config)?.request_options()?;

    info!("Loading dataset from {:?}", &args.input);
    let data_set: PhysicalPropertyDataSet = json::read_document(&args.input)?;
    let force_field = ForceFieldSource::from_path(&args.force_field)?;

    let connection = ConnectionOptions::new(args.server.host.clone(), args.server.port);
    let address = connection.address();
    info!("Submitting {} properties to {}", data_set.len(), address);
    let client = EvaluatorClient::connect(&connection);
    let request = tokio::task::block_in_place(|| {
        client.request_estimate(&data_set, &force_field, &options)
    })?;

    if args.no_wait {
        println!("{}", request.id());
        return Ok(());
    }
    println!("Submitted request {}", request.id());

    let output = args.output.as_deref().ok_or_else(|| {
        CliError::Argument("`--output` is required unless `--no-wait` is given".to_string())
    })?;

    let cancellation = CancellationToken::new();
    let interrupt = cancel_on_interrupt(cancellation.clone());
    let request = request.with_cancellation_token(cancellation);
    let completion = await_request(
        &request,
        Duration::from_secs(args.polling_interval),
        args.timeout.map(Duration::from_secs),
    );
    interrupt.abort();

    if args.keep {
        write_completion(completion?, output)
    } else {
        save_and_release(request, completion?, output)
    }
}
