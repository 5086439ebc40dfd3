use super::{await_request, cancel_on_interrupt, write_completion};
use crate::cli::FetchArgs;
use crate::error::{CliError, Result};
use propest::core::models::ids::RequestId;
use propest::engine::client::{CancellationToken, Completion, ConnectionOptions, EvaluatorClient};
use propest::engine::results::RequestStatus;
use std::time::Duration;
use tracing::info;

pub async fn run(args: FetchArgs) -> Result<()> {
    let request_id: RequestId = args.request_id.parse().map_err(|e| {
        CliError::Argument(format!("Invalid request id '{}': {}", args.request_id, e))
    })?;

    let connection = ConnectionOptions::new(args.server.host.clone(), args.server.port);
    let cancellation = CancellationToken::new();
    let request = EvaluatorClient::connect(&connection)
        .request(request_id)
        .with_cancellation_token(cancellation.clone());

    let completion = if args.wait {
        let interrupt = cancel_on_interrupt(cancellation);
        let completion = await_request(&request, Duration::from_secs(args.polling_interval), None);
        interrupt.abort();
        completion?
    } else {
        let snapshot = tokio::task::block_in_place(|| request.poll())?;
        println!(
            "Request {}: {} ({}/{} properties finished)",
            snapshot.request_id,
            snapshot.status,
            snapshot.progress.completed,
            snapshot.progress.total
        );
        match (snapshot.status, snapshot.result, snapshot.error) {
            (RequestStatus::Complete, Some(result), _) => Completion::Complete(result),
            (RequestStatus::Errored, _, error) => {
                Completion::Errored(error.unwrap_or_else(|| "unknown error".to_string()))
            }
            _ => return Ok(()),
        }
    };

    match &args.output {
        Some(output) => write_completion(completion, output)?,
        None => match completion {
            Completion::Complete(result) => println!(
                "✓ {} estimated, {} unsuccessful. Pass `--output` to save the result document.",
                result.estimated_properties.len(),
                result.unsuccessful_properties.len()
            ),
            Completion::Errored(message) => {
                return Err(CliError::Other(anyhow::anyhow!(
                    "Estimation request errored: {}",
                    message
                )));
            }
            Completion::TimedOut | Completion::Cancelled => {
                return Err(CliError::Other(anyhow::anyhow!(
                    "Stopped waiting for request {}",
                    request_id
                )));
            }
        },
    }

    if args.release {
        info!("Releasing request {}", request_id);
        tokio::task::block_in_place(|| request.release())?;
        println!("Released request {}", request_id);
    }
    Ok(())
}
