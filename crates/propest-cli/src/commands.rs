pub mod compare;
pub mod estimate;
pub mod fetch;
pub mod filter;
pub mod merge;
pub mod serve;
pub mod submit;

use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use propest::core::io::json;
use propest::engine::client::{CancellationToken, Completion, Request};
use propest::engine::progress::{Progress, ProgressReporter};
use propest::engine::results::RequestResult;
use std::path::Path;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Cancels `token` on the first Ctrl-C. Abort the returned task once the wait is over.
fn cancel_on_interrupt(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, no longer waiting for the request.");
            token.cancel();
        }
    })
}

/// Polls a remote request until it finishes, rendering its progress.
fn await_request(
    request: &Request,
    polling_interval: Duration,
    timeout: Option<Duration>,
) -> Result<Completion> {
    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    reporter.report(Progress::PhaseStart {
        name: "Waiting for Request",
    });
    let mut task_started = false;
    let completion = tokio::task::block_in_place(|| {
        request.await_completion_with(polling_interval, timeout, |snapshot| {
            if !task_started {
                reporter.report(Progress::TaskStart {
                    total_steps: snapshot.progress.total as u64,
                });
                task_started = true;
            }
            reporter.report(Progress::TaskProgress {
                completed: snapshot.progress.completed as u64,
            });
            reporter.report(Progress::StatusUpdate {
                text: snapshot.status.to_string(),
            });
        })
    })?;
    if task_started {
        reporter.report(Progress::TaskFinish);
    }
    reporter.report(Progress::PhaseFinish);
    Ok(completion)
}

/// Writes the result document of a finished request. Anything other than a complete request
/// is returned as an error; an errored request still gets a document carrying its error.
fn write_completion(completion: Completion, output: &Path) -> Result<()> {
    match completion {
        Completion::Complete(result) => {
            json::write_document(output, &result)?;
            info!("Result document written to {:?}", output);
            println!(
                "✓ {} estimated, {} unsuccessful. Results written to: {}",
                result.estimated_properties.len(),
                result.unsuccessful_properties.len(),
                output.display()
            );
            for failure in &result.exceptions {
                warn!(
                    property = %failure.property_id,
                    layer = ?failure.layer,
                    kind = ?failure.kind,
                    "{}",
                    failure.message
                );
            }
            Ok(())
        }
        Completion::Errored(message) => {
            json::write_document(output, &RequestResult::errored(message.clone()))?;
            Err(CliError::Other(anyhow::anyhow!("Estimation request errored: {}", message)))
        }
        Completion::TimedOut => Err(CliError::Other(anyhow::anyhow!(
            "Timed out waiting for the estimation request"
        ))),
        Completion::Cancelled => Err(CliError::Other(anyhow::anyhow!(
            "Interrupted before the estimation request finished"
        ))),
    }
}

/// Writes the result document, then releases the request on the server. A complete request
/// whose document could not be written stays on the server so `fetch` can retrieve it.
fn save_and_release(request: Request, completion: Completion, output: &Path) -> Result<()> {
    let errored = matches!(completion, Completion::Errored(_));
    let finished = errored || matches!(completion, Completion::Complete(_));
    let written = write_completion(completion, output);

    if finished && (written.is_ok() || errored) {
        let request_id = request.id();
        match tokio::task::block_in_place(|| request.release()) {
            Ok(()) => info!("Released request {}", request_id),
            Err(e) => warn!("Could not release request {}: {}", request_id, e),
        }
    }
    written
}
