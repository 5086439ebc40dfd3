use super::error::TaskError;
use super::layers::{Estimate, SimulationEngine, SimulationJob};
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::{debug, warn};

/// A [`SimulationEngine`] backed by an external program.
///
/// Each job is written as one JSON document to the program's stdin and the program is expected
/// to print an [`Estimate`] as JSON on stdout. A non-zero exit status fails the property with
/// the program's stderr as the message. The worker's resources are also exported as
/// `PROPEST_NUM_THREADS`, `PROPEST_NUM_GPUS` and `PROPEST_GPU_TOOLKIT`.
#[derive(Debug, Clone)]
pub struct CommandEngine {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandEngine {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &std::path::Path {
        &self.program
    }
}

impl SimulationEngine for CommandEngine {
    fn estimate(&self, job: &SimulationJob<'_>) -> Result<Estimate, TaskError> {
        let input = serde_json::to_vec(job)
            .map_err(|e| TaskError::SimulationFailed(format!("cannot encode job: {}", e)))?;

        debug!(
            program = %self.program.display(),
            property = %job.property.id,
            "Launching simulation engine"
        );

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .env(
                "PROPEST_NUM_THREADS",
                job.resources.number_of_threads().to_string(),
            )
            .env(
                "PROPEST_NUM_GPUS",
                job.resources.number_of_gpus().to_string(),
            )
            .env(
                "PROPEST_GPU_TOOLKIT",
                job.resources.preferred_gpu_toolkit().to_string(),
            )
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                TaskError::SimulationFailed(format!(
                    "cannot launch '{}': {}",
                    self.program.display(),
                    e
                ))
            })?;

        let stdin = child.stdin.take().ok_or_else(|| {
            TaskError::SimulationFailed("failed to capture engine stdin".to_string())
        })?;
        let writer = std::thread::spawn(move || {
            let mut stdin = stdin;
            stdin.write_all(&input)
        });

        let output = child.wait_with_output().map_err(|e| {
            TaskError::SimulationFailed(format!("failed waiting for engine: {}", e))
        })?;

        match writer.join() {
            Ok(Ok(())) => {}
            // The engine may legitimately exit without reading all of its input.
            Ok(Err(e)) => warn!(error = %e, "Engine closed stdin early"),
            Err(_) => warn!("Engine stdin writer panicked"),
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(TaskError::SimulationFailed(format!(
                "engine exited with {}: {}",
                output.status, stderr
            )));
        }

        serde_json::from_slice(&output.stdout).map_err(|e| {
            TaskError::InvalidOutput(format!("engine output is not a valid estimate: {}", e))
        })
    }
}
