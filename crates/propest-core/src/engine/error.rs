use thiserror::Error;

use super::config::ConfigError;
use super::options::OptionsError;
use super::protocol::ProtocolError;
use super::resources::ResourceError;
use crate::core::models::ids::RequestId;

/// Why a single task failed. Task errors never escape the task's own handle; the server turns
/// them into per-property failures.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TaskError {
    #[error("Simulation failed: {0}")]
    SimulationFailed(String),

    #[error("Simulation produced unusable output: {0}")]
    InvalidOutput(String),

    #[error("Worker fault while running task: {0}")]
    WorkerFault(String),

    #[error("Compute backend shut down before the task ran")]
    BackendShutdown,
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Compute backend is already running")]
    AlreadyStarted,

    #[error("Compute backend needs at least one worker")]
    NoWorkers,

    #[error("Compute backend is not accepting work")]
    NotRunning,

    #[error("Failed to build thread pool for worker {worker}: {message}")]
    ThreadPool { worker: usize, message: String },

    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown request: {0}")]
    UnknownRequest(RequestId),

    #[error("Server is already running")]
    AlreadyStarted,

    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },

    #[error("Listener failed: {0}")]
    Listener(std::io::Error),
}

/// Client-side failures. Request-level faults reported by the server are not errors here;
/// they surface as an errored request.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Invalid request options: {0}")]
    InvalidOptions(#[from] OptionsError),

    #[error("Cannot connect to evaluator server at {address}: {source}")]
    Connection {
        address: String,
        source: std::io::Error,
    },

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Server reported an error: {0}")]
    Server(String),

    #[error("Unknown request: {0}")]
    UnknownRequest(RequestId),

    #[error("Request {0} has failed: {1}")]
    Failed(RequestId, String),
}

/// Umbrella error for the workflows that drive the whole engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Resource error: {0}")]
    Resources(#[from] ResourceError),

    #[error("Options error: {0}")]
    Options(#[from] OptionsError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Server error: {0}")]
    Server(#[from] ServerError),

    #[error("Request error: {0}")]
    Request(#[from] RequestError),
}
