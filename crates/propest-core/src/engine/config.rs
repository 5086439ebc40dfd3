use super::resources::ComputeResources;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackendConfig {
    pub number_of_workers: usize,
    pub resources_per_worker: ComputeResources,
}

#[derive(Default)]
pub struct BackendConfigBuilder {
    number_of_workers: Option<usize>,
    resources_per_worker: Option<ComputeResources>,
}

impl BackendConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn number_of_workers(mut self, n: usize) -> Self {
        self.number_of_workers = Some(n);
        self
    }
    pub fn resources_per_worker(mut self, resources: ComputeResources) -> Self {
        self.resources_per_worker = Some(resources);
        self
    }

    pub fn build(self) -> Result<BackendConfig, ConfigError> {
        Ok(BackendConfig {
            number_of_workers: self
                .number_of_workers
                .ok_or(ConfigError::MissingParameter("number_of_workers"))?,
            resources_per_worker: self
                .resources_per_worker
                .ok_or(ConfigError::MissingParameter("resources_per_worker"))?,
        })
    }
}

pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";
pub const DEFAULT_SERVER_PORT: u16 = 8000;

/// Where the server listens. Without a port the server is reachable in-process only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: Option<u16>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            port: None,
        }
    }
}

impl ServerConfig {
    pub fn in_process() -> Self {
        Self::default()
    }

    pub fn listening(bind_address: impl Into<String>, port: u16) -> Self {
        Self {
            bind_address: bind_address.into(),
            port: Some(port),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EstimationConfig {
    pub backend: BackendConfig,
    pub polling_interval: Duration,
    pub timeout: Option<Duration>,
}

#[derive(Default)]
pub struct EstimationConfigBuilder {
    number_of_workers: Option<usize>,
    resources_per_worker: Option<ComputeResources>,
    polling_interval: Option<Duration>,
    timeout: Option<Duration>,
}

impl EstimationConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn number_of_workers(mut self, n: usize) -> Self {
        self.number_of_workers = Some(n);
        self
    }
    pub fn resources_per_worker(mut self, resources: ComputeResources) -> Self {
        self.resources_per_worker = Some(resources);
        self
    }
    pub fn polling_interval(mut self, interval: Duration) -> Self {
        self.polling_interval = Some(interval);
        self
    }
    /// Optional; without a timeout the workflow waits until the request finishes.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<EstimationConfig, ConfigError> {
        let backend = BackendConfigBuilder {
            number_of_workers: self.number_of_workers,
            resources_per_worker: self.resources_per_worker,
        }
        .build()?;
        Ok(EstimationConfig {
            backend,
            polling_interval: self
                .polling_interval
                .ok_or(ConfigError::MissingParameter("polling_interval"))?,
            timeout: self.timeout,
        })
    }
}
