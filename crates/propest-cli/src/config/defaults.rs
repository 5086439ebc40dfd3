use propest::engine::config::{DEFAULT_BIND_ADDRESS, DEFAULT_SERVER_PORT};
use propest::engine::options::SIMULATION_LAYER;
use propest::engine::resources::GpuToolkit;

pub struct DefaultsConfig {
    pub number_of_workers: usize,
    pub threads_per_worker: usize,
    pub gpus_per_worker: usize,
    pub gpu_toolkit: GpuToolkit,
    pub polling_interval_secs: u64,
    pub bind_address: String,
    pub port: u16,
    pub calculation_layers: Vec<String>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            number_of_workers: 1,
            threads_per_worker: 1,
            gpus_per_worker: 0,
            gpu_toolkit: GpuToolkit::None,
            polling_interval_secs: 30,
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            port: DEFAULT_SERVER_PORT,
            calculation_layers: vec![SIMULATION_LAYER.to_string()],
        }
    }
}
