mod defaults;

use crate::cli::{BackendOverrides, EstimateArgs, ServeArgs};
use crate::error::{CliError, Result};
use defaults::DefaultsConfig;
use propest::core::curation::{
    DataSetFilter, FilterByPressureSchema, FilterByPropertyTypesSchema, FilterBySmilesSchema,
    FilterByTemperatureSchema, FilterSchema,
};
use propest::core::registry::PropertyTypeRegistry;
use propest::engine::command::CommandEngine;
use propest::engine::config::{self as core_config, BackendConfig, EstimationConfig, ServerConfig};
use propest::engine::options::{CalculationSchema, RequestOptions, SIMULATION_LAYER};
use propest::engine::resources::{ComputeResources, GpuToolkit};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
struct PartialBackendConfig {
    workers: Option<usize>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
struct PartialResourcesConfig {
    threads: Option<usize>,
    gpus: Option<usize>,
    #[serde(rename = "gpu-toolkit")]
    gpu_toolkit: Option<GpuToolkit>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
struct PartialServerConfig {
    address: Option<String>,
    port: Option<u16>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
struct PartialEngineConfig {
    command: Option<PathBuf>,
    #[serde(default)]
    args: Vec<String>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
struct PartialEstimationConfig {
    #[serde(rename = "polling-interval")]
    polling_interval: Option<u64>,
    timeout: Option<u64>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
struct PartialSchemaConfig {
    layer: Option<String>,
    #[serde(rename = "property-type")]
    property_type: String,
    #[serde(rename = "n-molecules")]
    n_molecules: u32,
    #[serde(rename = "absolute-tolerance")]
    absolute_tolerance: Option<f64>,
    #[serde(rename = "relative-tolerance")]
    relative_tolerance: Option<f64>,
    #[serde(default)]
    parameters: BTreeMap<String, serde_json::Value>,
}

impl From<PartialSchemaConfig> for CalculationSchema {
    fn from(p: PartialSchemaConfig) -> Self {
        let mut schema = CalculationSchema::simulation(p.n_molecules);
        schema.absolute_tolerance = p.absolute_tolerance;
        schema.relative_tolerance = p.relative_tolerance;
        schema.parameters = p.parameters;
        schema
    }
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
struct PartialOptionsConfig {
    layers: Option<Vec<String>>,
    #[serde(default)]
    schemas: Vec<PartialSchemaConfig>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case", tag = "type")]
enum PartialFilterConfig {
    PropertyTypes {
        #[serde(rename = "property-types")]
        property_types: Vec<String>,
    },
    Temperature {
        minimum: Option<f64>,
        maximum: Option<f64>,
    },
    Pressure {
        minimum: Option<f64>,
        maximum: Option<f64>,
    },
    Smiles {
        #[serde(rename = "smiles-to-include", default)]
        smiles_to_include: Vec<String>,
        #[serde(rename = "smiles-to-exclude", default)]
        smiles_to_exclude: Vec<String>,
        #[serde(rename = "allow-partial-inclusion", default)]
        allow_partial_inclusion: bool,
    },
}

impl From<PartialFilterConfig> for FilterSchema {
    fn from(p: PartialFilterConfig) -> Self {
        match p {
            PartialFilterConfig::PropertyTypes { property_types } => {
                FilterSchema::PropertyTypes(FilterByPropertyTypesSchema { property_types })
            }
            PartialFilterConfig::Temperature { minimum, maximum } => {
                FilterSchema::Temperature(FilterByTemperatureSchema {
                    minimum_temperature: minimum,
                    maximum_temperature: maximum,
                })
            }
            PartialFilterConfig::Pressure { minimum, maximum } => {
                FilterSchema::Pressure(FilterByPressureSchema {
                    minimum_pressure: minimum,
                    maximum_pressure: maximum,
                })
            }
            PartialFilterConfig::Smiles {
                smiles_to_include,
                smiles_to_exclude,
                allow_partial_inclusion,
            } => FilterSchema::Smiles(FilterBySmilesSchema {
                smiles_to_include,
                smiles_to_exclude,
                allow_partial_inclusion,
            }),
        }
    }
}

/// The configuration file as written by the user: every section optional, unknown keys
/// rejected. Merging with the command line fills the gaps from [`DefaultsConfig`].
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct PartialConfig {
    registry: Option<PathBuf>,
    backend: Option<PartialBackendConfig>,
    resources: Option<PartialResourcesConfig>,
    server: Option<PartialServerConfig>,
    engine: Option<PartialEngineConfig>,
    estimation: Option<PartialEstimationConfig>,
    options: Option<PartialOptionsConfig>,
    #[serde(default)]
    filters: Vec<PartialFilterConfig>,
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

/// Everything `estimate` needs once file, flags and defaults are merged.
pub struct EstimateSettings {
    pub estimation: EstimationConfig,
    pub options: RequestOptions,
    pub engine: CommandEngine,
    pub registry: PropertyTypeRegistry,
}

/// Everything `serve` needs once file, flags and defaults are merged.
pub struct ServeSettings {
    pub backend: BackendConfig,
    pub server: ServerConfig,
    pub engine: CommandEngine,
}

impl PartialConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        let mut config: Self = toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    pub fn merge_with_estimate_args(mut self, args: &EstimateArgs) -> Result<EstimateSettings> {
        self.apply_set_values(&args.set_values)?;
        let defaults = DefaultsConfig::default();
        let estimation_config = self.estimation.clone().unwrap_or_default();

        let backend = self.backend_config(&args.backend, &defaults)?;
        let polling_interval = args
            .polling_interval
            .or(estimation_config.polling_interval)
            .unwrap_or(defaults.polling_interval_secs);
        if polling_interval == 0 {
            return Err(CliError::Config(
                "`estimation.polling-interval` must be at least one second.".to_string(),
            ));
        }

        let mut builder = core_config::EstimationConfigBuilder::new()
            .number_of_workers(backend.number_of_workers)
            .resources_per_worker(backend.resources_per_worker)
            .polling_interval(Duration::from_secs(polling_interval));
        if let Some(timeout) = args.timeout.or(estimation_config.timeout) {
            builder = builder.timeout(Duration::from_secs(timeout));
        }
        let estimation = builder
            .build()
            .map_err(|e| CliError::Config(e.to_string()))?;

        Ok(EstimateSettings {
            estimation,
            options: self.request_options()?,
            engine: self.simulation_engine(args.backend.engine.as_deref())?,
            registry: self.registry(args.registry.as_deref())?,
        })
    }

    pub fn merge_with_serve_args(mut self, args: &ServeArgs) -> Result<ServeSettings> {
        self.apply_set_values(&args.set_values)?;
        let defaults = DefaultsConfig::default();
        let server_config = self.server.clone().unwrap_or_default();

        let server = ServerConfig::listening(
            args.bind
                .clone()
                .or(server_config.address)
                .unwrap_or(defaults.bind_address.clone()),
            args.port.or(server_config.port).unwrap_or(defaults.port),
        );

        Ok(ServeSettings {
            backend: self.backend_config(&args.backend, &defaults)?,
            server,
            engine: self.simulation_engine(args.backend.engine.as_deref())?,
        })
    }

    /// Builds the request options from the `[options]` section. Without an explicit layer
    /// list the default simulation layer is used; schemas without a `layer` key belong to it.
    pub fn request_options(&self) -> Result<RequestOptions> {
        let defaults = DefaultsConfig::default();
        let partial = self.options.clone().unwrap_or_default();
        let config_error = |e: propest::engine::options::OptionsError| {
            CliError::Config(format!("Invalid `[options]` section: {}", e))
        };

        let mut options = RequestOptions::new();
        options
            .set_calculation_layers(partial.layers.unwrap_or(defaults.calculation_layers))
            .map_err(config_error)?;

        if partial.schemas.is_empty() {
            warn!("No calculation schemas configured; every property will be unsuccessful.");
        }
        for schema in partial.schemas {
            let layer = schema
                .layer
                .clone()
                .unwrap_or_else(|| SIMULATION_LAYER.to_string());
            let property_type = schema.property_type.clone();
            options
                .add_schema(&layer, &property_type, schema.into())
                .map_err(config_error)?;
        }

        options.validate().map_err(config_error)?;
        Ok(options)
    }

    /// The built-in property types plus those of the registry file, if one is configured.
    /// A registry path in the file is resolved against the file's directory.
    pub fn registry(&self, cli_override: Option<&Path>) -> Result<PropertyTypeRegistry> {
        let path = match cli_override {
            Some(path) => Some(path.to_path_buf()),
            None => self.registry.as_ref().map(|path| self.resolve(path)),
        };
        match path {
            Some(path) => {
                debug!("Loading property type registry from {:?}", path);
                Ok(PropertyTypeRegistry::load(&path)?)
            }
            None => Ok(PropertyTypeRegistry::with_builtins()),
        }
    }

    pub fn filters(&self, registry: &PropertyTypeRegistry) -> Result<Vec<Box<dyn DataSetFilter>>> {
        if self.filters.is_empty() {
            warn!("No `[[filters]]` configured; the dataset will be copied unchanged.");
        }
        self.filters
            .iter()
            .cloned()
            .map(|filter| {
                FilterSchema::from(filter)
                    .build(registry)
                    .map_err(CliError::from)
            })
            .collect()
    }

    fn backend_config(
        &self,
        overrides: &BackendOverrides,
        defaults: &DefaultsConfig,
    ) -> Result<BackendConfig> {
        let backend_config = self.backend.clone().unwrap_or_default();
        let resources_config = self.resources.clone().unwrap_or_default();

        let resources = ComputeResources::new(
            overrides
                .threads_per_worker
                .or(resources_config.threads)
                .unwrap_or(defaults.threads_per_worker),
            overrides
                .gpus_per_worker
                .or(resources_config.gpus)
                .unwrap_or(defaults.gpus_per_worker),
            resources_config.gpu_toolkit.unwrap_or(defaults.gpu_toolkit),
        )
        .map_err(|e| CliError::Config(format!("Invalid `[resources]` section: {}", e)))?;

        core_config::BackendConfigBuilder::new()
            .number_of_workers(
                overrides
                    .workers
                    .or(backend_config.workers)
                    .unwrap_or(defaults.number_of_workers),
            )
            .resources_per_worker(resources)
            .build()
            .map_err(|e| CliError::Config(e.to_string()))
    }

    fn simulation_engine(&self, cli_override: Option<&Path>) -> Result<CommandEngine> {
        let engine_config = self.engine.clone().unwrap_or_default();
        let command = cli_override
            .map(Path::to_path_buf)
            .or(engine_config.command)
            .ok_or_else(|| CliError::Config("`engine.command` is required.".to_string()))?;
        Ok(CommandEngine::new(command).with_args(engine_config.args))
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let (key, value_str) = kv_pair.split_once('=').ok_or_else(|| {
                CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                ))
            })?;

            match key {
                "registry" => self.registry = Some(PathBuf::from(value_str)),
                "backend.workers" => {
                    self.backend.get_or_insert_with(Default::default).workers =
                        Some(parse_set_value(key, value_str, "integer")?);
                }
                "resources.threads" => {
                    self.resources.get_or_insert_with(Default::default).threads =
                        Some(parse_set_value(key, value_str, "integer")?);
                }
                "resources.gpus" => {
                    self.resources.get_or_insert_with(Default::default).gpus =
                        Some(parse_set_value(key, value_str, "integer")?);
                }
                "resources.gpu-toolkit" => {
                    self.resources
                        .get_or_insert_with(Default::default)
                        .gpu_toolkit = Some(parse_gpu_toolkit(key, value_str)?);
                }
                "server.address" => {
                    self.server.get_or_insert_with(Default::default).address =
                        Some(value_str.to_string());
                }
                "server.port" => {
                    self.server.get_or_insert_with(Default::default).port =
                        Some(parse_set_value(key, value_str, "port")?);
                }
                "engine.command" => {
                    self.engine.get_or_insert_with(Default::default).command =
                        Some(PathBuf::from(value_str));
                }
                "estimation.polling-interval" => {
                    self.estimation
                        .get_or_insert_with(Default::default)
                        .polling_interval = Some(parse_set_value(key, value_str, "integer")?);
                }
                "estimation.timeout" => {
                    self.estimation.get_or_insert_with(Default::default).timeout =
                        Some(parse_set_value(key, value_str, "integer")?);
                }
                "options.layers" => {
                    self.options.get_or_insert_with(Default::default).layers = Some(
                        value_str
                            .split(',')
                            .map(str::trim)
                            .filter(|layer| !layer.is_empty())
                            .map(str::to_string)
                            .collect(),
                    );
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }
}

fn parse_set_value<T: FromStr>(key: &str, value_str: &str, kind: &str) -> Result<T> {
    value_str.parse().map_err(|_| {
        CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value_str))
    })
}

fn parse_gpu_toolkit(key: &str, value_str: &str) -> Result<GpuToolkit> {
    match value_str.to_ascii_lowercase().as_str() {
        "none" => Ok(GpuToolkit::None),
        "cuda" => Ok(GpuToolkit::Cuda),
        "opencl" => Ok(GpuToolkit::OpenCl),
        _ => Err(CliError::Config(format!(
            "Invalid GPU toolkit for {}: {} (expected none, cuda or opencl)",
            key, value_str
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use once_cell::sync::Lazy;
    use std::fs;
    use tempfile::{TempDir, tempdir};

    static TEST_DIR: Lazy<TempDir> = Lazy::new(|| tempdir().expect("Failed to create temp dir"));

    const BASE_CONFIG: &str = r#"
        [engine]
        command = "run-simulation"
        args = ["--platform", "CPU"]

        [[options.schemas]]
        property-type = "Density"
        n-molecules = 1000

        [[options.schemas]]
        property-type = "EnthalpyOfMixing"
        n-molecules = 2000
        relative-tolerance = 0.1
        parameters = { equilibration-steps = 50000 }
        "#;

    fn write_config_file(name: &str, content: &str) -> PathBuf {
        let file_path = TEST_DIR.path().join(name);
        fs::write(&file_path, content).unwrap();
        file_path
    }

    fn estimate_args(config_path: &Path, extra: &[&str]) -> EstimateArgs {
        let mut args = vec![
            "propest".to_string(),
            "estimate".to_string(),
            "-i".to_string(),
            "data.json".to_string(),
            "-o".to_string(),
            "results.json".to_string(),
            "-f".to_string(),
            "openff-2.0.0.offxml".to_string(),
            "-c".to_string(),
            config_path.to_str().unwrap().to_string(),
        ];
        args.extend(extra.iter().map(|s| s.to_string()));
        match Cli::parse_from(args).command {
            Commands::Estimate(args) => args,
            _ => panic!("Expected 'estimate' subcommand"),
        }
    }

    #[test]
    fn file_values_are_completed_with_defaults() {
        let config_path = write_config_file("estimate_defaults.toml", BASE_CONFIG);
        let args = estimate_args(&config_path, &[]);

        let settings = PartialConfig::from_file(&config_path)
            .unwrap()
            .merge_with_estimate_args(&args)
            .unwrap();

        assert_eq!(settings.estimation.backend.number_of_workers, 1);
        assert_eq!(
            settings
                .estimation
                .backend
                .resources_per_worker
                .number_of_threads(),
            1
        );
        assert_eq!(
            settings.estimation.polling_interval,
            Duration::from_secs(30)
        );
        assert_eq!(settings.estimation.timeout, None);
        assert_eq!(settings.options.calculation_layers(), [SIMULATION_LAYER]);

        let density = settings
            .options
            .schema(SIMULATION_LAYER, "Density")
            .unwrap();
        assert_eq!(density.n_molecules, 1000);
        let mixing = settings
            .options
            .schema(SIMULATION_LAYER, "EnthalpyOfMixing")
            .unwrap();
        assert_eq!(mixing.relative_tolerance, Some(0.1));
        assert_eq!(
            mixing.parameters.get("equilibration-steps"),
            Some(&serde_json::json!(50000))
        );
        assert_eq!(settings.engine.program(), Path::new("run-simulation"));
        assert!(settings.registry.contains("Density"));
    }

    #[test]
    fn cli_args_override_file_values() {
        let content = format!(
            "{}\n[backend]\nworkers = 2\n\n[resources]\nthreads = 4\n\n[estimation]\ntimeout = 10\n",
            BASE_CONFIG
        );
        let config_path = write_config_file("estimate_override.toml", &content);
        let args = estimate_args(
            &config_path,
            &["-w", "8", "--timeout", "60", "-e", "/opt/engine/bin/simulate"],
        );

        let settings = PartialConfig::from_file(&config_path)
            .unwrap()
            .merge_with_estimate_args(&args)
            .unwrap();

        assert_eq!(settings.estimation.backend.number_of_workers, 8);
        assert_eq!(
            settings
                .estimation
                .backend
                .resources_per_worker
                .number_of_threads(),
            4
        );
        assert_eq!(settings.estimation.timeout, Some(Duration::from_secs(60)));
        assert_eq!(
            settings.engine.program(),
            Path::new("/opt/engine/bin/simulate")
        );
    }

    #[test]
    fn set_values_override_file_and_defaults() {
        let content = format!("{}\n[backend]\nworkers = 2\n", BASE_CONFIG);
        let config_path = write_config_file("estimate_set.toml", &content);
        let args = estimate_args(
            &config_path,
            &[
                "-S",
                "backend.workers=3",
                "-S",
                "resources.gpus=1",
                "-S",
                "resources.gpu-toolkit=cuda",
                "-S",
                "options.layers=SimulationLayer, ReweightingLayer",
                "-S",
                "estimation.polling-interval=5",
            ],
        );

        let settings = PartialConfig::from_file(&config_path)
            .unwrap()
            .merge_with_estimate_args(&args)
            .unwrap();

        let resources = &settings.estimation.backend.resources_per_worker;
        assert_eq!(settings.estimation.backend.number_of_workers, 3);
        assert_eq!(resources.number_of_gpus(), 1);
        assert_eq!(resources.preferred_gpu_toolkit(), GpuToolkit::Cuda);
        assert_eq!(
            settings.options.calculation_layers(),
            ["SimulationLayer", "ReweightingLayer"]
        );
        assert_eq!(settings.estimation.polling_interval, Duration::from_secs(5));
    }

    #[test]
    fn missing_engine_command_is_a_config_error() {
        let config_path = write_config_file(
            "estimate_no_engine.toml",
            "[[options.schemas]]\nproperty-type = \"Density\"\nn-molecules = 1000\n",
        );
        let args = estimate_args(&config_path, &[]);

        let result = PartialConfig::from_file(&config_path)
            .unwrap()
            .merge_with_estimate_args(&args);
        match result {
            Err(CliError::Config(msg)) => assert!(msg.contains("engine.command")),
            other => panic!("Expected a configuration error, got {:?}", other.err()),
        }
    }

    #[test]
    fn schema_with_both_tolerances_is_rejected() {
        let config_path = write_config_file(
            "options_tolerances.toml",
            r#"
            [[options.schemas]]
            property-type = "Density"
            n-molecules = 1000
            absolute-tolerance = 0.001
            relative-tolerance = 0.1
            "#,
        );
        let result = PartialConfig::from_file(&config_path)
            .unwrap()
            .request_options();
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn schema_for_an_unlisted_layer_is_rejected() {
        let config_path = write_config_file(
            "options_unlisted.toml",
            r#"
            [options]
            layers = ["SimulationLayer"]

            [[options.schemas]]
            layer = "ReweightingLayer"
            property-type = "Density"
            n-molecules = 1000
            "#,
        );
        let result = PartialConfig::from_file(&config_path)
            .unwrap()
            .request_options();
        match result {
            Err(CliError::Config(msg)) => assert!(msg.contains("ReweightingLayer")),
            other => panic!("Expected a configuration error, got {:?}", other.err()),
        }
    }

    #[test]
    fn gpu_without_toolkit_is_rejected() {
        let content = format!("{}\n[resources]\ngpus = 2\n", BASE_CONFIG);
        let config_path = write_config_file("resources_gpu.toml", &content);
        let args = estimate_args(&config_path, &[]);

        let result = PartialConfig::from_file(&config_path)
            .unwrap()
            .merge_with_estimate_args(&args);
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn serve_args_override_server_section() {
        let content = format!(
            "{}\n[server]\naddress = \"0.0.0.0\"\nport = 9000\n",
            BASE_CONFIG
        );
        let config_path = write_config_file("serve.toml", &content);
        let cli = Cli::parse_from([
            "propest",
            "serve",
            "-c",
            config_path.to_str().unwrap(),
            "--port",
            "9100",
        ]);
        let Commands::Serve(args) = cli.command else {
            panic!("Expected 'serve' subcommand");
        };

        let settings = PartialConfig::from_file(&config_path)
            .unwrap()
            .merge_with_serve_args(&args)
            .unwrap();
        assert_eq!(settings.server.bind_address, "0.0.0.0");
        assert_eq!(settings.server.port, Some(9100));
        assert_eq!(settings.backend.number_of_workers, 1);
    }

    #[test]
    fn filters_are_built_in_order_against_the_registry() {
        let config_path = write_config_file(
            "filters.toml",
            r#"
            [[filters]]
            type = "property-types"
            property-types = ["Density", "EnthalpyOfMixing"]

            [[filters]]
            type = "temperature"
            minimum = 290.0
            maximum = 320.0

            [[filters]]
            type = "smiles"
            smiles-to-exclude = ["O"]
            "#,
        );
        let config = PartialConfig::from_file(&config_path).unwrap();
        let registry = config.registry(None).unwrap();
        let filters = config.filters(&registry).unwrap();

        let names: Vec<&str> = filters.iter().map(|f| f.name()).collect();
        assert_eq!(names, ["property-types", "temperature", "smiles"]);
    }

    #[test]
    fn unknown_property_type_in_filter_is_rejected() {
        let config_path = write_config_file(
            "filters_unknown.toml",
            "[[filters]]\ntype = \"property-types\"\nproperty-types = [\"Viscosity\"]\n",
        );
        let config = PartialConfig::from_file(&config_path).unwrap();
        let result = config.filters(&PropertyTypeRegistry::with_builtins());
        assert!(matches!(result, Err(CliError::Filter(_))));
    }

    #[test]
    fn registry_path_is_resolved_against_the_config_directory() {
        let registry_dir = TEST_DIR.path().join("registry_case");
        fs::create_dir_all(&registry_dir).unwrap();
        fs::write(
            registry_dir.join("types.toml"),
            "[Viscosity]\ndefault-unit = \"mPa * s\"\nsupported-phases = \"Liquid\"\n",
        )
        .unwrap();
        let config_path = registry_dir.join("config.toml");
        fs::write(&config_path, "registry = \"types.toml\"\n").unwrap();

        let registry = PartialConfig::from_file(&config_path)
            .unwrap()
            .registry(None)
            .unwrap();
        assert!(registry.contains("Viscosity"));
        assert!(registry.contains("Density"));
    }

    #[test]
    fn unknown_keys_fail_to_parse() {
        let config_path = write_config_file("unknown_key.toml", "[backend]\nworkerz = 2\n");
        let result = PartialConfig::from_file(&config_path);
        assert!(matches!(result, Err(CliError::FileParsing { .. })));
    }

    #[test]
    fn malformed_set_values_are_rejected() {
        let config_path = write_config_file("set_errors.toml", BASE_CONFIG);

        for bad in ["backend.workers", "backend.workers=many", "backend.colour=red"] {
            let args = estimate_args(&config_path, &["-S", bad]);
            let result = PartialConfig::from_file(&config_path)
                .unwrap()
                .merge_with_estimate_args(&args);
            assert!(
                matches!(result, Err(CliError::Config(_))),
                "'{}' should be rejected",
                bad
            );
        }
    }
}
