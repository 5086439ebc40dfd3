use super::error::TaskError;
use super::forcefield::ForceFieldSource;
use super::options::{CalculationSchema, SIMULATION_LAYER};
use super::resources::ComputeResources;
use crate::core::models::property::PhysicalProperty;
use crate::core::models::state::Quantity;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Everything a layer needs to estimate one property on one worker.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationJob<'a> {
    pub property: &'a PhysicalProperty,
    pub schema: &'a CalculationSchema,
    pub force_field: &'a ForceFieldSource,
    pub resources: &'a ComputeResources,
}

/// Raw numbers returned by a simulation engine for one property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    pub value: Quantity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uncertainty: Option<Quantity>,
}

/// A named strategy for estimating properties.
///
/// Layers run on backend workers, so implementations must be shareable across threads.
/// The returned property must keep the identifier of `job.property`.
pub trait CalculationLayer: Send + Sync {
    fn name(&self) -> &str;

    fn execute(&self, job: &SimulationJob<'_>) -> Result<PhysicalProperty, TaskError>;
}

/// The thing that actually runs molecular simulations. Kept separate from the layer so the
/// orchestration can be driven by any engine, including test doubles.
pub trait SimulationEngine: Send + Sync {
    fn estimate(&self, job: &SimulationJob<'_>) -> Result<Estimate, TaskError>;
}

/// Estimates properties by direct simulation through a [`SimulationEngine`].
pub struct SimulationLayer {
    engine: Arc<dyn SimulationEngine>,
}

impl SimulationLayer {
    pub fn new(engine: Arc<dyn SimulationEngine>) -> Self {
        Self { engine }
    }
}

impl CalculationLayer for SimulationLayer {
    fn name(&self) -> &str {
        SIMULATION_LAYER
    }

    fn execute(&self, job: &SimulationJob<'_>) -> Result<PhysicalProperty, TaskError> {
        let estimate = self.engine.estimate(job)?;
        if !estimate.value.value.is_finite() {
            return Err(TaskError::InvalidOutput(format!(
                "non-finite value {} for {}",
                estimate.value, job.property.property_type
            )));
        }
        Ok(job
            .property
            .estimated(SIMULATION_LAYER, estimate.value, estimate.uncertainty))
    }
}

/// The calculation layers a server can dispatch to, keyed by name.
#[derive(Clone, Default)]
pub struct LayerRegistry {
    layers: HashMap<String, Arc<dyn CalculationLayer>>,
}

impl LayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a layer under its own name, replacing any layer of the same name.
    pub fn register(&mut self, layer: Arc<dyn CalculationLayer>) -> &mut Self {
        self.layers.insert(layer.name().to_string(), layer);
        self
    }

    pub fn with_layer(mut self, layer: Arc<dyn CalculationLayer>) -> Self {
        self.register(layer);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn CalculationLayer>> {
        self.layers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.layers.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.layers.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl std::fmt::Debug for LayerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("LayerRegistry")
            .field("layers", &names)
            .finish()
    }
}
