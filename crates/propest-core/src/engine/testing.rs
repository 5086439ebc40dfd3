//! Fixtures shared by the engine and workflow tests.

use super::backend::ComputeBackend;
use super::config::BackendConfigBuilder;
use super::error::TaskError;
use super::layers::{Estimate, LayerRegistry, SimulationEngine, SimulationJob, SimulationLayer};
use super::options::{CalculationSchema, RequestOptions, SIMULATION_LAYER};
use super::resources::ComputeResources;
use crate::core::models::dataset::PhysicalPropertyDataSet;
use crate::core::models::property::{MeasurementSource, PhysicalProperty, PropertyPhase};
use crate::core::models::state::{Quantity, ThermodynamicState};
use crate::core::models::substance::Substance;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Returns the experimental value scaled by 1.01, or misbehaves for chosen SMILES.
#[derive(Default)]
pub struct MockEngine {
    panic_on: Option<String>,
    fail_on: Option<String>,
    delay: Option<Duration>,
    gate: Option<Mutex<mpsc::Receiver<()>>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn panicking_on(mut self, smiles: &str) -> Self {
        self.panic_on = Some(smiles.to_string());
        self
    }

    pub fn failing_on(mut self, smiles: &str) -> Self {
        self.fail_on = Some(smiles.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every estimate blocks until a message arrives on the returned sender.
    pub fn gated() -> (Self, mpsc::Sender<()>) {
        let (sender, receiver) = mpsc::channel();
        (
            Self {
                gate: Some(Mutex::new(receiver)),
                ..Self::default()
            },
            sender,
        )
    }
}

impl SimulationEngine for MockEngine {
    fn estimate(&self, job: &SimulationJob<'_>) -> Result<Estimate, TaskError> {
        if let Some(gate) = &self.gate {
            let _ = gate.lock().unwrap().recv();
        }
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        let smiles: Vec<&str> = job.property.substance.smiles().collect();
        let hit = |t: &Option<String>| t.as_deref().is_some_and(|s| smiles.contains(&s));
        if hit(&self.panic_on) {
            panic!("integrator blew up");
        }
        if hit(&self.fail_on) {
            return Err(TaskError::SimulationFailed("equilibration did not converge".into()));
        }
        let unit = job.property.value.unit.clone();
        Ok(Estimate {
            value: Quantity::new(job.property.value.value * 1.01, unit.clone()),
            uncertainty: Some(Quantity::new(0.001, unit)),
        })
    }
}

pub fn layers(engine: MockEngine) -> LayerRegistry {
    LayerRegistry::new().with_layer(Arc::new(SimulationLayer::new(Arc::new(engine))))
}

pub fn started_backend(workers: usize) -> Arc<ComputeBackend> {
    let backend = ComputeBackend::new(
        BackendConfigBuilder::new()
            .number_of_workers(workers)
            .resources_per_worker(ComputeResources::default())
            .build()
            .unwrap(),
    );
    backend.start().unwrap();
    Arc::new(backend)
}

pub fn density(smiles: &str, value: f64) -> PhysicalProperty {
    PhysicalProperty::new(
        "Density",
        ThermodynamicState::at_standard_pressure(298.15),
        Substance::pure(smiles),
        PropertyPhase::LIQUID,
        Quantity::new(value, "g / ml"),
        MeasurementSource::doi("10.1016/j.fluid.2013.10.034"),
    )
}

pub fn enthalpy_of_mixing(value: f64) -> PhysicalProperty {
    PhysicalProperty::new(
        "EnthalpyOfMixing",
        ThermodynamicState::at_standard_pressure(298.15),
        Substance::mixture([("CCO", 0.5), ("O", 0.5)]),
        PropertyPhase::LIQUID,
        Quantity::new(value, "kJ / mol"),
        MeasurementSource::doi("10.1021/je1013476"),
    )
}

pub fn osmotic_coefficient() -> PhysicalProperty {
    PhysicalProperty::new(
        "OsmoticCoefficient",
        ThermodynamicState::at_standard_pressure(298.15),
        Substance::mixture([("[Na+]", 0.01), ("[Cl-]", 0.01), ("O", 0.98)]),
        PropertyPhase::LIQUID,
        Quantity::new(0.93, ""),
        MeasurementSource::doi("10.1021/je00010a020"),
    )
}

pub fn density_and_mixing() -> PhysicalPropertyDataSet {
    PhysicalPropertyDataSet::from_properties([density("CCO", 0.785), enthalpy_of_mixing(-0.75)])
        .unwrap()
}

pub fn simulation_options(property_types: &[&str]) -> RequestOptions {
    let mut options = RequestOptions::new();
    for property_type in property_types {
        options
            .add_schema(
                SIMULATION_LAYER,
                property_type,
                CalculationSchema::simulation(256),
            )
            .unwrap();
    }
    options
}
