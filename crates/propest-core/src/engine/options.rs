use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

pub const SIMULATION_LAYER: &str = "SimulationLayer";

#[derive(Debug, Error, PartialEq)]
pub enum OptionsError {
    #[error("No calculation layers were specified")]
    NoLayers,
    #[error("Calculation layer '{0}' is listed more than once")]
    DuplicateLayer(String),
    #[error(
        "Cannot register a schema for layer '{0}': it is not in the calculation layer list"
    )]
    UnlistedLayer(String),
    #[error("Layer '{layer}' still has schemas registered and cannot be removed from the list")]
    OrphanedSchemas { layer: String },
    #[error("Invalid schema for '{property_type}' in layer '{layer}': {reason}")]
    InvalidSchema {
        layer: String,
        property_type: String,
        reason: String,
    },
}

/// How a calculation layer should estimate one property type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationSchema {
    pub n_molecules: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub absolute_tolerance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_tolerance: Option<f64>,
    /// Engine-specific settings passed through untouched.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, serde_json::Value>,
}

impl CalculationSchema {
    /// The default simulation recipe: a box of `n_molecules` molecules, run to completion
    /// without a tolerance target.
    pub fn simulation(n_molecules: u32) -> Self {
        Self {
            n_molecules,
            absolute_tolerance: None,
            relative_tolerance: None,
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_absolute_tolerance(mut self, tolerance: f64) -> Self {
        self.absolute_tolerance = Some(tolerance);
        self
    }

    pub fn with_relative_tolerance(mut self, tolerance: f64) -> Self {
        self.relative_tolerance = Some(tolerance);
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }

    fn validate(&self) -> Result<(), String> {
        if self.n_molecules == 0 {
            return Err("n_molecules must be greater than zero".to_string());
        }
        if self.absolute_tolerance.is_some() && self.relative_tolerance.is_some() {
            return Err("only one of absolute and relative tolerance may be set".to_string());
        }
        for tolerance in [self.absolute_tolerance, self.relative_tolerance]
            .into_iter()
            .flatten()
        {
            if !(tolerance > 0.0) {
                return Err(format!("tolerance must be positive, got {}", tolerance));
            }
        }
        Ok(())
    }
}

/// Which calculation layers may estimate a dataset, in the order they are tried, and the
/// schema each layer uses per property type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestOptions {
    calculation_layers: Vec<String>,
    calculation_schemas: BTreeMap<String, BTreeMap<String, CalculationSchema>>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            calculation_layers: vec![SIMULATION_LAYER.to_string()],
            calculation_schemas: BTreeMap::new(),
        }
    }
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calculation_layers(&self) -> &[String] {
        &self.calculation_layers
    }

    /// Replaces the layer order. Fails if a layer appears twice, or if a layer that still has
    /// schemas registered would be dropped.
    pub fn set_calculation_layers<I, S>(&mut self, layers: I) -> Result<(), OptionsError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let layers: Vec<String> = layers.into_iter().map(Into::into).collect();
        for (i, layer) in layers.iter().enumerate() {
            if layers[..i].contains(layer) {
                return Err(OptionsError::DuplicateLayer(layer.clone()));
            }
        }
        if let Some(orphan) = self
            .calculation_schemas
            .keys()
            .find(|layer| !layers.contains(layer))
        {
            return Err(OptionsError::OrphanedSchemas {
                layer: orphan.clone(),
            });
        }
        self.calculation_layers = layers;
        Ok(())
    }

    pub fn add_schema(
        &mut self,
        layer: &str,
        property_type: &str,
        schema: CalculationSchema,
    ) -> Result<(), OptionsError> {
        if !self.calculation_layers.iter().any(|l| l == layer) {
            return Err(OptionsError::UnlistedLayer(layer.to_string()));
        }
        schema
            .validate()
            .map_err(|reason| OptionsError::InvalidSchema {
                layer: layer.to_string(),
                property_type: property_type.to_string(),
                reason,
            })?;
        self.calculation_schemas
            .entry(layer.to_string())
            .or_default()
            .insert(property_type.to_string(), schema);
        Ok(())
    }

    pub fn schema(&self, layer: &str, property_type: &str) -> Option<&CalculationSchema> {
        self.calculation_schemas
            .get(layer)
            .and_then(|schemas| schemas.get(property_type))
    }

    /// First layer, in declared order, that is accepted by `is_available` and has a schema
    /// registered for `property_type`.
    pub fn select_layer<F>(
        &self,
        property_type: &str,
        is_available: F,
    ) -> Option<(&str, &CalculationSchema)>
    where
        F: Fn(&str) -> bool,
    {
        self.calculation_layers
            .iter()
            .filter(|layer| is_available(layer))
            .find_map(|layer| {
                self.schema(layer, property_type).map(|schema| (layer.as_str(), schema))
            })
    }

    /// Re-checks every invariant. Options built through the methods above always pass; this
    /// guards options that arrive deserialized from elsewhere.
    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.calculation_layers.is_empty() {
            return Err(OptionsError::NoLayers);
        }
        for (i, layer) in self.calculation_layers.iter().enumerate() {
            if self.calculation_layers[..i].contains(layer) {
                return Err(OptionsError::DuplicateLayer(layer.clone()));
            }
        }
        for (layer, schemas) in &self.calculation_schemas {
            if !self.calculation_layers.contains(layer) {
                return Err(OptionsError::UnlistedLayer(layer.clone()));
            }
            for (property_type, schema) in schemas {
                schema
                    .validate()
                    .map_err(|reason| OptionsError::InvalidSchema {
                        layer: layer.clone(),
                        property_type: property_type.clone(),
                        reason,
                    })?;
            }
        }
        Ok(())
    }
}
