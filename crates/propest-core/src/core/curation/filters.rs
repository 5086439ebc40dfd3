use super::{DataSetFilter, FilterError};
use crate::core::models::property::PhysicalProperty;
use crate::core::registry::PropertyTypeRegistry;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterByPropertyTypesSchema {
    pub property_types: Vec<String>,
}

/// Keeps properties whose type is one of the listed types.
#[derive(Debug, Clone)]
pub struct FilterByPropertyTypes {
    property_types: HashSet<String>,
}

impl FilterByPropertyTypes {
    pub fn new(
        schema: FilterByPropertyTypesSchema,
        registry: &PropertyTypeRegistry,
    ) -> Result<Self, FilterError> {
        if schema.property_types.is_empty() {
            return Err(FilterError::EmptyList {
                filter: "property-types",
                what: "property types",
            });
        }
        if let Some(unknown) = schema
            .property_types
            .iter()
            .find(|name| !registry.contains(name))
        {
            return Err(FilterError::UnknownPropertyType(unknown.clone()));
        }
        Ok(Self {
            property_types: schema.property_types.into_iter().collect(),
        })
    }
}

impl DataSetFilter for FilterByPropertyTypes {
    fn name(&self) -> &'static str {
        "property-types"
    }

    fn retains(&self, property: &PhysicalProperty) -> bool {
        self.property_types.contains(&property.property_type)
    }
}

/// Inclusive range check shared by the temperature and pressure filters.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Bounds {
    minimum: Option<f64>,
    maximum: Option<f64>,
}

impl Bounds {
    fn new(
        filter: &'static str,
        minimum: Option<f64>,
        maximum: Option<f64>,
    ) -> Result<Self, FilterError> {
        match (minimum, maximum) {
            (None, None) => Err(FilterError::NoBounds { filter }),
            (Some(minimum), Some(maximum)) if minimum > maximum => {
                Err(FilterError::InvertedBounds {
                    filter,
                    minimum,
                    maximum,
                })
            }
            _ => Ok(Self { minimum, maximum }),
        }
    }

    fn contains(&self, value: f64) -> bool {
        self.minimum.is_none_or(|min| value >= min) && self.maximum.is_none_or(|max| value <= max)
    }
}

/// Temperatures in kelvin.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FilterByTemperatureSchema {
    pub minimum_temperature: Option<f64>,
    pub maximum_temperature: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct FilterByTemperature {
    bounds: Bounds,
}

impl FilterByTemperature {
    pub fn new(schema: FilterByTemperatureSchema) -> Result<Self, FilterError> {
        Ok(Self {
            bounds: Bounds::new(
                "temperature",
                schema.minimum_temperature,
                schema.maximum_temperature,
            )?,
        })
    }
}

impl DataSetFilter for FilterByTemperature {
    fn name(&self) -> &'static str {
        "temperature"
    }

    fn retains(&self, property: &PhysicalProperty) -> bool {
        self.bounds.contains(property.thermodynamic_state.temperature)
    }
}

/// Pressures in kilopascal.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FilterByPressureSchema {
    pub minimum_pressure: Option<f64>,
    pub maximum_pressure: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct FilterByPressure {
    bounds: Bounds,
}

impl FilterByPressure {
    pub fn new(schema: FilterByPressureSchema) -> Result<Self, FilterError> {
        Ok(Self {
            bounds: Bounds::new("pressure", schema.minimum_pressure, schema.maximum_pressure)?,
        })
    }
}

impl DataSetFilter for FilterByPressure {
    fn name(&self) -> &'static str {
        "pressure"
    }

    fn retains(&self, property: &PhysicalProperty) -> bool {
        self.bounds.contains(property.thermodynamic_state.pressure)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterBySmilesSchema {
    pub smiles_to_include: Vec<String>,
    pub smiles_to_exclude: Vec<String>,
    pub allow_partial_inclusion: bool,
}

/// Keeps or drops properties by the SMILES of their components.
///
/// With an include list, every component must be listed (or at least one, when
/// `allow_partial_inclusion` is set). With an exclude list, any listed component drops the
/// property.
#[derive(Debug, Clone)]
pub struct FilterBySmiles {
    include: HashSet<String>,
    exclude: HashSet<String>,
    allow_partial_inclusion: bool,
}

impl FilterBySmiles {
    pub fn new(schema: FilterBySmilesSchema) -> Result<Self, FilterError> {
        match (
            schema.smiles_to_include.is_empty(),
            schema.smiles_to_exclude.is_empty(),
        ) {
            (true, true) => Err(FilterError::EmptyList {
                filter: "smiles",
                what: "SMILES patterns",
            }),
            (false, false) => Err(FilterError::ConflictingSmilesLists),
            _ => Ok(Self {
                include: schema.smiles_to_include.into_iter().collect(),
                exclude: schema.smiles_to_exclude.into_iter().collect(),
                allow_partial_inclusion: schema.allow_partial_inclusion,
            }),
        }
    }
}

impl DataSetFilter for FilterBySmiles {
    fn name(&self) -> &'static str {
        "smiles"
    }

    fn retains(&self, property: &PhysicalProperty) -> bool {
        let mut smiles = property.substance.smiles();
        if !self.exclude.is_empty() {
            return !smiles.any(|s| self.exclude.contains(s));
        }
        if self.allow_partial_inclusion {
            smiles.any(|s| self.include.contains(s))
        } else {
            smiles.all(|s| self.include.contains(s))
        }
    }
}
