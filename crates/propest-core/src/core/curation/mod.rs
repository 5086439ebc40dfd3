//! # Curation Module
//!
//! Filters that reduce a dataset to the properties worth estimating. Each filter is applied
//! as a pure function: the input dataset is left as it was and a new dataset is returned,
//! so chains of filters can be replayed and compared.
//!
//! Filters are usually described declaratively with [`FilterSchema`] (for example from a
//! configuration file) and turned into concrete filters with [`FilterSchema::build`].

pub mod filters;

use crate::core::models::dataset::PhysicalPropertyDataSet;
use crate::core::models::property::PhysicalProperty;
use crate::core::registry::PropertyTypeRegistry;
use thiserror::Error;
use tracing::debug;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

pub use filters::{
    FilterByPressure, FilterByPressureSchema, FilterByPropertyTypes, FilterByPropertyTypesSchema,
    FilterBySmiles, FilterBySmilesSchema, FilterByTemperature, FilterByTemperatureSchema,
};

#[derive(Debug, Error, PartialEq)]
pub enum FilterError {
    #[error("Filter '{filter}' requires at least one bound")]
    NoBounds { filter: &'static str },
    #[error("Filter '{filter}' has minimum {minimum} greater than maximum {maximum}")]
    InvertedBounds {
        filter: &'static str,
        minimum: f64,
        maximum: f64,
    },
    #[error("Filter '{filter}' requires a non-empty list of {what}")]
    EmptyList {
        filter: &'static str,
        what: &'static str,
    },
    #[error("Only one of `smiles-to-include` and `smiles-to-exclude` may be given")]
    ConflictingSmilesLists,
    #[error("Unknown property type '{0}' in filter")]
    UnknownPropertyType(String),
}

pub trait DataSetFilter: Send + Sync {
    fn name(&self) -> &'static str;

    fn retains(&self, property: &PhysicalProperty) -> bool;

    fn apply(&self, data_set: &PhysicalPropertyDataSet) -> PhysicalPropertyDataSet {
        #[cfg(feature = "parallel")]
        let kept: Vec<usize> = data_set
            .properties()
            .par_iter()
            .enumerate()
            .filter(|(_, p)| self.retains(p))
            .map(|(i, _)| i)
            .collect();

        #[cfg(not(feature = "parallel"))]
        let kept: Vec<usize> = data_set
            .iter()
            .enumerate()
            .filter(|(_, p)| self.retains(p))
            .map(|(i, _)| i)
            .collect();

        let filtered = data_set.select_indices(&kept);
        debug!(
            filter = self.name(),
            before = data_set.len(),
            after = filtered.len(),
            "Applied data set filter."
        );
        filtered
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterSchema {
    PropertyTypes(FilterByPropertyTypesSchema),
    Temperature(FilterByTemperatureSchema),
    Pressure(FilterByPressureSchema),
    Smiles(FilterBySmilesSchema),
}

impl FilterSchema {
    pub fn build(
        self,
        registry: &PropertyTypeRegistry,
    ) -> Result<Box<dyn DataSetFilter>, FilterError> {
        Ok(match self {
            Self::PropertyTypes(schema) => Box::new(FilterByPropertyTypes::new(schema, registry)?),
            Self::Temperature(schema) => Box::new(FilterByTemperature::new(schema)?),
            Self::Pressure(schema) => Box::new(FilterByPressure::new(schema)?),
            Self::Smiles(schema) => Box::new(FilterBySmiles::new(schema)?),
        })
    }
}

/// Applies the filters in order, each to the output of the previous one.
pub fn apply_all(
    data_set: &PhysicalPropertyDataSet,
    filters: &[Box<dyn DataSetFilter>],
) -> PhysicalPropertyDataSet {
    filters
        .iter()
        .fold(data_set.clone(), |current, filter| filter.apply(&current))
}
