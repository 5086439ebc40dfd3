use crate::core::models::dataset::PhysicalPropertyDataSet;
use crate::core::models::property::{PhysicalProperty, PropertyPhase};
use phf::{Map, phf_map};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[rustfmt::skip]
static BUILTIN_PROPERTY_TYPES: Map<&'static str, (&'static str, &'static str)> = phf_map! {
    "Density"                => ("g / ml",        "Liquid"),
    "ExcessMolarVolume"      => ("cm ** 3 / mol", "Liquid"),
    "DielectricConstant"     => ("dimensionless", "Liquid"),
    "EnthalpyOfMixing"       => ("kJ / mol",      "Liquid"),
    "EnthalpyOfVaporization" => ("kJ / mol",      "Liquid + Gas"),
    "SolvationFreeEnergy"    => ("kJ / mol",      "Liquid + Gas"),
};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct PropertyTypeInfo {
    pub default_unit: String,
    pub supported_phases: PropertyPhase,
}

/// Known property types and what they accept.
///
/// Callers build one registry (usually [`PropertyTypeRegistry::with_builtins`]), register any
/// custom types, and pass it to whatever needs to validate property types.
#[derive(Debug, Clone, Default)]
pub struct PropertyTypeRegistry {
    registry: HashMap<String, PropertyTypeInfo>,
}

impl PropertyTypeRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let registry = BUILTIN_PROPERTY_TYPES
            .entries()
            .filter_map(|(name, (unit, phases))| {
                phases.parse().ok().map(|supported_phases| {
                    (
                        name.to_string(),
                        PropertyTypeInfo {
                            default_unit: unit.to_string(),
                            supported_phases,
                        },
                    )
                })
            })
            .collect();
        Self { registry }
    }

    /// Loads custom property types from a TOML table keyed by type name and adds them on top
    /// of the built-in types.
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let content = std::fs::read_to_string(path).map_err(|e| RegistryError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        let custom: HashMap<String, PropertyTypeInfo> =
            toml::from_str(&content).map_err(|e| RegistryError::Toml {
                path: path.to_string_lossy().to_string(),
                source: e,
            })?;

        let mut registry = Self::with_builtins();
        for (name, info) in custom {
            registry.register(name, info.default_unit, info.supported_phases)?;
        }
        Ok(registry)
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        default_unit: impl Into<String>,
        supported_phases: PropertyPhase,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if self.registry.contains_key(&name) {
            return Err(RegistryError::AlreadyRegistered(name));
        }
        if supported_phases.is_undefined() {
            return Err(RegistryError::NoSupportedPhases(name));
        }
        self.registry.insert(
            name,
            PropertyTypeInfo {
                default_unit: default_unit.into(),
                supported_phases,
            },
        );
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&PropertyTypeInfo> {
        self.registry.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.registry.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.registry.keys().map(String::as_str)
    }

    pub fn validate_property(&self, property: &PhysicalProperty) -> Result<(), RegistryError> {
        let info = self
            .get(&property.property_type)
            .ok_or_else(|| RegistryError::UnknownType(property.property_type.clone()))?;
        if !info.supported_phases.contains(property.phase) {
            return Err(RegistryError::UnsupportedPhase {
                property_type: property.property_type.clone(),
                phase: property.phase,
            });
        }
        Ok(())
    }

    pub fn validate_data_set(
        &self,
        data_set: &PhysicalPropertyDataSet,
    ) -> Result<(), RegistryError> {
        data_set.iter().try_for_each(|p| self.validate_property(p))
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Unknown property type '{0}'. Register it before use.")]
    UnknownType(String),
    #[error("Property type '{0}' is already registered")]
    AlreadyRegistered(String),
    #[error("Property type '{0}' must support at least one phase")]
    NoSupportedPhases(String),
    #[error("Property type '{property_type}' does not support phase '{phase}'")]
    UnsupportedPhase {
        property_type: String,
        phase: PropertyPhase,
    },
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
}
