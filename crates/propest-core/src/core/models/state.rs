use serde::{Deserialize, Serialize};
use std::fmt;

/// A magnitude tagged with its unit.
///
/// Units are carried verbatim as written by the data source (e.g. `"g / ml"`); conversion
/// between units is left to external tooling, so two quantities are only comparable when
/// their unit strings match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    pub value: f64,
    pub unit: String,
}

impl Quantity {
    pub fn new(value: f64, unit: impl Into<String>) -> Self {
        Self {
            value,
            unit: unit.into(),
        }
    }

    pub fn same_unit(&self, other: &Quantity) -> bool {
        self.unit == other.unit
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.unit)
    }
}

/// Temperature in kelvin and pressure in kilopascal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThermodynamicState {
    pub temperature: f64,
    pub pressure: f64,
}

pub const STANDARD_PRESSURE_KPA: f64 = 101.325;

impl ThermodynamicState {
    pub fn new(temperature: f64, pressure: f64) -> Self {
        Self {
            temperature,
            pressure,
        }
    }

    pub fn at_standard_pressure(temperature: f64) -> Self {
        Self::new(temperature, STANDARD_PRESSURE_KPA)
    }
}

impl fmt::Display for ThermodynamicState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T={:.2} K, P={:.3} kPa", self.temperature, self.pressure)
    }
}
