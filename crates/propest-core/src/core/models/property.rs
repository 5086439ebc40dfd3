use super::ids::PropertyId;
use super::state::{Quantity, ThermodynamicState};
use super::substance::Substance;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;
use std::str::FromStr;
use thiserror::Error;

/// Set of phases a property refers to, e.g. `Liquid + Gas` for an enthalpy of vaporization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PropertyPhase(u8);

impl PropertyPhase {
    pub const UNDEFINED: Self = Self(0);
    pub const SOLID: Self = Self(1);
    pub const LIQUID: Self = Self(1 << 1);
    pub const GAS: Self = Self(1 << 2);

    const NAMED: [(Self, &'static str); 3] = [
        (Self::SOLID, "Solid"),
        (Self::LIQUID, "Liquid"),
        (Self::GAS, "Gas"),
    ];

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_undefined(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for PropertyPhase {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for PropertyPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_undefined() {
            return f.write_str("Undefined");
        }
        let names: Vec<&str> = Self::NAMED
            .iter()
            .filter(|(phase, _)| self.contains(*phase))
            .map(|(_, name)| *name)
            .collect();
        f.write_str(&names.join(" + "))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown phase '{0}'. Expected a combination of Solid, Liquid and Gas.")]
pub struct ParsePhaseError(String);

impl FromStr for PropertyPhase {
    type Err = ParsePhaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("undefined") {
            return Ok(Self::UNDEFINED);
        }
        trimmed
            .split(['+', '|'])
            .map(str::trim)
            .try_fold(Self::UNDEFINED, |acc, token| {
                Self::NAMED
                    .iter()
                    .find(|(_, name)| name.eq_ignore_ascii_case(token))
                    .map(|(phase, _)| acc | *phase)
                    .ok_or_else(|| ParsePhaseError(token.to_string()))
            })
    }
}

impl TryFrom<String> for PropertyPhase {
    type Error = ParsePhaseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PropertyPhase> for String {
    fn from(value: PropertyPhase) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MeasurementSource {
    Doi { doi: String },
    Computed { layer: String },
}

impl MeasurementSource {
    pub fn doi(doi: impl Into<String>) -> Self {
        Self::Doi { doi: doi.into() }
    }

    pub fn is_computed(&self) -> bool {
        matches!(self, Self::Computed { .. })
    }
}

impl fmt::Display for MeasurementSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Doi { doi } => f.write_str(doi),
            Self::Computed { layer } => write!(f, "computed ({})", layer),
        }
    }
}

/// One measured or estimated value of a physical property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalProperty {
    pub id: PropertyId,
    pub property_type: String,
    pub thermodynamic_state: ThermodynamicState,
    pub substance: Substance,
    pub phase: PropertyPhase,
    pub value: Quantity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uncertainty: Option<Quantity>,
    pub source: MeasurementSource,
}

impl PhysicalProperty {
    /// Creates a property with a freshly generated identifier.
    pub fn new(
        property_type: impl Into<String>,
        thermodynamic_state: ThermodynamicState,
        substance: Substance,
        phase: PropertyPhase,
        value: Quantity,
        source: MeasurementSource,
    ) -> Self {
        Self {
            id: PropertyId::generate(),
            property_type: property_type.into(),
            thermodynamic_state,
            substance,
            phase,
            value,
            uncertainty: None,
            source,
        }
    }

    pub fn with_uncertainty(mut self, uncertainty: Quantity) -> Self {
        self.uncertainty = Some(uncertainty);
        self
    }

    /// Builds the estimated counterpart of this property: same identifier, state, substance and
    /// phase, with the computed value and the producing layer recorded as its source.
    pub fn estimated(
        &self,
        layer: impl Into<String>,
        value: Quantity,
        uncertainty: Option<Quantity>,
    ) -> Self {
        Self {
            value,
            uncertainty,
            source: MeasurementSource::Computed {
                layer: layer.into(),
            },
            ..self.clone()
        }
    }
}
