use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub smiles: String,
    pub mole_fraction: f64,
}

/// The composition a property was measured for: one or more components, each with a mole
/// fraction. Components keep the order given by the data source.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Substance {
    pub components: Vec<Component>,
}

impl Substance {
    pub fn pure(smiles: impl Into<String>) -> Self {
        Self {
            components: vec![Component {
                smiles: smiles.into(),
                mole_fraction: 1.0,
            }],
        }
    }

    pub fn mixture<I, S>(components: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self {
            components: components
                .into_iter()
                .map(|(smiles, mole_fraction)| Component {
                    smiles: smiles.into(),
                    mole_fraction,
                })
                .collect(),
        }
    }

    pub fn number_of_components(&self) -> usize {
        self.components.len()
    }

    pub fn smiles(&self) -> impl Iterator<Item = &str> {
        self.components.iter().map(|c| c.smiles.as_str())
    }
}

impl fmt::Display for Substance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .components
            .iter()
            .map(|c| format!("{}{{{:.3}}}", c.smiles, c.mole_fraction))
            .collect();
        f.write_str(&parts.join("|"))
    }
}
