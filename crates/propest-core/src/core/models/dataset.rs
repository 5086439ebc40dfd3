use super::ids::PropertyId;
use super::property::PhysicalProperty;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DataSetError {
    #[error("Duplicate property identifier '{0}' in data set")]
    DuplicateIdentifier(PropertyId),
}

/// Serialized form of a dataset. Loading goes through [`PhysicalPropertyDataSet::try_from`] so
/// that identifier uniqueness holds for every dataset in memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DataSetDocument {
    properties: Vec<PhysicalProperty>,
}

/// An ordered collection of physical properties with unique identifiers.
///
/// Insertion order is preserved for reproducibility. Filtering returns a new dataset; the
/// source dataset is never modified by a filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DataSetDocument", into = "DataSetDocument")]
pub struct PhysicalPropertyDataSet {
    properties: Vec<PhysicalProperty>,
    index: HashMap<PropertyId, usize>,
}

impl PhysicalPropertyDataSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_properties(
        properties: impl IntoIterator<Item = PhysicalProperty>,
    ) -> Result<Self, DataSetError> {
        let mut data_set = Self::new();
        data_set.add_properties(properties)?;
        Ok(data_set)
    }

    pub fn add_property(&mut self, property: PhysicalProperty) -> Result<(), DataSetError> {
        if self.index.contains_key(&property.id) {
            return Err(DataSetError::DuplicateIdentifier(property.id));
        }
        self.index.insert(property.id.clone(), self.properties.len());
        self.properties.push(property);
        Ok(())
    }

    /// Adds every property, stopping at the first duplicate identifier. Properties added before
    /// the duplicate stay in the dataset.
    pub fn add_properties(
        &mut self,
        properties: impl IntoIterator<Item = PhysicalProperty>,
    ) -> Result<(), DataSetError> {
        for property in properties {
            self.add_property(property)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PhysicalProperty> {
        self.properties.iter()
    }

    pub fn properties(&self) -> &[PhysicalProperty] {
        &self.properties
    }

    pub fn get(&self, id: &PropertyId) -> Option<&PhysicalProperty> {
        self.index.get(id).and_then(|&i| self.properties.get(i))
    }

    pub fn contains(&self, id: &PropertyId) -> bool {
        self.index.contains_key(id)
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &PropertyId> {
        self.properties.iter().map(|p| &p.id)
    }

    /// Distinct property types in first-seen order.
    pub fn property_types(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.properties
            .iter()
            .map(|p| p.property_type.as_str())
            .filter(|t| seen.insert(*t))
            .collect()
    }

    /// Returns a new dataset holding the properties for which `keep` is true, in their
    /// original order.
    pub fn filtered<F>(&self, keep: F) -> Self
    where
        F: Fn(&PhysicalProperty) -> bool,
    {
        Self::from_unique(self.iter().filter(|p| keep(p)).cloned().collect())
    }

    /// Keeps the properties at the given positions, which must be ascending.
    pub(crate) fn select_indices(&self, indices: &[usize]) -> Self {
        Self::from_unique(
            indices
                .iter()
                .filter_map(|&i| self.properties.get(i).cloned())
                .collect(),
        )
    }

    // Callers guarantee the properties come from one dataset, so identifiers are unique.
    fn from_unique(properties: Vec<PhysicalProperty>) -> Self {
        let index = properties
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id.clone(), i))
            .collect();
        Self { properties, index }
    }

    pub fn into_properties(self) -> Vec<PhysicalProperty> {
        self.properties
    }
}

impl TryFrom<DataSetDocument> for PhysicalPropertyDataSet {
    type Error = DataSetError;

    fn try_from(document: DataSetDocument) -> Result<Self, Self::Error> {
        Self::from_properties(document.properties)
    }
}

impl From<PhysicalPropertyDataSet> for DataSetDocument {
    fn from(data_set: PhysicalPropertyDataSet) -> Self {
        Self {
            properties: data_set.properties,
        }
    }
}

impl<'a> IntoIterator for &'a PhysicalPropertyDataSet {
    type Item = &'a PhysicalProperty;
    type IntoIter = std::slice::Iter<'a, PhysicalProperty>;

    fn into_iter(self) -> Self::IntoIter {
        self.properties.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::property::{MeasurementSource, PropertyPhase};
    use crate::core::models::state::{Quantity, ThermodynamicState};
    use crate::core::models::substance::Substance;

    fn property(id: &str, property_type: &str) -> PhysicalProperty {
        let mut p = PhysicalProperty::new(
            property_type,
            ThermodynamicState::at_standard_pressure(298.15),
            Substance::pure("O"),
            PropertyPhase::LIQUID,
            Quantity::new(1.0, "g / ml"),
            MeasurementSource::doi("10.1021/je1013476"),
        );
        p.id = PropertyId::from(id);
        p
    }

    #[test]
    fn add_property_rejects_duplicate_identifiers() {
        let mut data_set = PhysicalPropertyDataSet::new();
        data_set.add_property(property("a", "Density")).unwrap();
        let result = data_set.add_property(property("a", "EnthalpyOfMixing"));

        assert_eq!(
            result,
            Err(DataSetError::DuplicateIdentifier(PropertyId::from("a")))
        );
        assert_eq!(data_set.len(), 1);
    }

    #[test]
    fn filtered_returns_new_dataset_and_leaves_source_untouched() {
        let data_set = PhysicalPropertyDataSet::from_properties([
            property("a", "Density"),
            property("b", "EnthalpyOfMixing"),
            property("c", "Density"),
        ])
        .unwrap();

        let densities = data_set.filtered(|p| p.property_type == "Density");

        let ids: Vec<&str> = densities.identifiers().map(|id| id.as_str()).collect();
        assert_eq!(data_set.len(), 3);
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn get_finds_properties_by_identifier_after_filtering() {
        let data_set = PhysicalPropertyDataSet::from_properties([
            property("a", "Density"),
            property("b", "EnthalpyOfMixing"),
            property("c", "Density"),
        ])
        .unwrap();
        let densities = data_set.filtered(|p| p.property_type == "Density");
        let picked = data_set.select_indices(&[1, 2]);

        let (a, b, c) = (PropertyId::from("a"), PropertyId::from("b"), PropertyId::from("c"));

        assert_eq!(data_set.get(&b).unwrap().property_type, "EnthalpyOfMixing");
        assert_eq!(densities.get(&c).unwrap().id, c);
        assert!(densities.get(&b).is_none());
        assert_eq!(picked.get(&c).unwrap().id, c);
        assert!(!picked.contains(&a));
    }

    #[test]
    fn property_types_are_listed_in_first_seen_order() {
        let data_set = PhysicalPropertyDataSet::from_properties([
            property("a", "EnthalpyOfMixing"),
            property("b", "Density"),
            property("c", "EnthalpyOfMixing"),
        ])
        .unwrap();
        assert_eq!(
            data_set.property_types(),
            vec!["EnthalpyOfMixing", "Density"]
        );
    }

    #[test]
    fn json_round_trip_preserves_identifiers_values_and_units() {
        let data_set = PhysicalPropertyDataSet::from_properties([
            property("a", "Density"),
            property("b", "EnthalpyOfMixing"),
        ])
        .unwrap();

        let json = serde_json::to_string(&data_set).unwrap();
        assert!(json.starts_with("{\"properties\":["));
        let back: PhysicalPropertyDataSet = serde_json::from_str(&json).unwrap();

        assert_eq!(back, data_set);
    }

    #[test]
    fn loading_document_with_duplicate_identifiers_fails() {
        let data_set =
            PhysicalPropertyDataSet::from_properties([property("a", "Density")]).unwrap();
        let one = serde_json::to_value(&data_set.properties()[0]).unwrap();
        let document = serde_json::json!({ "properties": [one.clone(), one] });

        let result: Result<PhysicalPropertyDataSet, _> = serde_json::from_value(document);
        assert!(result.is_err());
    }
}
