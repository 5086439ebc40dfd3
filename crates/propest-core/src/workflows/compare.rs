use crate::core::io::table::TableError;
use crate::core::models::dataset::PhysicalPropertyDataSet;
use crate::core::models::ids::PropertyId;
use serde::Serialize;
use std::io::Write;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error, PartialEq)]
pub enum CompareError {
    #[error(
        "Property '{property_id}' is a {experimental} in the experimental set but a {estimated} in the estimated set"
    )]
    TypeMismatch {
        property_id: PropertyId,
        experimental: String,
        estimated: String,
    },
}

/// An experimental value and its estimate, joined on the property identifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyPair {
    pub property_id: PropertyId,
    pub property_type: String,
    pub unit: String,
    pub experimental: f64,
    pub experimental_uncertainty: Option<f64>,
    pub estimated: f64,
    pub estimated_uncertainty: Option<f64>,
}

impl PropertyPair {
    pub fn deviation(&self) -> f64 {
        self.estimated - self.experimental
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitMismatch {
    pub property_id: PropertyId,
    pub experimental_unit: String,
    pub estimated_unit: String,
}

/// Least-squares line of experimental (y) against estimated (x) values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeStatistics {
    pub property_type: String,
    pub count: usize,
    pub rmse: f64,
    pub mean_signed_error: f64,
    pub fit: Option<LinearFit>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Comparison {
    pub pairs: Vec<PropertyPair>,
    pub statistics: Vec<TypeStatistics>,
    pub missing: Vec<PropertyId>,
    pub unit_mismatches: Vec<UnitMismatch>,
}

impl Comparison {
    pub fn statistics_for(&self, property_type: &str) -> Option<&TypeStatistics> {
        self.statistics
            .iter()
            .find(|s| s.property_type == property_type)
    }
}

/// Pairs every experimental property with the estimate carrying the same identifier and
/// summarises the deviations per property type.
///
/// Units are compared verbatim; pairs whose units differ are reported rather than converted.
pub fn compare(
    experimental: &PhysicalPropertyDataSet,
    estimated: &PhysicalPropertyDataSet,
) -> Result<Comparison, CompareError> {
    let mut comparison = Comparison::default();

    for property in experimental {
        let Some(estimate) = estimated.get(&property.id) else {
            comparison.missing.push(property.id.clone());
            continue;
        };
        if estimate.property_type != property.property_type {
            return Err(CompareError::TypeMismatch {
                property_id: property.id.clone(),
                experimental: property.property_type.clone(),
                estimated: estimate.property_type.clone(),
            });
        }
        if !property.value.same_unit(&estimate.value) {
            comparison.unit_mismatches.push(UnitMismatch {
                property_id: property.id.clone(),
                experimental_unit: property.value.unit.clone(),
                estimated_unit: estimate.value.unit.clone(),
            });
            continue;
        }
        comparison.pairs.push(PropertyPair {
            property_id: property.id.clone(),
            property_type: property.property_type.clone(),
            unit: property.value.unit.clone(),
            experimental: property.value.value,
            experimental_uncertainty: property.uncertainty.as_ref().map(|u| u.value),
            estimated: estimate.value.value,
            estimated_uncertainty: estimate.uncertainty.as_ref().map(|u| u.value),
        });
    }

    if !comparison.missing.is_empty() {
        let count = comparison.missing.len();
        warn!(count, "Experimental properties without an estimate");
    }
    if !comparison.unit_mismatches.is_empty() {
        warn!(
            count = comparison.unit_mismatches.len(),
            "Pairs skipped because their units differ"
        );
    }

    for property_type in experimental.property_types() {
        let pairs: Vec<&PropertyPair> = comparison
            .pairs
            .iter()
            .filter(|p| p.property_type == property_type)
            .collect();
        if pairs.is_empty() {
            continue;
        }
        let statistics = type_statistics(property_type, &pairs);
        info!(
            property_type,
            count = statistics.count,
            rmse = statistics.rmse,
            mse = statistics.mean_signed_error,
            "Compared estimates with experiment"
        );
        comparison.statistics.push(statistics);
    }

    Ok(comparison)
}

fn type_statistics(property_type: &str, pairs: &[&PropertyPair]) -> TypeStatistics {
    let n = pairs.len() as f64;
    let mean_signed_error = pairs.iter().map(|p| p.deviation()).sum::<f64>() / n;
    let rmse = (pairs.iter().map(|p| p.deviation().powi(2)).sum::<f64>() / n).sqrt();
    TypeStatistics {
        property_type: property_type.to_string(),
        count: pairs.len(),
        rmse,
        mean_signed_error,
        fit: linear_fit(pairs),
    }
}

fn linear_fit(pairs: &[&PropertyPair]) -> Option<LinearFit> {
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.estimated).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.experimental).sum::<f64>() / n;

    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for pair in pairs {
        let dx = pair.estimated - mean_x;
        let dy = pair.experimental - mean_y;
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }
    if sxx <= f64::EPSILON || syy <= f64::EPSILON {
        return None;
    }

    let slope = sxy / sxx;
    Some(LinearFit {
        slope,
        intercept: mean_y - slope * mean_x,
        r_squared: (sxy * sxy) / (sxx * syy),
    })
}

/// Writes one row per compared pair.
pub fn write_pairs_csv<W: Write>(comparison: &Comparison, writer: W) -> Result<(), TableError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record([
        "Id",
        "Property Type",
        "Unit",
        "Experimental",
        "Experimental Uncertainty",
        "Estimated",
        "Estimated Uncertainty",
        "Deviation",
    ])?;
    let optional = |value: Option<f64>| value.map(|v| v.to_string()).unwrap_or_default();
    for pair in &comparison.pairs {
        csv_writer.write_record([
            pair.property_id.to_string(),
            pair.property_type.clone(),
            pair.unit.clone(),
            pair.experimental.to_string(),
            optional(pair.experimental_uncertainty),
            pair.estimated.to_string(),
            optional(pair.estimated_uncertainty),
            pair.deviation().to_string(),
        ])?;
    }
    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::property::PhysicalProperty;
    use crate::core::models::state::Quantity;
    use crate::engine::testing;

    fn estimate_of(property: &PhysicalProperty, value: f64, unit: &str) -> PhysicalProperty {
        property.estimated("SimulationLayer", Quantity::new(value, unit), None)
    }

    #[test]
    fn statistics_match_a_known_fixture() {
        let experimental: Vec<PhysicalProperty> = [1.0, 2.0, 3.0]
            .iter()
            .map(|&v| testing::density("CCO", v))
            .collect();
        let estimated: Vec<PhysicalProperty> = experimental
            .iter()
            .map(|p| estimate_of(p, 2.0 * p.value.value + 1.0, "g / ml"))
            .collect();

        let comparison = compare(
            &PhysicalPropertyDataSet::from_properties(experimental).unwrap(),
            &PhysicalPropertyDataSet::from_properties(estimated).unwrap(),
        )
        .unwrap();

        let stats = comparison.statistics_for("Density").unwrap();
        assert_eq!(stats.count, 3);
        assert!((stats.mean_signed_error - 3.0).abs() < 1e-12);
        assert!((stats.rmse - (29.0f64 / 3.0).sqrt()).abs() < 1e-12);
        let fit = stats.fit.unwrap();
        assert!((fit.slope - 0.5).abs() < 1e-12);
        assert!((fit.intercept + 0.5).abs() < 1e-12);
        assert!((fit.r_squared - 1.0).abs() < 1e-12);
    }

    #[test]
    fn missing_estimates_and_unit_mismatches_are_reported() {
        let density = testing::density("CCO", 0.785);
        let mixing = testing::enthalpy_of_mixing(-0.75);
        let unmatched = testing::density("O", 0.997);

        let experimental = PhysicalPropertyDataSet::from_properties([
            density.clone(),
            mixing.clone(),
            unmatched.clone(),
        ])
        .unwrap();
        let estimated = PhysicalPropertyDataSet::from_properties([
            estimate_of(&density, 785.0, "kg / m ** 3"),
            estimate_of(&mixing, -0.7, "kJ / mol"),
        ])
        .unwrap();

        let comparison = compare(&experimental, &estimated).unwrap();

        assert_eq!(comparison.missing, [unmatched.id]);
        assert_eq!(comparison.unit_mismatches.len(), 1);
        assert_eq!(comparison.unit_mismatches[0].property_id, density.id);
        assert_eq!(comparison.pairs.len(), 1);
        assert!(comparison.statistics_for("Density").is_none());
        let mixing_stats = comparison.statistics_for("EnthalpyOfMixing").unwrap();
        assert_eq!(mixing_stats.count, 1);
        assert_eq!(mixing_stats.fit, None);
    }

    #[test]
    fn type_disagreement_is_an_error() {
        let density = testing::density("CCO", 0.785);
        let mut wrong = estimate_of(&density, 0.79, "g / ml");
        wrong.property_type = "ExcessMolarVolume".to_string();

        let result = compare(
            &PhysicalPropertyDataSet::from_properties([density]).unwrap(),
            &PhysicalPropertyDataSet::from_properties([wrong]).unwrap(),
        );
        assert!(matches!(result, Err(CompareError::TypeMismatch { .. })));
    }

    #[test]
    fn pairs_table_has_one_row_per_pair() {
        let density = testing::density("CCO", 0.785);
        let comparison = compare(
            &PhysicalPropertyDataSet::from_properties([density.clone()]).unwrap(),
            &PhysicalPropertyDataSet::from_properties([estimate_of(&density, 0.795, "g / ml")])
                .unwrap(),
        )
        .unwrap();

        let mut buffer = Vec::new();
        write_pairs_csv(&comparison, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Id,Property Type,Unit,Experimental"));
        assert!(lines[1].contains(",Density,g / ml,0.785,"));
    }
}
