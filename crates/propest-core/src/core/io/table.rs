use crate::core::models::dataset::PhysicalPropertyDataSet;
use std::io::Write;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Writes one row per property with one column group per component, sized to the largest
/// substance in the dataset.
pub fn write_data_set_csv<W: Write>(
    data_set: &PhysicalPropertyDataSet,
    writer: W,
) -> Result<(), TableError> {
    let max_components = data_set
        .iter()
        .map(|p| p.substance.number_of_components())
        .max()
        .unwrap_or(0);

    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut header = vec![
        "Id".to_string(),
        "Property Type".to_string(),
        "Temperature (K)".to_string(),
        "Pressure (kPa)".to_string(),
        "Phase".to_string(),
        "N Components".to_string(),
    ];
    for index in 1..=max_components {
        header.push(format!("Component {}", index));
        header.push(format!("Mole Fraction {}", index));
    }
    header.extend(
        ["Value", "Unit", "Uncertainty", "Source"]
            .iter()
            .map(|s| s.to_string()),
    );
    csv_writer.write_record(&header)?;

    for property in data_set {
        let mut row = vec![
            property.id.to_string(),
            property.property_type.clone(),
            property.thermodynamic_state.temperature.to_string(),
            property.thermodynamic_state.pressure.to_string(),
            property.phase.to_string(),
            property.substance.number_of_components().to_string(),
        ];
        for index in 0..max_components {
            match property.substance.components.get(index) {
                Some(component) => {
                    row.push(component.smiles.clone());
                    row.push(component.mole_fraction.to_string());
                }
                None => {
                    row.push(String::new());
                    row.push(String::new());
                }
            }
        }
        row.push(property.value.value.to_string());
        row.push(property.value.unit.clone());
        row.push(
            property
                .uncertainty
                .as_ref()
                .map(|u| u.value.to_string())
                .unwrap_or_default(),
        );
        row.push(property.source.to_string());
        csv_writer.write_record(&row)?;
    }

    csv_writer.flush()?;
    Ok(())
}
