use crate::cli::CompareArgs;
use crate::error::{CliError, Result};
use propest::core::io::json;
use propest::core::models::dataset::PhysicalPropertyDataSet;
use propest::engine::results::RequestResult;
use propest::workflows::compare::{self, Comparison};
use serde_json::Value;
use std::fs::File;
use std::path::Path;
use tracing::info;

pub async fn run(args: CompareArgs) -> Result<()> {
    info!("Loading experimental dataset from {:?}", &args.experimental);
    let experimental: PhysicalPropertyDataSet = json::read_document(&args.experimental)?;
    info!("Loading estimates from {:?}", &args.estimated);
    let estimated = load_estimates(&args.estimated)?;

    let comparison = compare::compare(&experimental, &estimated)?;
    print_summary(&comparison);

    if let Some(output) = &args.output {
        json::write_document(output, &comparison)?;
        println!("Comparison written to: {}", output.display());
    }
    if let Some(csv_path) = &args.csv {
        compare::write_pairs_csv(&comparison, File::create(csv_path)?)?;
        println!("Pairs written to: {}", csv_path.display());
    }
    Ok(())
}

/// Accepts either a result document (its estimated properties are used) or a plain dataset.
fn load_estimates(path: &Path) -> Result<PhysicalPropertyDataSet> {
    let document: Value = json::read_document(path)?;
    let parse_error = |e: serde_json::Error| CliError::FileParsing {
        path: path.to_path_buf(),
        source: e.into(),
    };
    if document.get("estimated_properties").is_some() {
        let result: RequestResult = serde_json::from_value(document).map_err(parse_error)?;
        Ok(result.estimated_properties)
    } else {
        serde_json::from_value(document).map_err(parse_error)
    }
}

fn print_summary(comparison: &Comparison) {
    println!(
        "{:<26} {:>6} {:>12} {:>12} {:>10}",
        "Property Type", "N", "RMSE", "MSE", "R^2"
    );
    for stats in &comparison.statistics {
        let r_squared = stats
            .fit
            .map(|fit| format!("{:.4}", fit.r_squared))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<26} {:>6} {:>12.6} {:>12.6} {:>10}",
            stats.property_type, stats.count, stats.rmse, stats.mean_signed_error, r_squared
        );
    }
    if !comparison.missing.is_empty() {
        println!(
            "{} experimental properties have no estimate.",
            comparison.missing.len()
        );
    }
    if !comparison.unit_mismatches.is_empty() {
        println!(
            "{} pairs were skipped because their units differ.",
            comparison.unit_mismatches.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimates_load_from_result_documents_and_datasets() {
        let dir = tempfile::tempdir().unwrap();

        let result_path = dir.path().join("results.json");
        json::write_document(&result_path, &RequestResult::default()).unwrap();
        assert!(load_estimates(&result_path).unwrap().is_empty());

        let data_set_path = dir.path().join("dataset.json");
        json::write_document(&data_set_path, &PhysicalPropertyDataSet::new()).unwrap();
        assert!(load_estimates(&data_set_path).unwrap().is_empty());

        let bogus_path = dir.path().join("bogus.json");
        std::fs::write(&bogus_path, r#"{"estimated_properties": 3}"#).unwrap();
        assert!(matches!(
            load_estimates(&bogus_path),
            Err(CliError::FileParsing { .. })
        ));
    }
}
