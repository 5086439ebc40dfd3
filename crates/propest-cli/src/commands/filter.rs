use crate::cli::FilterArgs;
use crate::config::PartialConfig;
use crate::error::Result;
use propest::core::curation;
use propest::core::io::{json, table};
use propest::core::models::dataset::PhysicalPropertyDataSet;
use std::fs::File;
use tracing::info;

pub async fn run(args: FilterArgs) -> Result<()> {
    let config = PartialConfig::from_file(&args.config)?;
    let registry = config.registry(args.registry.as_deref())?;
    let filters = config.filters(&registry)?;

    info!("Loading dataset from {:?}", &args.input);
    let data_set: PhysicalPropertyDataSet = json::read_document(&args.input)?;
    registry.validate_data_set(&data_set)?;

    info!("Applying {} filter(s)...", filters.len());
    let filtered = curation::apply_all(&data_set, &filters);

    json::write_document(&args.output, &filtered)?;
    if let Some(csv_path) = &args.csv {
        info!("Writing CSV table to {:?}", csv_path);
        table::write_data_set_csv(&filtered, File::create(csv_path)?)?;
    }

    println!(
        "✓ Kept {} of {} properties. Dataset written to: {}",
        filtered.len(),
        data_set.len(),
        args.output.display()
    );
    Ok(())
}
