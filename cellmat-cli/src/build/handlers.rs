use anyhow::{Context, Result};
use clap::ArgMatches;
use log::info;

use cellmat_counts::TagAggregator;

use super::cli::*;

pub fn run_build(matches: &ArgMatches) -> Result<()> {
    let tags: Vec<&String> = matches
        .get_many::<String>("tags")
        .context("At least one tag table is required.")?
        .collect();

    let output = matches
        .get_one::<String>("output")
        .map(String::as_str)
        .unwrap_or(DEFAULT_OUT);
    let feature_column = matches
        .get_one::<String>("feature-column")
        .map(String::as_str)
        .unwrap_or(DEFAULT_FEATURE_COLUMN);

    let mut aggregator = TagAggregator::new(feature_column);
    if let Some(dir) = matches.get_one::<String>("scratch-dir") {
        aggregator = aggregator.with_scratch_dir(dir);
    }

    let mut matrix = aggregator
        .aggregate(&tags)
        .context("Failed to count tag tables")?;
    matrix.to_store(output)?;

    info!("Counts of {} tag tables saved to {}", tags.len(), output);
    Ok(())
}
