use anyhow::{Context, Result};
use clap::ArgMatches;
use log::info;

use cellmat_counts::aggregate_stores;

use super::cli::*;

pub fn run_aggregate(matches: &ArgMatches) -> Result<()> {
    let stores: Vec<&String> = matches
        .get_many::<String>("stores")
        .context("At least one matrix store is required.")?
        .collect();

    let output = matches
        .get_one::<String>("output")
        .map(String::as_str)
        .unwrap_or(DEFAULT_OUT);

    let mut matrix = aggregate_stores(&stores).context("Failed to aggregate matrix stores")?;
    let (n_features, n_cells) = matrix.shape()?;
    matrix.to_store(output)?;

    info!(
        "Merged {} stores into {} ({} features, {} cells)",
        stores.len(),
        output,
        n_features,
        n_cells
    );
    Ok(())
}
