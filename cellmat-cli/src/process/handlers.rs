use std::path::Path;

use anyhow::{Context, Result};
use clap::ArgMatches;
use log::info;

use cellmat_core::{CountMatrix, SkewReport};

use super::cli::*;
use crate::config::ProcessConfig;
use crate::export::handlers::write_outputs;

/// The config file, if any, with command line overrides applied.
pub fn resolve_config(matches: &ArgMatches) -> Result<ProcessConfig> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => ProcessConfig::from_file(Path::new(path))?,
        None => ProcessConfig::default(),
    };

    if let Some(&n) = matches.get_one::<usize>("min-features") {
        config.min_features = n;
    }
    if let Some(&n) = matches.get_one::<usize>("min-cells") {
        config.min_cells = n;
    }
    if let Some(&fraction) = matches.get_one::<f64>("max-mito") {
        config.max_mito = fraction;
    }
    if let Some(&total) = matches.get_one::<f64>("norm-count") {
        config.norm_count = total;
    }
    if matches.get_flag("no-log") {
        config.log_transform = false;
    }

    Ok(config)
}

pub fn run_process(matches: &ArgMatches) -> Result<()> {
    let store = matches
        .get_one::<String>("store")
        .context("A matrix store is required.")?;
    let output = matches
        .get_one::<String>("output")
        .map(String::as_str)
        .unwrap_or(DEFAULT_OUT);
    let config = resolve_config(matches)?;
    info!("Processing {} with {:?}", store, config);

    let mut matrix = CountMatrix::from_store(store, true)
        .with_context(|| format!("Failed to open matrix store {}", store))?;

    let report = matches
        .get_one::<String>("mito-report")
        .map(|path| SkewReport {
            path: Path::new(path),
            label: &config.mito_report_label,
        });

    matrix
        .remove_unknown()?
        .remove_cells_and_features(config.min_features, config.min_cells)?
        .remove_skewed_cells(config.max_mito, &config.mito_prefixes(), report)?
        .normalize(config.norm_count)
        .context("Normalization failed; raise --min-features to drop empty cells")?;
    if config.log_transform {
        matrix.log_transform()?;
    }

    matrix.to_store(output)?;
    write_outputs(&mut matrix, matches, &config.feature_type)?;

    let (n_features, n_cells) = matrix.shape()?;
    info!(
        "Saved processed matrix ({} features, {} cells) to {}",
        n_features, n_cells, output
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn test_flags_override_defaults() {
        let matches = create_process_cli()
            .try_get_matches_from(["process", "in.cmx", "--min-cells", "5", "--no-log"])
            .unwrap();

        let config = resolve_config(&matches).unwrap();

        assert_eq!(config.min_cells, 5);
        assert_eq!(config.min_features, 100);
        assert!(!config.log_transform);
    }
}
