use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

use anyhow::{Context, Result};
use clap::ArgMatches;

use cellmat_core::CountMatrix;
use cellmat_core::utils::get_dynamic_reader;

use super::cli::*;

/// Read a feature id file: `<id>\t<label>[\t...]` per line, e.g. a features.tsv.gz.
pub fn read_feature_ids(path: &Path) -> Result<HashMap<String, String>> {
    let reader = get_dynamic_reader(path)
        .with_context(|| format!("Failed to open feature id file {:?}", path))?;

    let mut ids = HashMap::new();
    for line in reader.lines() {
        let line = line?;
        let mut fields = line.split('\t');
        if let (Some(id), Some(label)) = (fields.next(), fields.next()) {
            ids.insert(label.to_string(), id.to_string());
        }
    }

    Ok(ids)
}

///
/// Write the outputs requested on the command line.
///
/// Used by both `export` and `process`, which share the `--mex`, `--tsv`, `--feature-ids` and
/// `--index-name` flags.
///
pub fn write_outputs(matrix: &mut CountMatrix, matches: &ArgMatches, feature_type: &str) -> Result<()> {
    if let Some(dir) = matches.get_one::<String>("mex") {
        let ids = matches
            .get_one::<String>("feature-ids")
            .map(|path| read_feature_ids(Path::new(path)))
            .transpose()?;
        matrix
            .to_mex(dir, feature_type, ids.as_ref())
            .with_context(|| format!("Failed to write sparse bundle to {}", dir))?;
    }

    if let Some(path) = matches.get_one::<String>("tsv") {
        let index_name = matches
            .get_one::<String>("index-name")
            .map(String::as_str)
            .unwrap_or(DEFAULT_INDEX_NAME);
        matrix
            .to_tsv(path, index_name)
            .with_context(|| format!("Failed to write table to {}", path))?;
    }

    Ok(())
}

pub fn run_export(matches: &ArgMatches) -> Result<()> {
    let store = matches
        .get_one::<String>("store")
        .context("A matrix store is required.")?;
    let feature_type = matches
        .get_one::<String>("feature-type")
        .map(String::as_str)
        .unwrap_or(DEFAULT_FEATURE_TYPE);

    let mut matrix = CountMatrix::from_store(store, true)
        .with_context(|| format!("Failed to open matrix store {}", store))?;
    write_outputs(&mut matrix, matches, feature_type)?;
    matrix.close();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn test_read_feature_ids() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("features.tsv");
        std::fs::write(
            &path,
            "ENSG01\tACTB\tGene Expression\nENSG02\tGAPDH\tGene Expression\nbroken\n",
        )
        .unwrap();

        let ids = read_feature_ids(&path).unwrap();

        assert_eq!(ids.len(), 2);
        assert_eq!(ids["GAPDH"], "ENSG02");
    }
}
