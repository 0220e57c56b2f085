//! Combining per-sample matrices into one matrix over the union of their labels.
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use log::info;

use cellmat_core::consts::STORE_EXT;
use cellmat_core::{CountMatrix, LabelIndex};

use crate::errors::{CountsError, Result};
use crate::tags::{DEFAULT_FEATURE_COLUMN, TagCounting};

fn progress_bar(len: usize, message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    pb.set_message(message);
    pb
}

///
/// Aggregate persisted matrices into one.
///
/// A single input is opened as a store-backed matrix and returned as is. Otherwise the union of
/// all features and all cells is collected, a zero matrix over that union is allocated and
/// every input is merged into it. Inputs are opened one at a time, so at most one input matrix
/// is held in memory next to the aggregate.
///
pub fn aggregate_stores<P: AsRef<Path>>(paths: &[P]) -> Result<CountMatrix> {
    match paths {
        [] => Err(CountsError::NoInputs),
        [single] => Ok(CountMatrix::from_store(single, true)?),
        _ => {
            let mut features = Vec::with_capacity(paths.len());
            let mut cells = Vec::with_capacity(paths.len());
            for path in paths {
                let mut input = CountMatrix::from_store(path, false)?;
                features.push(input.features()?.into_owned());
                cells.push(input.cells()?.into_owned());
            }

            let features = LabelIndex::union(&features);
            let cells = LabelIndex::union(&cells);
            info!(
                "Aggregating {} matrices over {} features and {} cells",
                paths.len(),
                features.len(),
                cells.len()
            );

            let mut total = CountMatrix::zeros(features, cells);
            let pb = progress_bar(paths.len(), "Merging matrices");
            for path in paths {
                let mut input = CountMatrix::from_store(path, false)?;
                total.combine(&mut input)?;
                pb.inc(1);
            }
            pb.finish_and_clear();

            Ok(total)
        }
    }
}

///
/// Aggregates tag tables into one matrix.
///
/// With more than one input, each table is counted on its own and persisted to an intermediate
/// store before the stores are aggregated, so only one sample's tags are in memory at a time.
/// Intermediate stores are written next to their input as `<input>.cmx` unless a scratch
/// directory is set.
///
#[derive(Debug, Clone)]
pub struct TagAggregator {
    feature_column: String,
    scratch_dir: Option<PathBuf>,
}

impl Default for TagAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_FEATURE_COLUMN)
    }
}

impl TagAggregator {
    pub fn new(feature_column: &str) -> Self {
        TagAggregator {
            feature_column: feature_column.to_string(),
            scratch_dir: None,
        }
    }

    pub fn with_scratch_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    /// Where the intermediate store of the `index`-th input goes.
    pub fn intermediate_path(&self, index: usize, input: &Path) -> PathBuf {
        match &self.scratch_dir {
            Some(dir) => {
                let mut name = OsString::from(format!("{:04}_", index));
                name.push(input.file_name().unwrap_or(input.as_os_str()));
                name.push(".");
                name.push(STORE_EXT);
                dir.join(name)
            }
            None => {
                let mut name = input.as_os_str().to_owned();
                name.push(".");
                name.push(STORE_EXT);
                PathBuf::from(name)
            }
        }
    }

    /// Count and aggregate the given tag tables.
    pub fn aggregate<P: AsRef<Path>>(&self, inputs: &[P]) -> Result<CountMatrix> {
        match inputs {
            [] => Err(CountsError::NoInputs),
            [single] => CountMatrix::from_tags(single, &self.feature_column),
            _ => {
                if let Some(dir) = &self.scratch_dir {
                    std::fs::create_dir_all(dir)?;
                }

                let pb = progress_bar(inputs.len(), "Counting tag tables");
                let mut stores = Vec::with_capacity(inputs.len());
                for (index, input) in inputs.iter().enumerate() {
                    let store = self.intermediate_path(index, input.as_ref());
                    let mut matrix = CountMatrix::from_tags(input, &self.feature_column)?;
                    matrix.to_store(&store)?;
                    stores.push(store);
                    pb.inc(1);
                }
                pb.finish_and_clear();

                aggregate_stores(&stores)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn test_intermediate_next_to_input() {
        let aggregator = TagAggregator::default();
        assert_eq!(
            aggregator.intermediate_path(3, Path::new("/data/s1/tags.tsv.gz")),
            PathBuf::from("/data/s1/tags.tsv.gz.cmx")
        );
    }

    #[test]
    fn test_intermediate_in_scratch_dir() {
        let aggregator = TagAggregator::default().with_scratch_dir("/scratch");
        assert_eq!(
            aggregator.intermediate_path(3, Path::new("/data/s1/tags.tsv.gz")),
            PathBuf::from("/scratch/0003_tags.tsv.gz.cmx")
        );
    }

    #[test]
    fn test_no_inputs() {
        let paths: Vec<PathBuf> = vec![];
        assert!(matches!(aggregate_stores(&paths), Err(CountsError::NoInputs)));
        assert!(matches!(
            TagAggregator::default().aggregate(&paths),
            Err(CountsError::NoInputs)
        ));
    }
}
