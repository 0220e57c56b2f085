use std::fmt::Display;
use std::io::Write;
use std::path::Path;

use ndarray::ArrayView2;

use crate::consts::DEFAULT_INDEX_NAME;
use crate::errors::{MatrixError, Result};
use crate::models::{CountMatrix, MatrixData};
use crate::utils::get_dynamic_writer;

///
/// Write a matrix (or a column vector) as a tab-separated table.
///
/// The first column holds `index` under the header `index_name`, followed by one column per
/// matrix column named by `columns`. Output is gzipped if `path` ends in `.gz`.
///
/// # Arguments
/// - path: file to write
/// - values: the matrix to write
/// - index: one label per matrix row
/// - columns: one name per matrix column
/// - index_name: header of the index column
///
pub fn write_table<P, T, R, C>(
    path: P,
    values: ArrayView2<T>,
    index: &[R],
    columns: &[C],
    index_name: &str,
) -> Result<()>
where
    P: AsRef<Path>,
    T: Display,
    R: AsRef<str>,
    C: AsRef<str>,
{
    let expected = (index.len(), columns.len());
    if values.dim() != expected {
        return Err(MatrixError::ShapeMismatch {
            expected,
            found: values.dim(),
        });
    }

    let mut writer = get_dynamic_writer(path.as_ref())?;

    write!(writer, "{}", index_name)?;
    for column in columns {
        write!(writer, "\t{}", column.as_ref())?;
    }
    writeln!(writer)?;

    for (label, row) in index.iter().zip(values.rows()) {
        write!(writer, "{}", label.as_ref())?;
        for value in row {
            write!(writer, "\t{}", value)?;
        }
        writeln!(writer)?;
    }

    writer.finish()?;

    Ok(())
}

impl CountMatrix {
    ///
    /// Write the matrix to a tab-separated table with features as rows and cells as columns.
    ///
    /// # Arguments
    /// - path: file to write
    /// - index_name: header of the feature column (defaults to `feature`)
    ///
    pub fn to_tsv<P: AsRef<Path>>(&mut self, path: P, index_name: &str) -> Result<()> {
        let features = self.text_features()?;
        let cells = self.text_cells()?;
        let index_name = if index_name.is_empty() {
            DEFAULT_INDEX_NAME
        } else {
            index_name
        };

        match &*self.matrix()? {
            MatrixData::Counts(values) => {
                write_table(path, values.view(), &features, &cells, index_name)
            }
            MatrixData::Scaled(values) => {
                write_table(path, values.view(), &features, &cells, index_name)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Read;

    use ndarray::array;
    use pretty_assertions::assert_eq;

    use crate::utils::get_dynamic_reader;
    use tempfile::tempdir;

    #[test]
    fn test_write_vector_report() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.tsv");
        let values = array![[12.5], [0.0]];

        write_table(&path, values.view(), &["AAA", "CCC"], &["mito_pct"], "CB").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "CB\tmito_pct\nAAA\t12.5\nCCC\t0\n");
    }

    #[test]
    fn test_gzipped_table_is_complete() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.tsv.gz");
        let values = array![[1, 2]];

        write_table(&path, values.view(), &["ACTB"], &["X", "Y"], "gene").unwrap();

        let mut content = String::new();
        get_dynamic_reader(&path)
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "gene\tX\tY\nACTB\t1\t2\n");
    }

    #[test]
    fn test_labels_must_match_shape() {
        let dir = tempdir().unwrap();
        let values = array![[1, 2]];

        let result = write_table(
            dir.path().join("bad.tsv"),
            values.view(),
            &["A"],
            &["X"],
            "gene",
        );
        assert!(matches!(result, Err(MatrixError::ShapeMismatch { .. })));
    }
}
