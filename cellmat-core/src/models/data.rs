use ndarray::{Array1, Array2, ArrayView2, Axis};
use num_traits::Zero;
use serde::{Deserialize, Serialize};

use crate::errors::{MatrixError, Result};

/// Integer observation count.
pub type Count = u32;

///
/// The values of a count matrix.
///
/// Raw matrices hold integer counts. Normalization and log transformation turn them into
/// floating point values, which is tracked by the variant rather than by converting eagerly.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MatrixData {
    Counts(Array2<Count>),
    Scaled(Array2<f64>),
}

impl MatrixData {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        MatrixData::Counts(Array2::zeros((rows, cols)))
    }

    pub fn shape(&self) -> (usize, usize) {
        match self {
            MatrixData::Counts(values) => values.dim(),
            MatrixData::Scaled(values) => values.dim(),
        }
    }

    pub fn nrows(&self) -> usize {
        self.shape().0
    }

    pub fn ncols(&self) -> usize {
        self.shape().1
    }

    pub fn is_counts(&self) -> bool {
        matches!(self, MatrixData::Counts(_))
    }

    pub fn as_counts(&self) -> Option<&Array2<Count>> {
        match self {
            MatrixData::Counts(values) => Some(values),
            MatrixData::Scaled(_) => None,
        }
    }

    pub fn as_scaled(&self) -> Option<&Array2<f64>> {
        match self {
            MatrixData::Counts(_) => None,
            MatrixData::Scaled(values) => Some(values),
        }
    }

    /// Value at `(row, col)` as floating point.
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        match self {
            MatrixData::Counts(values) => values.get((row, col)).map(|&v| f64::from(v)),
            MatrixData::Scaled(values) => values.get((row, col)).copied(),
        }
    }

    /// A floating point copy of the values.
    pub fn to_scaled(&self) -> Array2<f64> {
        match self {
            MatrixData::Counts(values) => values.mapv(f64::from),
            MatrixData::Scaled(values) => values.clone(),
        }
    }

    pub fn into_scaled(self) -> Array2<f64> {
        match self {
            MatrixData::Counts(values) => values.mapv(f64::from),
            MatrixData::Scaled(values) => values,
        }
    }

    /// Keep the rows (`Axis(0)`) or columns (`Axis(1)`) at `positions`.
    pub fn select(&self, axis: Axis, positions: &[usize]) -> Self {
        match self {
            MatrixData::Counts(values) => MatrixData::Counts(values.select(axis, positions)),
            MatrixData::Scaled(values) => MatrixData::Scaled(values.select(axis, positions)),
        }
    }

    /// Number of cells each feature is observed in.
    pub fn nonzero_per_row(&self) -> Array1<usize> {
        match self {
            MatrixData::Counts(values) => count_nonzero(values, Axis(1)),
            MatrixData::Scaled(values) => count_nonzero(values, Axis(1)),
        }
    }

    /// Number of features observed in each cell.
    pub fn nonzero_per_col(&self) -> Array1<usize> {
        match self {
            MatrixData::Counts(values) => count_nonzero(values, Axis(0)),
            MatrixData::Scaled(values) => count_nonzero(values, Axis(0)),
        }
    }

    pub fn column_sums(&self) -> Array1<f64> {
        match self {
            MatrixData::Counts(values) => column_sums(values.view()),
            MatrixData::Scaled(values) => column_sums(values.view()),
        }
    }

    /// Column sums restricted to the rows at `rows`.
    pub fn column_sums_of(&self, rows: &[usize]) -> Array1<f64> {
        match self {
            MatrixData::Counts(values) => column_sums(values.select(Axis(0), rows).view()),
            MatrixData::Scaled(values) => column_sums(values.select(Axis(0), rows).view()),
        }
    }

    pub fn total(&self) -> f64 {
        self.column_sums().sum()
    }

    ///
    /// Add `other` into this matrix, mapping its row `i` to `rows[i]` and its column `j` to
    /// `cols[j]`.
    ///
    /// Integer counts stay integer; adding floating point values promotes the receiver. A sum
    /// that does not fit a [`Count`] fails with [`MatrixError::CountOverflow`] before any value
    /// is changed.
    ///
    pub(crate) fn accumulate(
        &mut self,
        rows: &[usize],
        cols: &[usize],
        other: &MatrixData,
    ) -> Result<()> {
        let promoted = match (&mut *self, other) {
            (MatrixData::Counts(dst), MatrixData::Counts(src)) => {
                scatter_add(dst, rows, cols, src.view(), Count::checked_add)?;
                None
            }
            (MatrixData::Scaled(dst), MatrixData::Scaled(src)) => {
                scatter_add(dst, rows, cols, src.view(), add_float)?;
                None
            }
            (MatrixData::Scaled(dst), MatrixData::Counts(src)) => {
                scatter_add(dst, rows, cols, src.mapv(f64::from).view(), add_float)?;
                None
            }
            (MatrixData::Counts(dst), MatrixData::Scaled(src)) => {
                let mut values = dst.mapv(f64::from);
                scatter_add(&mut values, rows, cols, src.view(), add_float)?;
                Some(values)
            }
        };

        if let Some(values) = promoted {
            *self = MatrixData::Scaled(values);
        }
        Ok(())
    }
}

fn count_nonzero<T: Zero>(values: &Array2<T>, axis: Axis) -> Array1<usize> {
    values.map_axis(axis, |lane| lane.iter().filter(|v| !v.is_zero()).count())
}

fn column_sums<T: Copy + Into<f64>>(values: ArrayView2<T>) -> Array1<f64> {
    values.map_axis(Axis(0), |col| col.iter().map(|&v| -> f64 { v.into() }).sum())
}

fn add_float(a: f64, b: f64) -> Option<f64> {
    Some(a + b)
}

fn scatter_add<T: Copy>(
    dst: &mut Array2<T>,
    rows: &[usize],
    cols: &[usize],
    src: ArrayView2<T>,
    add: impl Fn(T, T) -> Option<T>,
) -> Result<()> {
    for (i, &row) in rows.iter().enumerate() {
        for (j, &col) in cols.iter().enumerate() {
            if add(dst[[row, col]], src[[i, j]]).is_none() {
                return Err(MatrixError::CountOverflow { row, col });
            }
        }
    }

    for (i, &row) in rows.iter().enumerate() {
        for (j, &col) in cols.iter().enumerate() {
            if let Some(sum) = add(dst[[row, col]], src[[i, j]]) {
                dst[[row, col]] = sum;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use ndarray::array;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_nonzero_counts_per_axis() {
        let data = MatrixData::Counts(array![[0, 2, 1], [0, 0, 4]]);

        assert_eq!(data.nonzero_per_row().to_vec(), vec![2, 1]);
        assert_eq!(data.nonzero_per_col().to_vec(), vec![0, 1, 2]);
    }

    #[test]
    fn test_column_sums_of_rows() {
        let data = MatrixData::Counts(array![[1, 2], [3, 4], [5, 6]]);

        assert_eq!(data.column_sums().to_vec(), vec![9.0, 12.0]);
        assert_eq!(data.column_sums_of(&[0, 2]).to_vec(), vec![6.0, 8.0]);
        assert_eq!(data.total(), 21.0);
    }

    #[test]
    fn test_accumulate_scatters_by_position() {
        let mut data = MatrixData::zeros(3, 2);
        let other = MatrixData::Counts(array![[1, 2], [3, 4]]);

        data.accumulate(&[2, 0], &[1, 0], &other).unwrap();

        assert_eq!(data, MatrixData::Counts(array![[4, 3], [0, 0], [2, 1]]));
    }

    #[test]
    fn test_accumulate_promotes_to_scaled() {
        let mut data = MatrixData::zeros(1, 1);
        data.accumulate(&[0], &[0], &MatrixData::Scaled(array![[0.5]])).unwrap();

        assert_eq!(data, MatrixData::Scaled(array![[0.5]]));
    }

    #[test]
    fn test_accumulate_rejects_count_overflow() {
        let mut data = MatrixData::Counts(array![[1, Count::MAX]]);
        let other = MatrixData::Counts(array![[1, 1]]);

        let result = data.accumulate(&[0], &[0, 1], &other);

        assert!(matches!(result, Err(MatrixError::CountOverflow { row: 0, col: 1 })));
        assert_eq!(data, MatrixData::Counts(array![[1, Count::MAX]]));
    }
}
