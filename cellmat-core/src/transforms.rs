use std::f64::consts::LN_10;

use log::info;
use ndarray::{Array1, Axis};

use crate::errors::{MatrixError, Result};
use crate::models::{CountMatrix, MatrixData};

impl CountMatrix {
    /// The mean count of each cell across features.
    pub fn mean_expression(&mut self) -> Result<Array1<f64>> {
        let matrix = self.matrix()?;
        let rows = matrix.nrows() as f64;
        Ok(matrix.column_sums() / rows)
    }

    /// Sum of all values.
    pub fn total_counts(&mut self) -> Result<f64> {
        Ok(self.matrix()?.total())
    }

    ///
    /// Scale every cell so its counts sum to `target_total`.
    ///
    /// The values become floating point. Cells summing to zero cannot be scaled; filter them out
    /// first (e.g. with [`CountMatrix::remove_cells`]). If any are present this fails with
    /// [`MatrixError::DegenerateNormalization`] and the matrix is left untouched.
    ///
    pub fn normalize(&mut self, target_total: f64) -> Result<&mut Self> {
        let fields = self.materialize()?;

        let totals = fields.matrix.column_sums();
        let empty = totals.iter().filter(|&&total| total == 0.0).count();
        if empty > 0 {
            return Err(MatrixError::DegenerateNormalization { cells: empty });
        }

        let scaling = totals.mapv(|total| target_total / total);
        let mut values = std::mem::replace(&mut fields.matrix, MatrixData::zeros(0, 0)).into_scaled();
        for (mut column, &factor) in values.axis_iter_mut(Axis(1)).zip(scaling.iter()) {
            column.mapv_inplace(|v| v * factor);
        }
        fields.matrix = MatrixData::Scaled(values);

        info!("Normalized {} cells to {} counts", scaling.len(), target_total);
        Ok(self)
    }

    /// Replace every value `x` with `log10(1 + x)`.
    pub fn log_transform(&mut self) -> Result<&mut Self> {
        let fields = self.materialize()?;

        let mut values = std::mem::replace(&mut fields.matrix, MatrixData::zeros(0, 0)).into_scaled();
        values.mapv_inplace(|v| v.ln_1p() / LN_10);
        fields.matrix = MatrixData::Scaled(values);

        info!("Log-transformed matrix");
        Ok(self)
    }
}
