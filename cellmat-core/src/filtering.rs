//! Removal of sparse, skewed and unassigned rows and columns.
//!
//! Every filter computes a keep-list against the current values, then slices the matrix and the
//! affected label set together. Filters return `&mut Self` so they can be chained.
use std::path::Path;

use log::{info, warn};
use ndarray::Axis;

use crate::consts::CELL_INDEX_NAME;
use crate::errors::Result;
use crate::io::table::write_table;
use crate::models::{CountMatrix, FeatureLabel, Label};

/// Where [`CountMatrix::remove_skewed_cells`] writes its per-cell report.
#[derive(Debug, Clone, Copy)]
pub struct SkewReport<'a> {
    pub path: &'a Path,
    /// Header of the percentage column.
    pub label: &'a str,
}

fn kept(mask: impl Iterator<Item = bool>) -> Vec<usize> {
    mask.enumerate()
        .filter_map(|(i, keep)| keep.then_some(i))
        .collect()
}

impl CountMatrix {
    /// Remove features that are present (non-zero) in fewer than `min_cells` cells.
    pub fn remove_features(&mut self, min_cells: usize) -> Result<&mut Self> {
        let fields = self.materialize()?;
        let n_cells = fields.matrix.nonzero_per_row();
        let keep = kept(n_cells.iter().map(|&n| n >= min_cells));

        info!(
            "Keeping {} of {} features present in at least {} cells",
            keep.len(),
            fields.features.len(),
            min_cells
        );
        fields.matrix = fields.matrix.select(Axis(0), &keep);
        fields.features = fields.features.select(&keep);

        Ok(self)
    }

    /// Remove cells with fewer than `min_features` features present.
    pub fn remove_cells(&mut self, min_features: usize) -> Result<&mut Self> {
        let fields = self.materialize()?;
        let n_features = fields.matrix.nonzero_per_col();
        let keep = kept(n_features.iter().map(|&n| n >= min_features));

        info!(
            "Keeping {} of {} cells with at least {} features",
            keep.len(),
            fields.cells.len(),
            min_features
        );
        fields.matrix = fields.matrix.select(Axis(1), &keep);
        fields.cells = fields.cells.select(&keep);

        Ok(self)
    }

    ///
    /// Remove cells and features simultaneously.
    ///
    /// Removing features and removing cells do not commute: whichever runs second sees the
    /// counts left by the first. Here both masks are computed from the matrix as it is on entry
    /// and applied together, so the result does not depend on an order.
    ///
    /// # Arguments
    /// - cell_threshold: minimum number of features present for a cell to be kept
    /// - feature_threshold: minimum number of cells a feature must be present in to be kept
    ///
    pub fn remove_cells_and_features(
        &mut self,
        cell_threshold: usize,
        feature_threshold: usize,
    ) -> Result<&mut Self> {
        let fields = self.materialize()?;

        let n_features = fields.matrix.nonzero_per_col();
        let keep_cells = kept(n_features.iter().map(|&n| n >= cell_threshold));

        let n_cells = fields.matrix.nonzero_per_row();
        let keep_features = kept(n_cells.iter().map(|&n| n >= feature_threshold));

        info!(
            "Keeping {} of {} cells and {} of {} features",
            keep_cells.len(),
            fields.cells.len(),
            keep_features.len(),
            fields.features.len()
        );
        fields.matrix = fields
            .matrix
            .select(Axis(0), &keep_features)
            .select(Axis(1), &keep_cells);
        fields.features = fields.features.select(&keep_features);
        fields.cells = fields.cells.select(&keep_cells);

        Ok(self)
    }

    ///
    /// Remove cells with an overabundance of a class of features.
    ///
    /// For each cell, the fraction of its total counts that falls on features whose label
    /// starts with one of `prefixes` is computed; cells whose fraction exceeds `threshold` are
    /// dropped. Cells without any counts have no defined fraction and are dropped too.
    ///
    /// If `report` is given, the fraction of every cell (as a percentage) is written to it
    /// before filtering.
    ///
    pub fn remove_skewed_cells(
        &mut self,
        threshold: f64,
        prefixes: &[&str],
        report: Option<SkewReport<'_>>,
    ) -> Result<&mut Self> {
        let selected = self.find_features(prefixes, false)?;
        let fields = self.materialize()?;

        let totals = fields.matrix.column_sums();
        let fractions = fields.matrix.column_sums_of(&selected) / &totals;

        if let Some(report) = report {
            let percentages = (&fractions * 100.0).insert_axis(Axis(1));
            write_table(
                report.path,
                percentages.view(),
                &fields.cells.to_text(),
                &[report.label],
                CELL_INDEX_NAME,
            )?;
            info!("Wrote skew report to {:?}", report.path);
        }

        let empty = totals.iter().filter(|&&total| total == 0.0).count();
        if empty > 0 {
            warn!("Dropping {} cells without any counts", empty);
        }

        let keep = kept(fractions.iter().map(|&fraction| fraction <= threshold));
        info!(
            "Keeping {} of {} cells with at most {:.1}% of counts on {:?}",
            keep.len(),
            fields.cells.len(),
            threshold * 100.0,
            prefixes
        );
        fields.matrix = fields.matrix.select(Axis(1), &keep);
        fields.cells = fields.cells.select(&keep);

        Ok(self)
    }

    ///
    /// Find features by label prefix.
    ///
    /// Returns the sorted positions of all features whose label starts with any of `prefixes`,
    /// or, with `inverse`, of all features that match none of them.
    ///
    pub fn find_features(&mut self, prefixes: &[&str], inverse: bool) -> Result<Vec<usize>> {
        let features = self.features()?;

        Ok(features
            .iter()
            .enumerate()
            .filter(|(_, label)| {
                let matched = prefixes
                    .iter()
                    .any(|prefix| label.as_bytes().starts_with(prefix.as_bytes()));
                matched != inverse
            })
            .map(|(i, _)| i)
            .collect())
    }

    /// Remove the feature row collecting unassigned reads.
    pub fn remove_unknown(&mut self) -> Result<&mut Self> {
        let fields = self.materialize()?;

        if let Some(position) = fields.features.position_of(&FeatureLabel::Unknown) {
            let keep: Vec<usize> = (0..fields.features.len())
                .filter(|&i| i != position)
                .collect();
            fields.matrix = fields.matrix.select(Axis(0), &keep);
            fields.features = fields.features.select(&keep);
            info!("Removed unknown feature");
        }

        Ok(self)
    }
}
