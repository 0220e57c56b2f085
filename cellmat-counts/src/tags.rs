//! Counting distinct UMIs per feature and cell from a tag table.
//!
//! A tag table is tab-separated with one row per observed read. Three columns matter: the
//! corrected barcode, the corrected UMI and the feature the read was assigned to. Reads that
//! could not be assigned carry `-` as their feature and are skipped, as are rows with an empty
//! feature, barcode or UMI.
use std::io::Read;
use std::path::Path;

use csv::{ByteRecord, ReaderBuilder};
use fxhash::{FxHashMap, FxHashSet};
use log::{debug, info, warn};
use ndarray::Array2;

use cellmat_core::consts::UNKNOWN_FEATURE;
use cellmat_core::utils::get_dynamic_reader;
use cellmat_core::{Barcode, Count, CountMatrix, FeatureLabel, Label, LabelIndex, MatrixData};

use crate::errors::{CountsError, Result};

pub const BARCODE_COLUMN: &str = "corrected_barcode";
pub const UMI_COLUMN: &str = "corrected_umi";
pub const DEFAULT_FEATURE_COLUMN: &str = "gene";

/// Maps labels to dense ids in order of first appearance.
#[derive(Debug, Default)]
struct Interner {
    ids: FxHashMap<Vec<u8>, u32>,
    labels: Vec<Vec<u8>>,
}

impl Interner {
    fn intern(&mut self, label: &[u8]) -> u32 {
        if let Some(&id) = self.ids.get(label) {
            return id;
        }
        let id = self.labels.len() as u32;
        self.ids.insert(label.to_vec(), id);
        self.labels.push(label.to_vec());
        id
    }

    fn len(&self) -> usize {
        self.labels.len()
    }

    /// Labels in sorted order, and the sorted position of every id.
    fn into_sorted(self) -> (Vec<Vec<u8>>, Vec<usize>) {
        let mut order: Vec<usize> = (0..self.labels.len()).collect();
        order.sort_by(|&a, &b| self.labels[a].cmp(&self.labels[b]));

        let mut positions = vec![0; order.len()];
        for (position, &id) in order.iter().enumerate() {
            positions[id] = position;
        }

        let mut labels: Vec<Option<Vec<u8>>> = self.labels.into_iter().map(Some).collect();
        let sorted = order
            .iter()
            .filter_map(|&id| labels[id].take())
            .collect();

        (sorted, positions)
    }
}

///
/// Accumulates tag observations and turns them into a dense [`CountMatrix`].
///
/// The first pass ([`TagTableBuilder::push`]) records every distinct
/// `(feature, barcode, UMI)` triple. The second pass ([`TagTableBuilder::build`]) allocates the
/// matrix over the sorted feature and barcode labels and counts the triples of each
/// feature/barcode pair. Pairs that were never observed stay zero.
///
#[derive(Debug, Default)]
pub struct TagTableBuilder {
    features: Interner,
    cells: Interner,
    umis: Interner,
    observations: FxHashSet<(u32, u32, u32)>,
    skipped: u64,
    incomplete: u64,
}

impl TagTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one observation. Observations of the unknown feature, or with an empty field, are
    /// dropped.
    pub fn push(&mut self, feature: &[u8], barcode: &[u8], umi: &[u8]) {
        if feature.is_empty() || barcode.is_empty() || umi.is_empty() {
            self.incomplete += 1;
            return;
        }
        if feature == UNKNOWN_FEATURE {
            self.skipped += 1;
            return;
        }
        let key = (
            self.features.intern(feature),
            self.cells.intern(barcode),
            self.umis.intern(umi),
        );
        self.observations.insert(key);
    }

    ///
    /// Record every row of a tab-separated tag table.
    ///
    /// # Arguments
    /// - reader: the table, with a header line
    /// - feature_column: name of the column holding the feature label
    ///
    pub fn read_table<R: Read>(&mut self, reader: R, feature_column: &str) -> Result<()> {
        let mut reader = ReaderBuilder::new().delimiter(b'\t').from_reader(reader);

        let headers = reader.byte_headers()?.clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|header| header == name.as_bytes())
                .ok_or_else(|| CountsError::MissingColumn(name.to_string()))
        };
        let feature_idx = column(feature_column)?;
        let barcode_idx = column(BARCODE_COLUMN)?;
        let umi_idx = column(UMI_COLUMN)?;

        let mut record = ByteRecord::new();
        let mut rows: u64 = 0;
        while reader.read_byte_record(&mut record)? {
            let line = record.position().map(|p| p.line()).unwrap_or(rows + 2);
            let (Some(feature), Some(barcode), Some(umi)) = (
                record.get(feature_idx),
                record.get(barcode_idx),
                record.get(umi_idx),
            ) else {
                return Err(CountsError::MalformedRow {
                    line,
                    reason: "missing fields".to_string(),
                });
            };
            self.push(feature, barcode, umi);
            rows += 1;
        }

        debug!("Read {} tag rows", rows);
        Ok(())
    }

    /// Record every row of a tag table file, gzipped or not.
    pub fn read_path<P: AsRef<Path>>(&mut self, path: P, feature_column: &str) -> Result<()> {
        let path = path.as_ref();
        info!("Reading tag table {:?}", path);
        let reader = get_dynamic_reader(path)?;
        self.read_table(reader, feature_column)
    }

    /// Number of distinct observations recorded so far.
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Count distinct UMIs per feature and barcode.
    pub fn build(self) -> Result<CountMatrix> {
        let (n_features, n_cells) = (self.features.len(), self.cells.len());
        if self.skipped > 0 {
            debug!("Skipped {} observations of unknown features", self.skipped);
        }
        if self.incomplete > 0 {
            warn!("Skipped {} observations with an empty field", self.incomplete);
        }

        let (features, rows) = self.features.into_sorted();
        let (cells, cols) = self.cells.into_sorted();

        let mut counts: Array2<Count> = Array2::zeros((n_features, n_cells));
        for &(feature, cell, _) in &self.observations {
            counts[[rows[feature as usize], cols[cell as usize]]] += 1;
        }

        info!(
            "Counted {} distinct UMIs over {} features and {} cells",
            self.observations.len(),
            n_features,
            n_cells
        );

        let features = LabelIndex::build(features.into_iter().map(FeatureLabel::from_bytes).collect())?;
        let cells = LabelIndex::build(cells.into_iter().map(Barcode::from_bytes).collect())?;

        Ok(CountMatrix::new(MatrixData::Counts(counts), features, cells)?)
    }
}

/// Building a [`CountMatrix`] straight from a tag table.
pub trait TagCounting: Sized {
    fn from_tags<P: AsRef<Path>>(path: P, feature_column: &str) -> Result<Self>;
}

impl TagCounting for CountMatrix {
    fn from_tags<P: AsRef<Path>>(path: P, feature_column: &str) -> Result<Self> {
        let mut builder = TagTableBuilder::new();
        builder.read_path(path, feature_column)?;
        builder.build()
    }
}
