use std::borrow::Cow;
use std::path::Path;

use log::{debug, info};

use crate::errors::{MatrixError, Result};
use crate::io::store::{MatrixStore, write_store};
use crate::models::data::MatrixData;
use crate::models::label::{Barcode, FeatureLabel, Label};
use crate::models::label_index::LabelIndex;

/// All three fields of a matrix, in memory.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Fields {
    pub(crate) features: LabelIndex<FeatureLabel>,
    pub(crate) cells: LabelIndex<Barcode>,
    pub(crate) matrix: MatrixData,
}

/// Fields held in memory by a matrix that is not fully materialized.
#[derive(Debug, Default)]
struct Slots {
    features: Option<LabelIndex<FeatureLabel>>,
    cells: Option<LabelIndex<Barcode>>,
    matrix: Option<MatrixData>,
}

#[derive(Debug)]
struct StoreBacked {
    store: MatrixStore,
    cache: bool,
    slots: Slots,
}

#[derive(Debug)]
enum Source {
    /// Everything in memory.
    Materialized(Fields),
    /// Some fields in memory and no store. A missing matrix is zero-filled on first access
    /// when both label sets are present.
    Partial(Slots),
    /// Fields are fetched from the store on access, and kept when caching is enabled.
    StoreBacked(StoreBacked),
}

impl Default for Source {
    fn default() -> Self {
        Source::Partial(Slots::default())
    }
}

///
/// A feature-by-cell count matrix.
///
/// Rows are features, columns are cells. The matrix always has shape
/// `(features.len(), cells.len())`; every operation that changes a label set slices the values
/// to match and rebuilds the label lookup.
///
/// Accessors take `&mut self` because a store-backed matrix may fetch (and cache) a field on
/// access. Mutating operations first bring every field into memory, which also releases the
/// backing store.
///
#[derive(Debug, Default)]
pub struct CountMatrix {
    source: Source,
}

impl CountMatrix {
    ///
    /// Create a materialized matrix.
    ///
    /// Fails with [`MatrixError::ShapeMismatch`] if `matrix` does not have one row per feature
    /// and one column per cell.
    ///
    pub fn new(
        matrix: MatrixData,
        features: LabelIndex<FeatureLabel>,
        cells: LabelIndex<Barcode>,
    ) -> Result<Self> {
        let expected = (features.len(), cells.len());
        if matrix.shape() != expected {
            return Err(MatrixError::ShapeMismatch {
                expected,
                found: matrix.shape(),
            });
        }

        Ok(CountMatrix {
            source: Source::Materialized(Fields {
                features,
                cells,
                matrix,
            }),
        })
    }

    /// Create a matrix over the given labels whose values are zero until merged into.
    pub fn zeros(features: LabelIndex<FeatureLabel>, cells: LabelIndex<Barcode>) -> Self {
        CountMatrix {
            source: Source::Partial(Slots {
                features: Some(features),
                cells: Some(cells),
                matrix: None,
            }),
        }
    }

    ///
    /// Open a matrix backed by a persisted store.
    ///
    /// Nothing but the store's field table is read here. With `cache` set, each field is kept
    /// in memory after its first access; otherwise every access reads it again.
    ///
    /// # Arguments
    /// - path: path to the store file
    /// - cache: keep fetched fields in memory
    ///
    pub fn from_store<P: AsRef<Path>>(path: P, cache: bool) -> Result<Self> {
        let store = MatrixStore::open(path)?;
        info!("Loading matrix from {:?} (cache: {})", store.path(), cache);

        Ok(CountMatrix {
            source: Source::StoreBacked(StoreBacked {
                store,
                cache,
                slots: Slots::default(),
            }),
        })
    }

    /// An array of feature labels.
    pub fn features(&mut self) -> Result<Cow<'_, LabelIndex<FeatureLabel>>> {
        match &mut self.source {
            Source::Materialized(fields) => Ok(Cow::Borrowed(&fields.features)),
            Source::Partial(slots) => slots
                .features
                .as_ref()
                .map(Cow::Borrowed)
                .ok_or(MatrixError::Uninitialized("features")),
            Source::StoreBacked(backed) => {
                if backed.slots.features.is_none() {
                    let features = backed.store.read_features()?;
                    if !backed.cache {
                        return Ok(Cow::Owned(features));
                    }
                    backed.slots.features = Some(features);
                }
                backed
                    .slots
                    .features
                    .as_ref()
                    .map(Cow::Borrowed)
                    .ok_or(MatrixError::Uninitialized("features"))
            }
        }
    }

    /// An array of cell labels.
    pub fn cells(&mut self) -> Result<Cow<'_, LabelIndex<Barcode>>> {
        match &mut self.source {
            Source::Materialized(fields) => Ok(Cow::Borrowed(&fields.cells)),
            Source::Partial(slots) => slots
                .cells
                .as_ref()
                .map(Cow::Borrowed)
                .ok_or(MatrixError::Uninitialized("cells")),
            Source::StoreBacked(backed) => {
                if backed.slots.cells.is_none() {
                    let cells = backed.store.read_cells()?;
                    if !backed.cache {
                        return Ok(Cow::Owned(cells));
                    }
                    backed.slots.cells = Some(cells);
                }
                backed
                    .slots
                    .cells
                    .as_ref()
                    .map(Cow::Borrowed)
                    .ok_or(MatrixError::Uninitialized("cells"))
            }
        }
    }

    /// The matrix values.
    pub fn matrix(&mut self) -> Result<Cow<'_, MatrixData>> {
        match &mut self.source {
            Source::Materialized(fields) => Ok(Cow::Borrowed(&fields.matrix)),
            Source::Partial(slots) => {
                if slots.matrix.is_none() {
                    if let (Some(features), Some(cells)) = (&slots.features, &slots.cells) {
                        debug!(
                            "Allocating zero matrix of shape ({}, {})",
                            features.len(),
                            cells.len()
                        );
                        slots.matrix = Some(MatrixData::zeros(features.len(), cells.len()));
                    }
                }
                slots
                    .matrix
                    .as_ref()
                    .map(Cow::Borrowed)
                    .ok_or(MatrixError::Uninitialized("matrix"))
            }
            Source::StoreBacked(backed) => {
                if backed.slots.matrix.is_none() {
                    let matrix = backed.store.read_matrix()?;
                    if !backed.cache {
                        return Ok(Cow::Owned(matrix));
                    }
                    backed.slots.matrix = Some(matrix);
                }
                backed
                    .slots
                    .matrix
                    .as_ref()
                    .map(Cow::Borrowed)
                    .ok_or(MatrixError::Uninitialized("matrix"))
            }
        }
    }

    /// A copy of the feature labels as text.
    pub fn text_features(&mut self) -> Result<Vec<String>> {
        Ok(self.features()?.to_text())
    }

    /// A copy of the cell labels as text.
    pub fn text_cells(&mut self) -> Result<Vec<String>> {
        Ok(self.cells()?.to_text())
    }

    /// `(features, cells)`.
    pub fn shape(&mut self) -> Result<(usize, usize)> {
        let features = self.features()?.len();
        let cells = self.cells()?.len();
        Ok((features, cells))
    }

    pub fn is_materialized(&self) -> bool {
        matches!(self.source, Source::Materialized(_))
    }

    pub fn is_store_backed(&self) -> bool {
        matches!(self.source, Source::StoreBacked(_))
    }

    ///
    /// Release the backing store, if any.
    ///
    /// Fields already cached stay available; accessing any other field afterwards fails with
    /// [`MatrixError::Uninitialized`]. Dropping the matrix releases the store as well.
    ///
    pub fn close(&mut self) {
        if !self.is_store_backed() {
            return;
        }

        if let Source::StoreBacked(backed) = std::mem::take(&mut self.source) {
            info!("Closing matrix store {:?}", backed.store.path());
            self.source = match backed.slots {
                Slots {
                    features: Some(features),
                    cells: Some(cells),
                    matrix: Some(matrix),
                } => Source::Materialized(Fields {
                    features,
                    cells,
                    matrix,
                }),
                slots => Source::Partial(slots),
            };
        }
    }

    ///
    /// Bring all fields into memory, releasing any backing store.
    ///
    /// On error the matrix is left as it was.
    ///
    pub(crate) fn materialize(&mut self) -> Result<&mut Fields> {
        let fields = match &mut self.source {
            Source::Materialized(_) => None,
            Source::Partial(slots) => Some(slots.take_fields()?),
            Source::StoreBacked(backed) => Some(backed.take_fields()?),
        };

        if let Some(fields) = fields {
            if let Source::StoreBacked(backed) = &self.source {
                debug!("Materialized matrix from {:?}", backed.store.path());
            }
            self.source = Source::Materialized(fields);
        }

        match &mut self.source {
            Source::Materialized(fields) => Ok(fields),
            _ => Err(MatrixError::Uninitialized("matrix")),
        }
    }

    ///
    /// Add `other` into this matrix, aligning values by label.
    ///
    /// Every feature and cell of `other` must already be a label of this matrix: the label sets
    /// never grow here, only the values. A label missing from this matrix fails with
    /// [`MatrixError::LabelMismatch`] before any value is touched.
    ///
    pub fn combine(&mut self, other: &mut CountMatrix) -> Result<&mut Self> {
        let addend = other.materialize()?;
        let fields = self.materialize()?;

        let rows = positions_in(&fields.features, &addend.features)?;
        let cols = positions_in(&fields.cells, &addend.cells)?;

        fields.matrix.accumulate(&rows, &cols, &addend.matrix)?;
        debug!(
            "Merged {} features x {} cells into matrix of shape {:?}",
            rows.len(),
            cols.len(),
            fields.matrix.shape()
        );

        Ok(self)
    }

    /// Write the matrix to a persisted store.
    pub fn to_store<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let fields = self.materialize()?;
        write_store(path, &fields.features, &fields.cells, &fields.matrix)?;
        info!("Saved matrix to {:?}", path);
        Ok(())
    }
}

impl Slots {
    fn take_fields(&mut self) -> Result<Fields> {
        let (features, cells) = match (self.features.take(), self.cells.take()) {
            (Some(features), Some(cells)) => (features, cells),
            (features, cells) => {
                self.features = features;
                self.cells = cells;
                return Err(MatrixError::Uninitialized(if self.features.is_none() {
                    "features"
                } else {
                    "cells"
                }));
            }
        };
        let matrix = self
            .matrix
            .take()
            .unwrap_or_else(|| MatrixData::zeros(features.len(), cells.len()));

        Ok(Fields {
            features,
            cells,
            matrix,
        })
    }
}

impl StoreBacked {
    fn take_fields(&mut self) -> Result<Fields> {
        if self.slots.features.is_none() {
            self.slots.features = Some(self.store.read_features()?);
        }
        if self.slots.cells.is_none() {
            self.slots.cells = Some(self.store.read_cells()?);
        }
        if self.slots.matrix.is_none() {
            self.slots.matrix = Some(self.store.read_matrix()?);
        }
        self.slots.take_fields()
    }
}

/// Position in `receiver` of every label of `addend`.
fn positions_in<L: Label>(receiver: &LabelIndex<L>, addend: &LabelIndex<L>) -> Result<Vec<usize>> {
    addend
        .iter()
        .map(|label| {
            receiver
                .position_of(label)
                .ok_or_else(|| MatrixError::LabelMismatch {
                    axis: L::AXIS,
                    label: label.to_text(),
                })
        })
        .collect()
}
