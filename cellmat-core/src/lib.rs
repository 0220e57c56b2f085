//! # Feature-by-cell count matrices
//!
//! `cellmat-core` holds the matrix abstraction used throughout cellmat: rows are biological
//! features (genes), columns are cells (barcodes), and values are observation counts.
//!
//! A [`CountMatrix`] is either fully materialized in memory, backed by an on-disk
//! [`MatrixStore`] whose fields are fetched lazily, or partially materialized (labels in
//! memory with a zero matrix allocated on first use). On top of that it provides:
//!
//! - filtering of sparse cells and features, and of cells skewed towards a feature class
//! - normalization and log transformation
//! - label-aligned merging of one matrix into another
//! - export to the persisted store, a sparse coordinate bundle and a flat table
//!
//! # Example
//!
//! ```no_run
//! use cellmat_core::CountMatrix;
//!
//! let mut matrix = CountMatrix::from_store("sample.cmx", true).unwrap();
//! matrix
//!     .remove_unknown().unwrap()
//!     .remove_cells_and_features(100, 3).unwrap()
//!     .normalize(10_000.0).unwrap()
//!     .log_transform().unwrap();
//! matrix.to_tsv("expression.tsv", "gene").unwrap();
//! ```
pub mod consts;
pub mod errors;
pub mod filtering;
pub mod io;
pub mod models;
pub mod transforms;
pub mod utils;

// re-exports
pub use errors::{MatrixError, Result};
pub use filtering::SkewReport;
pub use io::store::{MatrixStore, write_store};
pub use models::{Barcode, Count, CountMatrix, FeatureLabel, Label, LabelIndex, MatrixData};
