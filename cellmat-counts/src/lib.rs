//! # Count matrices from UMI tag tables
//!
//! `cellmat-counts` turns tag tables (one row per read, with its corrected barcode, corrected
//! UMI and assigned feature) into [`CountMatrix`](cellmat_core::CountMatrix) values holding the
//! number of distinct UMIs per feature and cell, and aggregates per-sample matrices into one.
//!
//! # Example
//!
//! ```no_run
//! use cellmat_counts::{TagAggregator, aggregate_stores};
//!
//! // count several samples, keeping one sample in memory at a time
//! let mut matrix = TagAggregator::new("gene")
//!     .with_scratch_dir("/tmp/cellmat")
//!     .aggregate(&["s1.tsv.gz", "s2.tsv.gz"])
//!     .unwrap();
//! matrix.to_store("all.cmx").unwrap();
//!
//! // or merge matrices that were already persisted
//! let merged = aggregate_stores(&["s1.cmx", "s2.cmx"]).unwrap();
//! ```
pub mod aggregate;
pub mod errors;
pub mod tags;

// re-exports
pub use aggregate::{TagAggregator, aggregate_stores};
pub use errors::{CountsError, Result};
pub use tags::{TagCounting, TagTableBuilder};
