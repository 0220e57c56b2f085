//! Serialization of count matrices.
//!
//! - [`store`]: the persisted binary store, readable field by field
//! - [`mex`]: the sparse coordinate ("MEX") bundle: barcodes, features and a Matrix Market file
//! - [`table`]: flat tab-separated tables
pub mod mex;
pub mod store;
pub mod table;

pub use mex::{read_mex, write_mex};
pub use store::{MatrixStore, write_store};
pub use table::write_table;
