use std::path::PathBuf;

use thiserror::Error;

/// Error type for cellmat-core operations.
#[derive(Error, Debug)]
pub enum MatrixError {
    /// A field was requested from a matrix that neither holds it in memory nor has a store to
    /// fetch it from.
    #[error("Matrix not initialized: no {0} in memory and no backing store")]
    Uninitialized(&'static str),

    #[error("Duplicate {axis} label: {label}")]
    DuplicateLabel { axis: &'static str, label: String },

    /// A label of the matrix being merged is missing from the receiving matrix.
    #[error("The {axis} label {label} is not present in the receiving matrix")]
    LabelMismatch { axis: &'static str, label: String },

    /// Merging would push a count past the integer range.
    #[error("Count overflow at row {row}, column {col} while merging")]
    CountOverflow { row: usize, col: usize },

    #[error("Matrix of shape {found:?} does not match labels of shape {expected:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    /// Normalizing would divide by a zero column total.
    #[error("Cannot normalize: {cells} cell(s) have zero total counts")]
    DegenerateNormalization { cells: usize },

    #[error("File doesn't appear to be a valid matrix store: {0}")]
    InvalidStore(String),

    #[error("Field not found in matrix store: {0}")]
    MissingField(String),

    /// The export destination already exists and will not be overwritten.
    #[error("Output directory already exists: {0:?}")]
    DestinationExists(PathBuf),

    #[error("Invalid sparse matrix bundle: {0}")]
    InvalidBundle(String),

    #[error("Failed to encode or decode store field: {0}")]
    Encoding(#[from] bincode::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type alias for cellmat-core operations.
pub type Result<T> = std::result::Result<T, MatrixError>;
