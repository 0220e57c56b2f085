use cellmat_core::MatrixError;
use thiserror::Error;

/// Error type for building and aggregating count matrices.
#[derive(Error, Debug)]
pub enum CountsError {
    #[error("Tag table has no column named '{0}'")]
    MissingColumn(String),

    #[error("Malformed tag table row at line {line}: {reason}")]
    MalformedRow { line: u64, reason: String },

    #[error("Nothing to aggregate: no inputs given")]
    NoInputs,

    #[error("Failed to read tag table: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Matrix(#[from] MatrixError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type alias for cellmat-counts operations.
pub type Result<T> = std::result::Result<T, CountsError>;
