pub mod count_matrix;
pub mod data;
pub mod label;
pub mod label_index;

pub use count_matrix::CountMatrix;
pub use data::{Count, MatrixData};
pub use label::{Barcode, FeatureLabel, Label};
pub use label_index::LabelIndex;
