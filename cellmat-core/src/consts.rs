/// Label used by tag tables for reads that could not be assigned to a feature.
pub const UNKNOWN_FEATURE: &[u8] = b"-";

pub const STORE_HEADER: &[u8; 4] = b"CMTX";
pub const STORE_VERSION: u8 = 1;
pub const STORE_EXT: &str = "cmx";

pub const CELLS_FIELD: &str = "cells";
pub const FEATURES_FIELD: &str = "features";
pub const MATRIX_FIELD: &str = "matrix";

pub const MEX_BARCODES: &str = "barcodes.tsv.gz";
pub const MEX_FEATURES: &str = "features.tsv.gz";
pub const MEX_MATRIX: &str = "matrix.mtx.gz";
pub const MEX_BARCODE_SUFFIX: &[u8] = b"-1";
pub const MEX_FORMAT_VERSION: u32 = 2;
pub const SOFTWARE_VERSION: &str = "cellmat";

pub const DEFAULT_FEATURE_TYPE: &str = "Gene Expression";
pub const DEFAULT_INDEX_NAME: &str = "feature";
pub const CELL_INDEX_NAME: &str = "CB";
